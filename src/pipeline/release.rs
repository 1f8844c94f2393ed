use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{trace, warn};

use super::{MediaPipeline, PipelineError};

/// Outcome of an asynchronous pipeline release
///
/// Returned by `Room::close`. The release runs in the background whether or
/// not this handle is awaited; dropping it only discards the result.
#[derive(Debug)]
pub struct PipelineRelease {
    pipeline_id: String,
    outcome: oneshot::Receiver<Result<(), PipelineError>>,
}

impl PipelineRelease {
    /// Starts releasing `pipeline` on a background task
    pub fn spawn(room_name: &str, pipeline: Arc<dyn MediaPipeline>) -> Self {
        let (tx, rx) = oneshot::channel();
        let pipeline_id = pipeline.id().to_string();
        let room = room_name.to_string();

        tokio::spawn(async move {
            let result = pipeline.release().await;

            match &result {
                Ok(()) => {
                    trace!(room = %room, pipeline_id = %pipeline.id(), "Released pipeline");
                }
                Err(e) => {
                    warn!(
                        room = %room,
                        pipeline_id = %pipeline.id(),
                        error = %e,
                        "Could not release pipeline"
                    );
                }
            }

            // Nobody may be listening any more
            let _ = tx.send(result);
        });

        Self {
            pipeline_id,
            outcome: rx,
        }
    }

    pub fn pipeline_id(&self) -> &str {
        &self.pipeline_id
    }

    /// Waits for the release to finish
    pub async fn outcome(self) -> Result<(), PipelineError> {
        self.outcome
            .await
            .unwrap_or(Err(PipelineError::ReleaseAborted))
    }
}
