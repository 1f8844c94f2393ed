// Shared media pipeline: the one per-room resource created on first join
// and released when the room closes.

// Public API - what other modules can use
pub use memory::{InMemoryPipeline, InMemoryPipelineFactory};
pub use release::PipelineRelease;

// Internal modules
mod memory;
mod release;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised by pipeline backends
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error("Could not create pipeline: {0}")]
    Creation(String),

    #[error("Could not release pipeline {pipeline_id}: {reason}")]
    Release { pipeline_id: String, reason: String },

    #[error("Pipeline {0} was already released")]
    AlreadyReleased(String),

    #[error("Pipeline release task ended before reporting an outcome")]
    ReleaseAborted,
}

impl PipelineError {
    pub fn creation(msg: impl Into<String>) -> Self {
        PipelineError::Creation(msg.into())
    }

    pub fn release(pipeline_id: impl Into<String>, reason: impl Into<String>) -> Self {
        PipelineError::Release {
            pipeline_id: pipeline_id.into(),
            reason: reason.into(),
        }
    }
}

/// Handle to a shared media pipeline owned by a room
#[async_trait]
pub trait MediaPipeline: Send + Sync {
    /// Backend identifier of this pipeline (for logging)
    fn id(&self) -> &str;

    /// Releases the pipeline and every element hanging off it.
    ///
    /// The room calls this at most once, from a background task.
    async fn release(&self) -> Result<(), PipelineError>;
}

/// Creates pipelines for rooms
#[async_trait]
pub trait PipelineFactory: Send + Sync {
    async fn create_pipeline(&self) -> Result<Arc<dyn MediaPipeline>, PipelineError>;
}
