use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::{MediaPipeline, PipelineError, PipelineFactory};

/// In-process pipeline with no media server behind it
#[derive(Debug)]
pub struct InMemoryPipeline {
    id: String,
    released: AtomicBool,
}

impl InMemoryPipeline {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            released: AtomicBool::new(false),
        }
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

impl Default for InMemoryPipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaPipeline for InMemoryPipeline {
    fn id(&self) -> &str {
        &self.id
    }

    async fn release(&self) -> Result<(), PipelineError> {
        if self.released.swap(true, Ordering::SeqCst) {
            warn!(pipeline_id = %self.id, "Pipeline released twice");
            return Err(PipelineError::AlreadyReleased(self.id.clone()));
        }

        debug!(pipeline_id = %self.id, "In-memory pipeline released");
        Ok(())
    }
}

/// In-memory implementation of PipelineFactory for development and testing
pub struct InMemoryPipelineFactory {
    created: AtomicUsize,
    fail_creation: AtomicBool,
}

impl Default for InMemoryPipelineFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryPipelineFactory {
    /// Creates a factory whose pipelines are always created successfully
    pub fn new() -> Self {
        Self {
            created: AtomicUsize::new(0),
            fail_creation: AtomicBool::new(false),
        }
    }

    /// Creates a factory that refuses to create pipelines until told otherwise
    pub fn failing() -> Self {
        let factory = Self::new();
        factory.set_failing(true);
        factory
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_creation.store(failing, Ordering::SeqCst);
    }

    /// Number of pipelines successfully created so far
    pub fn created_count(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PipelineFactory for InMemoryPipelineFactory {
    #[instrument(skip(self))]
    async fn create_pipeline(&self) -> Result<Arc<dyn MediaPipeline>, PipelineError> {
        if self.fail_creation.load(Ordering::SeqCst) {
            warn!("In-memory pipeline factory configured to fail");
            return Err(PipelineError::creation("in-memory backend unavailable"));
        }

        let pipeline = InMemoryPipeline::new();
        self.created.fetch_add(1, Ordering::SeqCst);
        debug!(pipeline_id = %pipeline.id, "In-memory pipeline created");

        Ok(Arc::new(pipeline))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_pipeline_counts_creations() {
        let factory = InMemoryPipelineFactory::new();

        let first = factory.create_pipeline().await.unwrap();
        let second = factory.create_pipeline().await.unwrap();

        assert_eq!(factory.created_count(), 2);
        assert_ne!(first.id(), second.id());
    }

    #[tokio::test]
    async fn test_failing_factory_does_not_count() {
        let factory = InMemoryPipelineFactory::failing();

        let result = factory.create_pipeline().await;

        assert!(matches!(result, Err(PipelineError::Creation(_))));
        assert_eq!(factory.created_count(), 0);

        factory.set_failing(false);
        assert!(factory.create_pipeline().await.is_ok());
        assert_eq!(factory.created_count(), 1);
    }

    #[tokio::test]
    async fn test_second_release_is_rejected() {
        let pipeline = InMemoryPipeline::new();

        assert!(pipeline.release().await.is_ok());
        assert!(pipeline.is_released());

        let result = pipeline.release().await;
        assert_eq!(
            result,
            Err(PipelineError::AlreadyReleased(pipeline.id().to_string()))
        );
    }
}
