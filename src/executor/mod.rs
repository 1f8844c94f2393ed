// Room-scoped task serialisation
//
// A TaskSerializer runs caller-supplied work one task at a time on a single
// dedicated worker, giving callers mutual exclusion without a lock on the
// roster itself.

// Public API - what other modules can use
pub use serializer::{TaskFailureHook, TaskOutcome, TaskSerializer};

// Internal modules
mod serializer;

use thiserror::Error;

/// Errors produced by serialized tasks
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskError {
    #[error("Task failed: {0}")]
    Failed(String),

    #[error("Task panicked: {0}")]
    Panicked(String),
}

impl TaskError {
    /// Create a failure from any message
    pub fn failed(msg: impl Into<String>) -> Self {
        TaskError::Failed(msg.into())
    }
}
