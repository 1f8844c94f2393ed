use thiserror::Error;

use crate::pipeline::PipelineError;

/// Errors surfaced to callers of room operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoomError {
    #[error("The room '{0}' is closed")]
    RoomClosed(String),

    #[error("Could not create the room pipeline: {0}")]
    ResourceCreation(#[from] PipelineError),

    #[error("Participant '{name}' is already in room '{room}'")]
    DuplicateParticipant { room: String, name: String },
}
