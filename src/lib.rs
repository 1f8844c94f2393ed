// Library crate for the collaborative room coordinator
// This file exposes the public API for the binary and integration tests

pub mod config;
pub mod executor;
pub mod participant;
pub mod pipeline;
pub mod room;
pub mod shared;

// Re-export commonly used types for easier access in tests
pub use executor::{TaskError, TaskFailureHook, TaskOutcome, TaskSerializer};
pub use participant::{
    ChannelParticipant, ChannelParticipantFactory, Participant, ParticipantFactory,
    ParticipantTransport,
};
pub use pipeline::{
    InMemoryPipelineFactory, MediaPipeline, PipelineError, PipelineFactory, PipelineRelease,
};
pub use room::{Room, RoomMessage, RoomOptions, RoomState};
pub use shared::RoomError;
