// Public API - what other modules can use
pub use coordinator::{Room, RoomOptions, RoomState};
pub use messages::RoomMessage;

// Internal modules
mod coordinator;
mod messages;
mod roster;
