// Room members as seen by the room coordinator

// Public API - what other modules can use
pub use channel::{ChannelParticipant, ChannelParticipantFactory};

// Internal modules
mod channel;

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::pipeline::MediaPipeline;
use crate::room::RoomMessage;

/// Outbound text channel to one connected member
pub type ParticipantTransport = mpsc::UnboundedSender<String>;

/// One connected member of a room
///
/// This is the whole contract the room depends on: delivering events,
/// cutting media flows towards a member who left, and releasing the
/// member's own resources.
#[async_trait]
pub trait Participant: Send + Sync {
    /// Unique name of the member inside its room
    fn name(&self) -> &str;

    /// Delivers one event. Fire-and-forget: no acknowledgment.
    async fn send_message(&self, message: &RoomMessage);

    /// Stops any media flow between this member and `name`
    async fn cancel_sending_to(&self, name: &str);

    /// Releases this member's resources
    async fn close(&self);
}

/// Builds participants for a room
pub trait ParticipantFactory: Send + Sync {
    fn create_participant(
        &self,
        name: &str,
        room_name: &str,
        transport: ParticipantTransport,
        pipeline: Arc<dyn MediaPipeline>,
    ) -> Arc<dyn Participant>;
}
