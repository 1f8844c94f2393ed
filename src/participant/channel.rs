use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use super::{Participant, ParticipantFactory, ParticipantTransport};
use crate::pipeline::MediaPipeline;
use crate::room::RoomMessage;

/// Participant that pushes JSON text frames down an unbounded channel
///
/// The transport layer owns the receiving end and forwards frames to the
/// connected client. Inbound media flows are tracked by sender name.
pub struct ChannelParticipant {
    name: String,
    room_name: String,
    transport: ParticipantTransport,
    pipeline: Arc<dyn MediaPipeline>,
    joined_at: DateTime<Utc>,
    // names of members whose media this participant is receiving
    inbound: RwLock<BTreeSet<String>>,
    closed: AtomicBool,
}

impl ChannelParticipant {
    pub fn new(
        name: impl Into<String>,
        room_name: impl Into<String>,
        transport: ParticipantTransport,
        pipeline: Arc<dyn MediaPipeline>,
    ) -> Self {
        Self {
            name: name.into(),
            room_name: room_name.into(),
            transport,
            pipeline,
            joined_at: Utc::now(),
            inbound: RwLock::new(BTreeSet::new()),
            closed: AtomicBool::new(false),
        }
    }

    pub fn room_name(&self) -> &str {
        &self.room_name
    }

    pub fn pipeline_id(&self) -> &str {
        self.pipeline.id()
    }

    pub fn joined_at(&self) -> DateTime<Utc> {
        self.joined_at
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Starts receiving media from `sender`. Returns false once closed.
    #[instrument(skip(self), fields(participant = %self.name))]
    pub async fn receive_from(&self, sender: &str) -> bool {
        if self.is_closed() {
            debug!(sender = %sender, "Closed participant cannot receive media");
            return false;
        }

        let inserted = self.inbound.write().await.insert(sender.to_string());
        if inserted {
            debug!(
                room = %self.room_name,
                sender = %sender,
                pipeline_id = %self.pipeline.id(),
                "Receiving media"
            );
        }
        true
    }

    pub async fn is_receiving_from(&self, sender: &str) -> bool {
        self.inbound.read().await.contains(sender)
    }

    /// Names of members this participant receives media from, sorted
    pub async fn inbound_flows(&self) -> Vec<String> {
        self.inbound.read().await.iter().cloned().collect()
    }
}

#[async_trait]
impl Participant for ChannelParticipant {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send_message(&self, message: &RoomMessage) {
        if self.is_closed() {
            debug!(
                participant = %self.name,
                kind = message.kind(),
                "Dropping message for closed participant"
            );
            return;
        }

        let frame = match serde_json::to_string(message) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(participant = %self.name, error = %e, "Could not serialize room message");
                return;
            }
        };

        if self.transport.send(frame).is_err() {
            debug!(participant = %self.name, "Transport closed, message dropped");
        }
    }

    async fn cancel_sending_to(&self, name: &str) {
        if self.inbound.write().await.remove(name) {
            debug!(
                participant = %self.name,
                sender = %name,
                "Cancelled media flow"
            );
        }
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            warn!(participant = %self.name, "Participant already closed");
            return;
        }

        let released = {
            let mut inbound = self.inbound.write().await;
            let count = inbound.len();
            inbound.clear();
            count
        };

        debug!(
            participant = %self.name,
            room = %self.room_name,
            released_flows = released,
            "Participant closed"
        );
    }
}

/// Factory producing `ChannelParticipant`s
#[derive(Debug, Default, Clone, Copy)]
pub struct ChannelParticipantFactory;

impl ParticipantFactory for ChannelParticipantFactory {
    fn create_participant(
        &self,
        name: &str,
        room_name: &str,
        transport: ParticipantTransport,
        pipeline: Arc<dyn MediaPipeline>,
    ) -> Arc<dyn Participant> {
        Arc::new(ChannelParticipant::new(name, room_name, transport, pipeline))
    }
}
