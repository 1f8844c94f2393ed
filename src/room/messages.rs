use serde::{Deserialize, Serialize};

/// Membership events broadcast by a room
///
/// Serialised as JSON objects tagged by `kind`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum RoomMessage {
    /// Sent to every existing member when someone joins
    ParticipantArrived { name: String },

    /// Sent to every remaining member when someone leaves
    ParticipantLeft { name: String },

    /// Sent only to a newcomer: everyone already in the room, in join order
    ExistingParticipants { names: Vec<String> },
}

impl RoomMessage {
    pub fn participant_arrived(name: impl Into<String>) -> Self {
        RoomMessage::ParticipantArrived { name: name.into() }
    }

    pub fn participant_left(name: impl Into<String>) -> Self {
        RoomMessage::ParticipantLeft { name: name.into() }
    }

    pub fn existing_participants(names: Vec<String>) -> Self {
        RoomMessage::ExistingParticipants { names }
    }

    /// Wire name of the event kind
    pub fn kind(&self) -> &'static str {
        match self {
            RoomMessage::ParticipantArrived { .. } => "participant-arrived",
            RoomMessage::ParticipantLeft { .. } => "participant-left",
            RoomMessage::ExistingParticipants { .. } => "existing-participants",
        }
    }
}
