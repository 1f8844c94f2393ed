#![allow(dead_code)] // Test utilities may not all be used in every test

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Duration;

use basicroom::{Participant, Room, RoomError};

use super::mocks::{MockPipelineFactory, RecordingParticipant, RecordingParticipantFactory};

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub struct TestSetup {
    pub room: Arc<Room>,
    pub participants: Arc<RecordingParticipantFactory>,
    pub pipelines: Arc<MockPipelineFactory>,
}

impl TestSetup {
    /// Joins `name` with a throwaway transport
    pub async fn join(&self, name: &str) -> Result<Arc<dyn Participant>, RoomError> {
        let (tx, _rx) = mpsc::unbounded_channel();
        self.room.join(name, tx).await
    }

    pub fn participant(&self, name: &str) -> Arc<RecordingParticipant> {
        self.participants.participant(name)
    }
}

pub struct TestSetupBuilder {
    room_name: String,
    players: Vec<String>,
    fail_creation: bool,
    fail_release: bool,
    creation_delay: Option<Duration>,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self {
            room_name: "R".to_string(),
            players: vec![],
            fail_creation: false,
            fail_release: false,
            creation_delay: None,
        }
    }

    pub fn with_players(mut self, players: Vec<&str>) -> Self {
        self.players = players.into_iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_failing_pipeline(mut self) -> Self {
        self.fail_creation = true;
        self
    }

    pub fn with_failing_release(mut self) -> Self {
        self.fail_release = true;
        self
    }

    /// Pipeline creation sleeps for `delay`. Applied after the initial
    /// players have joined.
    pub fn with_slow_pipeline(mut self, delay: Duration) -> Self {
        self.creation_delay = Some(delay);
        self
    }

    /// Builds the room and joins the configured players in order, then
    /// forgets everything they were sent while joining
    pub async fn build(self) -> TestSetup {
        let participants = Arc::new(RecordingParticipantFactory::new());
        let pipelines = Arc::new(MockPipelineFactory::new());
        pipelines.set_fail_creation(self.fail_creation);
        pipelines.set_fail_release(self.fail_release);

        let room = Arc::new(Room::new(
            self.room_name,
            pipelines.clone(),
            participants.clone(),
        ));

        let setup = TestSetup {
            room,
            participants,
            pipelines,
        };

        for player in &self.players {
            setup.join(player).await.expect("player should join");
        }
        for player in &self.players {
            setup.participant(player).clear().await;
        }
        if let Some(delay) = self.creation_delay {
            setup.pipelines.set_creation_delay(delay);
        }

        setup
    }
}
