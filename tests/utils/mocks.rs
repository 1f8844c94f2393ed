#![allow(dead_code)] // Test utilities may not all be used in every test

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;
use tokio::time::{sleep, Duration};

use basicroom::{
    MediaPipeline, Participant, ParticipantFactory, ParticipantTransport, PipelineError,
    PipelineFactory, RoomMessage,
};

// ============================================================================
// Mock Participants
// ============================================================================

/// Everything the room asked a participant to do, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Message(RoomMessage),
    CancelSendingTo(String),
    Close,
}

pub struct RecordingParticipant {
    name: String,
    calls: RwLock<Vec<Call>>,
}

impl RecordingParticipant {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            calls: RwLock::new(Vec::new()),
        }
    }

    pub async fn calls(&self) -> Vec<Call> {
        self.calls.read().await.clone()
    }

    pub async fn messages(&self) -> Vec<RoomMessage> {
        self.calls
            .read()
            .await
            .iter()
            .filter_map(|call| match call {
                Call::Message(message) => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    pub async fn close_count(&self) -> usize {
        self.calls
            .read()
            .await
            .iter()
            .filter(|call| **call == Call::Close)
            .count()
    }

    pub async fn clear(&self) {
        self.calls.write().await.clear();
    }
}

#[async_trait]
impl Participant for RecordingParticipant {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send_message(&self, message: &RoomMessage) {
        self.calls.write().await.push(Call::Message(message.clone()));
    }

    async fn cancel_sending_to(&self, name: &str) {
        self.calls
            .write()
            .await
            .push(Call::CancelSendingTo(name.to_string()));
    }

    async fn close(&self) {
        self.calls.write().await.push(Call::Close);
    }
}

/// Hands out RecordingParticipants and keeps them for inspection
#[derive(Default)]
pub struct RecordingParticipantFactory {
    created: Mutex<HashMap<String, Arc<RecordingParticipant>>>,
    creations: AtomicUsize,
}

impl RecordingParticipantFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recently created participant with this name
    pub fn participant(&self, name: &str) -> Arc<RecordingParticipant> {
        self.created
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .unwrap_or_else(|| panic!("no participant named {} was created", name))
    }

    /// Number of participants built, counting repeated names
    pub fn created_count(&self) -> usize {
        self.creations.load(Ordering::SeqCst)
    }
}

impl ParticipantFactory for RecordingParticipantFactory {
    fn create_participant(
        &self,
        name: &str,
        _room_name: &str,
        _transport: ParticipantTransport,
        _pipeline: Arc<dyn MediaPipeline>,
    ) -> Arc<dyn Participant> {
        self.creations.fetch_add(1, Ordering::SeqCst);
        let participant = Arc::new(RecordingParticipant::new(name));
        self.created
            .lock()
            .unwrap()
            .insert(name.to_string(), participant.clone());
        participant
    }
}

// ============================================================================
// Mock Pipelines
// ============================================================================

pub struct MockPipeline {
    id: String,
    releases: Arc<AtomicUsize>,
    fail_release: bool,
}

#[async_trait]
impl MediaPipeline for MockPipeline {
    fn id(&self) -> &str {
        &self.id
    }

    async fn release(&self) -> Result<(), PipelineError> {
        self.releases.fetch_add(1, Ordering::SeqCst);
        if self.fail_release {
            return Err(PipelineError::release(&self.id, "mock release failure"));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MockPipelineFactory {
    created: AtomicUsize,
    attempts: AtomicUsize,
    releases: Arc<AtomicUsize>,
    fail_creation: AtomicBool,
    fail_release: AtomicBool,
    creation_delay_ms: AtomicU64,
}

impl MockPipelineFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_creation(&self, fail: bool) {
        self.fail_creation.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_release(&self, fail: bool) {
        self.fail_release.store(fail, Ordering::SeqCst);
    }

    /// Makes every creation sleep first, keeping concurrent joins in flight
    pub fn set_creation_delay(&self, delay: Duration) {
        self.creation_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn creation_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PipelineFactory for MockPipelineFactory {
    async fn create_pipeline(&self) -> Result<Arc<dyn MediaPipeline>, PipelineError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let delay = self.creation_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            sleep(Duration::from_millis(delay)).await;
        }
        if self.fail_creation.load(Ordering::SeqCst) {
            return Err(PipelineError::creation("mock media server down"));
        }

        let n = self.created.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MockPipeline {
            id: format!("mock-pipeline-{}", n),
            releases: self.releases.clone(),
            fail_release: self.fail_release.load(Ordering::SeqCst),
        }))
    }
}
