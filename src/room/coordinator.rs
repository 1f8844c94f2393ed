use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use strum_macros::Display;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, trace, warn};

use super::{messages::RoomMessage, roster::Roster};
use crate::executor::{TaskError, TaskFailureHook, TaskSerializer};
use crate::participant::{Participant, ParticipantFactory, ParticipantTransport};
use crate::pipeline::{MediaPipeline, PipelineFactory, PipelineRelease};
use crate::shared::RoomError;

/// Lifecycle state of a room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum RoomState {
    Open,
    Closed,
}

/// Per-room options
#[derive(Clone, Default)]
pub struct RoomOptions {
    /// Called by the room's task worker whenever a task passed to
    /// `Room::execute` fails
    pub task_failure_hook: Option<TaskFailureHook>,
}

/// A named collaborative room
///
/// Owns the roster, the shared media pipeline and a task serializer.
/// Share it between connection handlers as `Arc<Room>`.
///
/// Join and leave notifications are not globally ordered against each
/// other: a newcomer's snapshot can miss a member joining at the same time,
/// and two concurrent joiners may never hear of each other. Work that needs
/// stronger ordering goes through [`Room::execute`].
pub struct Room {
    name: String,
    roster: Roster,
    pipeline: Mutex<Option<Arc<dyn MediaPipeline>>>,
    pipeline_factory: Arc<dyn PipelineFactory>,
    participant_factory: Arc<dyn ParticipantFactory>,
    executor: TaskSerializer,
    closed: AtomicBool,
}

impl Room {
    /// Creates an empty open room. Must be called inside a tokio runtime.
    pub fn new(
        name: impl Into<String>,
        pipeline_factory: Arc<dyn PipelineFactory>,
        participant_factory: Arc<dyn ParticipantFactory>,
    ) -> Self {
        Self::with_options(
            name,
            pipeline_factory,
            participant_factory,
            RoomOptions::default(),
        )
    }

    pub fn with_options(
        name: impl Into<String>,
        pipeline_factory: Arc<dyn PipelineFactory>,
        participant_factory: Arc<dyn ParticipantFactory>,
        options: RoomOptions,
    ) -> Self {
        let name = name.into();
        let label = format!("room:{}", name);
        let executor = match options.task_failure_hook {
            Some(hook) => TaskSerializer::with_failure_hook(label, hook),
            None => TaskSerializer::new(label),
        };

        debug!(room = %name, "Room has been created");

        Self {
            name,
            roster: Roster::new(),
            pipeline: Mutex::new(None),
            pipeline_factory,
            participant_factory,
            executor,
            closed: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> RoomState {
        if self.is_closed() {
            RoomState::Closed
        } else {
            RoomState::Open
        }
    }

    fn check_closed(&self) -> Result<(), RoomError> {
        if self.is_closed() {
            return Err(RoomError::RoomClosed(self.name.clone()));
        }
        Ok(())
    }

    fn duplicate(&self, participant_name: &str) -> RoomError {
        RoomError::DuplicateParticipant {
            room: self.name.clone(),
            name: participant_name.to_string(),
        }
    }

    /// Adds a new member to the room.
    ///
    /// Creates the room pipeline on the first join. The newcomer receives the
    /// names of everyone already present, then everyone already present is
    /// told about the newcomer, then the newcomer enters the roster.
    #[instrument(skip(self, transport), fields(room = %self.name))]
    pub async fn join(
        &self,
        participant_name: &str,
        transport: ParticipantTransport,
    ) -> Result<Arc<dyn Participant>, RoomError> {
        self.check_closed()?;

        // Held until the participant is rostered; dropping it on any early
        // return frees the name again
        let Some(reservation) = self.roster.reserve(participant_name).await else {
            warn!(participant = %participant_name, "Rejecting join, name already in room");
            return Err(self.duplicate(participant_name));
        };

        let pipeline = self.ensure_pipeline().await?;

        debug!(participant = %participant_name, "Adding participant");
        let participant = self.participant_factory.create_participant(
            participant_name,
            &self.name,
            transport,
            pipeline,
        );

        let existing = self.roster.snapshot().await;
        let names = names_except(&existing, participant_name);
        debug!(
            participant = %participant_name,
            existing = names.len(),
            "Sending list of participants"
        );
        participant
            .send_message(&RoomMessage::existing_participants(names))
            .await;

        let arrival = RoomMessage::participant_arrived(participant_name);
        for other in &existing {
            other.send_message(&arrival).await;
        }
        debug!(
            participant = %participant_name,
            notified = existing.len(),
            "Notified other participants of new participant"
        );

        let seq = reservation.commit(participant.clone()).await;

        // close() may have drained the roster while we were notifying
        if self.is_closed() {
            if let Some(orphan) = self.roster.remove_if_seq(participant_name, seq).await {
                orphan.close().await;
            }
            return Err(RoomError::RoomClosed(self.name.clone()));
        }

        info!(participant = %participant_name, "Participant joined room");
        Ok(participant)
    }

    async fn ensure_pipeline(&self) -> Result<Arc<dyn MediaPipeline>, RoomError> {
        let mut slot = self.pipeline.lock().await;

        // close() flips the flag before taking the slot
        self.check_closed()?;

        if let Some(pipeline) = slot.as_ref() {
            return Ok(pipeline.clone());
        }

        debug!(room = %self.name, "Creating pipeline");
        let pipeline = self
            .pipeline_factory
            .create_pipeline()
            .await
            .inspect_err(|e| warn!(room = %self.name, error = %e, "Pipeline creation failed"))?;

        info!(room = %self.name, pipeline_id = %pipeline.id(), "Pipeline created");
        *slot = Some(pipeline.clone());
        Ok(pipeline)
    }

    /// Removes a member and tells everyone else.
    ///
    /// Each remaining member first stops any media flow with the leaver,
    /// then receives the departure notice. The leaver is closed last.
    #[instrument(
        skip(self, participant),
        fields(room = %self.name, participant = %participant.name())
    )]
    pub async fn leave(&self, participant: &dyn Participant) -> Result<(), RoomError> {
        self.check_closed()?;

        debug!("Participant leaving room");
        self.remove_participant(participant.name()).await?;
        participant.close().await;

        info!("Participant left room");
        Ok(())
    }

    async fn remove_participant(&self, name: &str) -> Result<(), RoomError> {
        self.check_closed()?;

        if self.roster.remove(name).await.is_none() {
            debug!(participant = %name, "Participant was not in the roster");
        }

        let remaining = self.roster.snapshot().await;
        let departure = RoomMessage::participant_left(name);
        debug!(
            participant = %name,
            notified = remaining.len(),
            "Notifying all participants of departure"
        );

        for other in &remaining {
            other.cancel_sending_to(name).await;
            other.send_message(&departure).await;
        }

        Ok(())
    }

    /// Sends `participant` the names of every other member in the room
    pub async fn send_participant_names(
        &self,
        participant: &dyn Participant,
    ) -> Result<(), RoomError> {
        self.check_closed()?;

        let names = names_except(&self.roster.snapshot().await, participant.name());
        debug!(
            room = %self.name,
            participant = %participant.name(),
            existing = names.len(),
            "Sending list of participants"
        );
        participant
            .send_message(&RoomMessage::existing_participants(names))
            .await;

        Ok(())
    }

    /// Snapshot of the current members in join order
    pub async fn list_participants(&self) -> Result<Vec<Arc<dyn Participant>>, RoomError> {
        self.check_closed()?;
        Ok(self.roster.snapshot().await)
    }

    /// Names of the current members in join order
    pub async fn participant_names(&self) -> Result<Vec<String>, RoomError> {
        self.check_closed()?;
        Ok(self
            .roster
            .snapshot()
            .await
            .iter()
            .map(|p| p.name().to_string())
            .collect())
    }

    pub async fn participant_count(&self) -> Result<usize, RoomError> {
        self.check_closed()?;
        Ok(self.roster.len().await)
    }

    pub async fn get_participant(
        &self,
        name: &str,
    ) -> Result<Option<Arc<dyn Participant>>, RoomError> {
        self.check_closed()?;
        Ok(self.roster.get(name).await)
    }

    /// Runs `task` on the room's task worker and waits for it.
    ///
    /// Tasks of one room never overlap. A failing task is logged and passed
    /// to the failure hook but never reported here. Once the worker has been
    /// shut down this is a no-op.
    pub async fn execute<F>(&self, task: F) -> Result<(), RoomError>
    where
        F: Future<Output = Result<(), TaskError>> + Send + 'static,
    {
        self.check_closed()?;

        let outcome = self.executor.execute(task).await;
        trace!(room = %self.name, outcome = %outcome, "Room task finished");

        Ok(())
    }

    /// Closes the room. Terminal and idempotent.
    ///
    /// Every member is closed and the roster emptied. If a pipeline was
    /// created its release is started in the background and the returned
    /// handle yields the outcome; `close` itself does not wait for it.
    #[instrument(skip(self), fields(room = %self.name))]
    pub async fn close(&self) -> Option<PipelineRelease> {
        if self.closed.swap(true, Ordering::SeqCst) {
            warn!("Closing an already closed room");
            return None;
        }

        self.executor.shutdown();

        let participants = self.roster.drain().await;
        let closed_participants = participants.len();
        for participant in participants {
            participant.close().await;
        }

        let pipeline = self.pipeline.lock().await.take();
        let release = pipeline.map(|pipeline| PipelineRelease::spawn(&self.name, pipeline));

        info!(
            closed_participants,
            releasing_pipeline = release.is_some(),
            "Room closed"
        );
        release
    }
}

impl Drop for Room {
    fn drop(&mut self) {
        if !self.is_closed() {
            warn!(room = %self.name, "Room dropped without being closed");
        }
    }
}

fn names_except(participants: &[Arc<dyn Participant>], excluded: &str) -> Vec<String> {
    participants
        .iter()
        .map(|p| p.name())
        .filter(|name| *name != excluded)
        .map(str::to_string)
        .collect()
}
