use futures::future::BoxFuture;
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};
use strum_macros::Display;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, warn};

use super::TaskError;

/// Callback invoked by the worker for every failed task
///
/// Receives the serializer's label and the failure.
pub type TaskFailureHook = Arc<dyn Fn(&str, &TaskError) + Send + Sync>;

/// What happened to a submitted task, as seen by its submitter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum TaskOutcome {
    /// The task ran and returned Ok
    Completed,
    /// The task returned an error or panicked; already reported by the worker
    Failed,
    /// The serializer was shut down before submission
    Rejected,
    /// The worker went away before reporting back
    Abandoned,
}

struct Job {
    task: BoxFuture<'static, Result<(), TaskError>>,
    done: oneshot::Sender<TaskOutcome>,
}

/// Single-worker task queue
///
/// Tasks run strictly one at a time, in submission order. `shutdown` stops
/// new submissions; tasks already queued still run before the worker exits.
pub struct TaskSerializer {
    label: String,
    sender: Mutex<Option<mpsc::UnboundedSender<Job>>>,
}

impl TaskSerializer {
    /// Spawns the worker on the current tokio runtime
    pub fn new(label: impl Into<String>) -> Self {
        Self::spawn(label.into(), None)
    }

    /// Like `new`, but every task failure is also passed to `hook`
    pub fn with_failure_hook(label: impl Into<String>, hook: TaskFailureHook) -> Self {
        Self::spawn(label.into(), Some(hook))
    }

    fn spawn(label: String, hook: Option<TaskFailureHook>) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        tokio::spawn(run_worker(label.clone(), receiver, hook));
        debug!(serializer = %label, "Task serializer started");

        Self {
            label,
            sender: Mutex::new(Some(sender)),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Queues `task` and waits until the worker has run it.
    ///
    /// Dropping the returned future does not cancel the task once queued.
    pub async fn execute<F>(&self, task: F) -> TaskOutcome
    where
        F: Future<Output = Result<(), TaskError>> + Send + 'static,
    {
        let (done, outcome) = oneshot::channel();
        let job = Job {
            task: task.boxed(),
            done,
        };

        let submitted = {
            let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
            match sender.as_ref() {
                Some(sender) => sender.send(job).is_ok(),
                None => false,
            }
        };

        if !submitted {
            debug!(serializer = %self.label, "Task rejected, serializer is shut down");
            return TaskOutcome::Rejected;
        }

        outcome.await.unwrap_or(TaskOutcome::Abandoned)
    }

    /// Stops accepting tasks. Idempotent.
    pub fn shutdown(&self) {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if sender.is_some() {
            debug!(serializer = %self.label, "Task serializer shutting down");
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

async fn run_worker(
    label: String,
    mut receiver: mpsc::UnboundedReceiver<Job>,
    hook: Option<TaskFailureHook>,
) {
    while let Some(job) = receiver.recv().await {
        let failure = match AssertUnwindSafe(job.task).catch_unwind().await {
            Ok(Ok(())) => None,
            Ok(Err(e)) => {
                warn!(serializer = %label, error = %e, "Exception while executing a task");
                Some(e)
            }
            Err(panic) => {
                let e = TaskError::Panicked(panic_message(panic.as_ref()));
                error!(serializer = %label, error = %e, "Task panicked");
                Some(e)
            }
        };

        let outcome = match failure {
            None => TaskOutcome::Completed,
            Some(e) => {
                if let Some(hook) = &hook {
                    let called = panic::catch_unwind(AssertUnwindSafe(|| hook(&label, &e)));
                    if let Err(payload) = called {
                        error!(
                            serializer = %label,
                            error = %panic_message(payload.as_ref()),
                            "Task failure hook panicked"
                        );
                    }
                }
                TaskOutcome::Failed
            }
        };

        // The submitter may have stopped waiting
        let _ = job.done.send(outcome);
    }

    debug!(serializer = %label, "Task serializer worker stopped");
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
