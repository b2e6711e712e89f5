use crate::application::dto::{SyncReport, SyncRequest};
use crate::ports::inbound::FeedSyncPort;
use crate::shared::error::SyncError;
use crate::shared::SyncResult;
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Lifecycle of a background task
///
/// `Created -> Running -> {Finished, Cancelled}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Created,
    Running,
    Finished,
    Cancelled,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Finished | TaskState::Cancelled)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskState::Created => "created",
            TaskState::Running => "running",
            TaskState::Finished => "finished",
            TaskState::Cancelled => "cancelled",
        };
        write!(f, "{}", name)
    }
}

/// What `join` hands back once the worker has exited
#[derive(Debug, Clone, Serialize)]
pub struct JoinOutcome {
    pub state: TaskState,
    /// `None` when the job failed fatally or never started
    pub report: Option<SyncReport>,
}

/// BackgroundTask - Runs one synchronization on a dedicated worker thread
///
/// The task owns the job until `start` moves it onto the worker. The caller
/// keeps the handle to cancel, poll or join. Cancellation is advisory: the
/// job observes the token at its next checkpoint.
pub struct BackgroundTask<S> {
    id: Uuid,
    name: String,
    job: Option<S>,
    request: SyncRequest,
    cancel: CancellationToken,
    state: Arc<Mutex<TaskState>>,
    handle: Option<JoinHandle<Option<SyncReport>>>,
}

impl<S> BackgroundTask<S>
where
    S: FeedSyncPort + Send + 'static,
{
    pub fn new(name: impl Into<String>, job: S, request: SyncRequest) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            job: Some(job),
            request,
            cancel: CancellationToken::new(),
            state: Arc::new(Mutex::new(TaskState::Created)),
            handle: None,
        }
    }

    /// Uses an externally owned token, so the caller can cancel before `start`
    pub fn with_cancellation_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> TaskState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// True once the worker thread has exited (or the task never ran and was joined)
    pub fn is_finished(&self) -> bool {
        match &self.handle {
            Some(handle) => handle.is_finished(),
            None => self.state().is_terminal(),
        }
    }

    /// Token shared with the worker, for callers that cancel from elsewhere
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Spawns the worker thread
    ///
    /// # Errors
    /// Returns `SyncError::TaskAlreadyStarted` on a second call and
    /// `SyncError::TaskSpawn` when the OS refuses a new thread.
    pub fn start(&mut self) -> SyncResult<()> {
        let job = self.job.take().ok_or(SyncError::TaskAlreadyStarted)?;
        let request = self.request.clone();
        let cancel = self.cancel.clone();
        let state = Arc::clone(&self.state);
        let task_id = self.id;
        let job_name = self.name.clone();

        self.set_state(TaskState::Running);
        let spawned = thread::Builder::new()
            .name(format!("{}-{}", self.name, short_id(&self.id)))
            .spawn(move || {
                info!(task = %task_id, job = %job_name, "Task started");
                let report = match job.synchronize(&request, &cancel) {
                    Ok(report) => Some(report),
                    Err(e) => {
                        error!(task = %task_id, job = %job_name, error = %e, "Task failed");
                        None
                    }
                };

                let terminal = if report.as_ref().is_some_and(|r| r.cancelled) {
                    TaskState::Cancelled
                } else {
                    TaskState::Finished
                };
                *state.lock().unwrap_or_else(PoisonError::into_inner) = terminal;
                info!(task = %task_id, job = %job_name, state = %terminal, "Task exited");
                report
            });

        match spawned {
            Ok(handle) => {
                self.handle = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.set_state(TaskState::Finished);
                Err(SyncError::TaskSpawn {
                    details: e.to_string(),
                })
            }
        }
    }

    /// Requests cancellation; the worker stops at its next checkpoint
    pub fn cancel(&self) {
        info!(task = %self.id, job = %self.name, "Cancellation requested");
        self.cancel.cancel();
    }

    /// Blocks until the worker exits
    pub fn join(mut self) -> JoinOutcome {
        let Some(handle) = self.handle.take() else {
            return JoinOutcome {
                state: self.state(),
                report: None,
            };
        };

        let report = match handle.join() {
            Ok(report) => report,
            Err(_) => {
                warn!(task = %self.id, job = %self.name, "Task worker panicked");
                self.set_state(TaskState::Finished);
                None
            }
        };

        JoinOutcome {
            state: self.state(),
            report,
        }
    }

    /// Foreground execution: start, then wait for the outcome
    pub fn run_to_completion(mut self) -> SyncResult<JoinOutcome> {
        self.start()?;
        Ok(self.join())
    }

    fn set_state(&self, state: TaskState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }
}

fn short_id(id: &Uuid) -> String {
    id.simple().to_string()[..8].to_string()
}
