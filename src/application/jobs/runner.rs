use super::registry::{BoxedJob, JobRegistry, RuntimeSettings};
use crate::application::dto::{JobParameters, SyncRequest};
use crate::application::tasks::{BackgroundTask, JoinOutcome};
use crate::feed_sync::policies::FIRST_FEED_YEAR;
use crate::shared::Result;
use chrono::{Datelike, Utc};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Task handle for a job launched in background mode
pub type JobTask = BackgroundTask<BoxedJob>;

pub enum LaunchOutcome {
    /// Foreground run, already joined
    Completed(JoinOutcome),
    /// Background run; the caller owns the handle
    Detached(JobTask),
}

/// JobRunner - Validates parameters and launches registered jobs
pub struct JobRunner<'a> {
    registry: &'a JobRegistry,
    settings: RuntimeSettings,
    cancel: CancellationToken,
}

impl<'a> JobRunner<'a> {
    pub fn new(registry: &'a JobRegistry, settings: RuntimeSettings) -> Self {
        Self {
            registry,
            settings,
            cancel: CancellationToken::new(),
        }
    }

    /// Launched tasks observe `cancel` instead of a private token
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn settings(&self) -> &RuntimeSettings {
        &self.settings
    }

    /// Launches a job by name
    ///
    /// Parameters are validated before anything is built, so a bad value
    /// never touches the network or the database.
    ///
    /// # Errors
    /// Unknown job names, invalid parameters, adapter construction failures
    /// and worker spawn failures.
    pub fn launch(&self, name: &str, parameters: &JobParameters) -> Result<LaunchOutcome> {
        let descriptor = self.registry.get(name)?;
        let request = SyncRequest::from_parameters(parameters, current_year())?;
        let job = (descriptor.build)(&self.settings, &request)?;

        let background = request.is_background();
        let mut task = BackgroundTask::new(descriptor.name, job, request)
            .with_cancellation_token(self.cancel.clone());
        info!(task = %task.id(), job = descriptor.name, background, "Launching job");

        if background {
            task.start()?;
            Ok(LaunchOutcome::Detached(task))
        } else {
            Ok(LaunchOutcome::Completed(task.run_to_completion()?))
        }
    }
}

fn current_year() -> u16 {
    u16::try_from(Utc::now().year()).unwrap_or(FIRST_FEED_YEAR)
}
