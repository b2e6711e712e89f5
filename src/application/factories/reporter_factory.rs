use crate::adapters::outbound::console::{SilentProgressReporter, StderrProgressReporter};
use crate::ports::outbound::ProgressReporter;

/// Progress reporter selection for a job run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReporterType {
    Stderr,
    Silent,
}

impl ReporterType {
    pub fn for_silent(silent: bool) -> Self {
        if silent {
            ReporterType::Silent
        } else {
            ReporterType::Stderr
        }
    }
}

/// Factory for creating progress reporters
///
/// Reporters are created per job and moved onto the worker thread, hence
/// the `Send` bound on the returned trait object.
pub struct ReporterFactory;

impl ReporterFactory {
    pub fn create(reporter_type: ReporterType) -> Box<dyn ProgressReporter + Send> {
        match reporter_type {
            ReporterType::Stderr => Box::new(StderrProgressReporter::new()),
            ReporterType::Silent => Box::new(SilentProgressReporter::new()),
        }
    }
}
