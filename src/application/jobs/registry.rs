use crate::adapters::outbound::network::{HttpFeedSource, DEFAULT_FEED_BASE_URL};
use crate::adapters::outbound::persistence::SqliteRecordsRepository;
use crate::application::dto::SyncRequest;
use crate::application::factories::{ReporterFactory, ReporterType};
use crate::application::use_cases::SyncFeedsUseCase;
use crate::ports::inbound::FeedSyncPort;
use crate::shared::error::SyncError;
use crate::shared::{Result, SyncResult};
use std::path::PathBuf;

/// Name of the built-in NVD synchronization job
pub const UPDATE_CVE_JOB: &str = "update-cve";

/// A job ready to be moved onto a worker thread
pub type BoxedJob = Box<dyn FeedSyncPort + Send>;

/// Wires a job's adapters from the runtime settings
pub type JobBuilder = fn(&RuntimeSettings, &SyncRequest) -> Result<BoxedJob>;

/// Where jobs read and write outside the process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeSettings {
    /// SQLite database holding records and fingerprints
    pub database: PathBuf,
    /// Staging directory for downloaded feeds
    pub work_dir: PathBuf,
    pub base_url: String,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            database: PathBuf::from("vulnerabilities.db"),
            work_dir: PathBuf::from("vulnerabilities"),
            base_url: DEFAULT_FEED_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct JobDescriptor {
    pub name: &'static str,
    pub summary: &'static str,
    pub build: JobBuilder,
}

/// JobRegistry - Explicit table of the jobs a runner can launch
#[derive(Debug, Clone, Default)]
pub struct JobRegistry {
    jobs: Vec<JobDescriptor>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every job shipped in this crate
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(JobDescriptor {
            name: UPDATE_CVE_JOB,
            summary: "Synchronize the local vulnerability database with the NVD CVE feeds",
            build: build_update_cve,
        });
        registry
    }

    /// Adds a job, replacing any job registered under the same name
    pub fn register(&mut self, descriptor: JobDescriptor) -> &mut Self {
        self.jobs.retain(|job| job.name != descriptor.name);
        self.jobs.push(descriptor);
        self
    }

    /// # Errors
    /// Returns `SyncError::UnknownJob` listing the registered names
    pub fn get(&self, name: &str) -> SyncResult<&JobDescriptor> {
        self.jobs
            .iter()
            .find(|job| job.name == name)
            .ok_or_else(|| SyncError::UnknownJob {
                name: name.to_string(),
                known: self.names().join(", "),
            })
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.jobs.iter().map(|job| job.name).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &JobDescriptor> {
        self.jobs.iter()
    }
}

fn build_update_cve(settings: &RuntimeSettings, request: &SyncRequest) -> Result<BoxedJob> {
    let feed_source = HttpFeedSource::new(settings.base_url.as_str(), settings.work_dir.as_path())?;
    let repository = SqliteRecordsRepository::open(&settings.database)?;
    let reporter = ReporterFactory::create(ReporterType::for_silent(request.silent));
    Ok(Box::new(SyncFeedsUseCase::new(
        feed_source,
        repository,
        reporter,
    )))
}
