//! nvd-feed-sync - Incremental NVD CVE feed synchronizer
//!
//! This library downloads the yearly NVD vulnerability feeds, detects which
//! ones changed since the last run, and loads the changed ones into a local
//! vulnerability database, following hexagonal architecture and
//! Domain-Driven Design principles.
//!
//! # Architecture
//!
//! The library is organized into the following layers:
//!
//! - **Domain Layer** (`feed_sync`): Feed identifiers, fingerprints, records
//!   and the pure change-detection and transformation services
//! - **Application Layer** (`application`): Synchronization use case, job
//!   registry and background tasks
//! - **Ports** (`ports`): Interface definitions for infrastructure
//! - **Adapters** (`adapters`): Concrete implementations of ports
//! - **Shared** (`shared`): Common utilities, logging and error types
//!
//! # Example
//!
//! ```no_run
//! use nvd_feed_sync::prelude::*;
//! use tokio_util::sync::CancellationToken;
//!
//! # fn main() -> Result<()> {
//! // Create adapters
//! let feed_source = HttpFeedSource::new(DEFAULT_FEED_BASE_URL, "vulnerabilities")?;
//! let repository = SqliteRecordsRepository::open("vulnerabilities.db")?;
//! let progress_reporter = StderrProgressReporter::new();
//!
//! // Create use case
//! let use_case = SyncFeedsUseCase::new(feed_source, repository, progress_reporter);
//!
//! // Execute
//! let request = SyncRequest::new(vec![FeedId::Year(2015), FeedId::Modified], false);
//! let report = use_case.execute(&request, &CancellationToken::new())?;
//! println!("{} feed(s) imported", report.imported.len());
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod application;
pub mod feed_sync;
pub mod ports;
pub mod shared;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::adapters::outbound::console::{SilentProgressReporter, StderrProgressReporter};
    pub use crate::adapters::outbound::filesystem::StagingArea;
    pub use crate::adapters::outbound::network::{HttpFeedSource, DEFAULT_FEED_BASE_URL};
    pub use crate::adapters::outbound::persistence::SqliteRecordsRepository;
    pub use crate::application::dto::{
        ExecutionMode, FailedFeed, JobParameters, SyncReport, SyncRequest,
    };
    pub use crate::application::jobs::{
        JobDescriptor, JobRegistry, JobRunner, LaunchOutcome, RuntimeSettings, UPDATE_CVE_JOB,
    };
    pub use crate::application::tasks::{BackgroundTask, JoinOutcome, TaskState};
    pub use crate::application::use_cases::SyncFeedsUseCase;
    pub use crate::feed_sync::domain::{
        AffectedProductVersion, FeedContent, FeedId, Fingerprint, VulnerabilityRecord,
        VERSION_PREV_UNSET,
    };
    pub use crate::feed_sync::policies::{FeedSelection, FIRST_FEED_YEAR};
    pub use crate::feed_sync::services::{
        ChangeDetector, ChangeVerdict, FeedTransform, FeedTransformer, TransformOutcome,
    };
    pub use crate::ports::inbound::FeedSyncPort;
    pub use crate::ports::outbound::{FeedSource, ProgressReporter, RecordsRepository};
    pub use crate::shared::error::{ExitCode, SyncError};
    pub use crate::shared::{Result, SyncResult};
}
