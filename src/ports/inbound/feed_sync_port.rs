use crate::application::dto::{SyncReport, SyncRequest};
use crate::shared::Result;
use tokio_util::sync::CancellationToken;

/// FeedSyncPort - Inbound port for the feed synchronization use case
///
/// This port defines the interface that drivers (the background task
/// controller, tests) use to run one synchronization pass.
pub trait FeedSyncPort {
    /// Synchronizes the requested feeds
    ///
    /// The token is checked before every feed download and before every
    /// feed entry is transformed. Work already committed stays committed.
    ///
    /// # Errors
    /// Returns an error only when the job cannot continue at all (e.g. the
    /// repository is unreachable). Per-feed failures are part of the report.
    fn synchronize(&self, request: &SyncRequest, cancel: &CancellationToken) -> Result<SyncReport>;
}

impl<T: FeedSyncPort + ?Sized> FeedSyncPort for Box<T> {
    fn synchronize(&self, request: &SyncRequest, cancel: &CancellationToken) -> Result<SyncReport> {
        (**self).synchronize(request, cancel)
    }
}
