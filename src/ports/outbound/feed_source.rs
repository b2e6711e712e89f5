use crate::feed_sync::domain::{FeedContent, FeedId};
use crate::shared::SyncResult;

/// FeedSource port for retrieving one feed document
///
/// This port abstracts the remote feed endpoint (e.g., the NVD download
/// site). Implementations return the decompressed document bytes and keep a
/// staged copy that can be loaded again later in the same run.
pub trait FeedSource {
    /// Fetches and decompresses a single feed
    ///
    /// # Errors
    /// Returns `SyncError::Fetch` or `SyncError::Decompress`. Both are scoped
    /// to the given feed; callers continue with the remaining feeds.
    fn fetch(&self, feed: FeedId) -> SyncResult<FeedContent>;

    /// Reloads the document kept by the last successful `fetch` of a feed
    ///
    /// Callers hold only fingerprints between detecting a change and
    /// importing it, so the document is read again here.
    ///
    /// # Errors
    /// Returns `SyncError::Fetch` when no staged copy can be read.
    fn load_staged(&self, feed: FeedId) -> SyncResult<FeedContent>;
}
