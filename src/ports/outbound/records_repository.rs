use crate::feed_sync::domain::{AffectedProductVersion, FeedId, Fingerprint, VulnerabilityRecord};
use crate::shared::SyncResult;
use chrono::{DateTime, Utc};

/// RecordsRepository port for persisting synchronized vulnerability data
///
/// This port abstracts the vulnerability store together with the
/// fingerprint store that remembers which feed content was last loaded.
///
/// Implementations report `SyncError::RepositoryUnavailable` when the store
/// cannot be reached at all, and `SyncError::Repository` for failures scoped
/// to a single operation.
pub trait RecordsRepository {
    /// Deletes every vulnerability record and affected-product tuple.
    /// Fingerprints and the last synchronization timestamp are kept.
    fn delete_all(&self) -> SyncResult<()>;

    /// Inserts or replaces records by CVE identifier
    ///
    /// # Returns
    /// The number of records written
    fn upsert_vulnerabilities(&self, records: &[VulnerabilityRecord]) -> SyncResult<usize>;

    /// Appends affected-product tuples without deduplication
    ///
    /// # Returns
    /// The number of tuples written
    fn insert_affected(&self, tuples: &[AffectedProductVersion]) -> SyncResult<usize>;

    /// Returns the fingerprint stored by the last successful synchronization
    fn get_fingerprint(&self, feed: FeedId) -> SyncResult<Option<Fingerprint>>;

    fn set_fingerprint(&self, feed: FeedId, fingerprint: &Fingerprint) -> SyncResult<()>;

    /// Records when the whole job last completed
    fn set_last_sync(&self, timestamp: DateTime<Utc>) -> SyncResult<()>;
}
