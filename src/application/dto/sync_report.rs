use crate::feed_sync::domain::FeedId;
use serde::Serialize;
use std::collections::BTreeSet;

/// A feed that was excluded from this run, with the reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedFeed {
    pub feed: String,
    pub reason: String,
}

/// SyncReport - Outcome of one synchronization pass
///
/// Feeds are reported by their identifier string ("2015", "Modified").
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Feeds downloaded successfully
    pub fetched: Vec<String>,
    /// Feeds skipped because their fingerprint did not change
    pub unchanged: Vec<String>,
    /// Feeds transformed and written, fingerprint persisted
    pub imported: Vec<String>,
    pub failed: Vec<FailedFeed>,
    /// Yearly feeds implied by the aggregate feed
    pub implied_years: BTreeSet<u16>,
    pub records_written: usize,
    pub affected_written: usize,
    pub cleared: bool,
    pub cancelled: bool,
}

impl SyncReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_fetched(&mut self, feed: FeedId) {
        self.fetched.push(feed.to_string());
    }

    pub(crate) fn record_unchanged(&mut self, feed: FeedId) {
        self.unchanged.push(feed.to_string());
    }

    pub(crate) fn record_imported(&mut self, feed: FeedId, records: usize, affected: usize) {
        self.imported.push(feed.to_string());
        self.records_written += records;
        self.affected_written += affected;
    }

    pub(crate) fn record_failure(&mut self, feed: FeedId, reason: impl Into<String>) {
        self.failed.push(FailedFeed {
            feed: feed.to_string(),
            reason: reason.into(),
        });
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    /// True when every requested feed was handled and nothing was cancelled
    pub fn is_clean(&self) -> bool {
        !self.cancelled && !self.has_failures()
    }
}
