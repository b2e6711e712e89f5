use crate::feed_sync::domain::{FeedContent, Fingerprint};
use crate::ports::outbound::RecordsRepository;
use crate::shared::SyncResult;

/// Outcome of comparing fetched content with the stored fingerprint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeVerdict {
    pub changed: bool,
    /// Fingerprint to persist once the feed has been written successfully
    pub fingerprint: Fingerprint,
}

/// ChangeDetector service deciding whether a feed needs reparsing
///
/// Never writes to the store: persisting the new fingerprint is left to the
/// caller, after transformation and persistence both succeeded.
pub struct ChangeDetector;

impl ChangeDetector {
    /// Compares freshly fetched content against the stored fingerprint
    ///
    /// The aggregate feed is always reported as changed with the empty
    /// fingerprint; the store is not consulted for it.
    pub fn has_changed<R>(content: &FeedContent, store: &R) -> SyncResult<ChangeVerdict>
    where
        R: RecordsRepository + ?Sized,
    {
        let feed = content.feed();
        if feed.is_aggregate() {
            return Ok(ChangeVerdict {
                changed: true,
                fingerprint: Fingerprint::empty(),
            });
        }

        let fingerprint = Fingerprint::of(content.bytes());
        let changed = match store.get_fingerprint(feed)? {
            Some(stored) => stored != fingerprint,
            None => true,
        };

        tracing::debug!(
            feed = %feed,
            fingerprint = %fingerprint,
            changed,
            "Compared feed fingerprint"
        );

        Ok(ChangeVerdict {
            changed,
            fingerprint,
        })
    }
}
