use crate::application::dto::{SyncReport, SyncRequest};
use crate::feed_sync::domain::{FeedId, Fingerprint};
use crate::feed_sync::services::{ChangeDetector, FeedTransformer, TransformOutcome};
use crate::ports::inbound::FeedSyncPort;
use crate::ports::outbound::{FeedSource, ProgressReporter, RecordsRepository};
use crate::shared::error::SyncError;
use crate::shared::{Result, SyncResult};
use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[cfg(test)]
mod tests;

/// Changed feeds waiting for import, keyed (and therefore ordered) by feed.
/// Only fingerprints are kept; documents are reloaded from staging on import.
type PendingFeeds = BTreeMap<FeedId, Fingerprint>;

/// Result of importing a single changed feed
enum ImportOutcome {
    Imported {
        records: usize,
        affected: usize,
        implied_years: BTreeSet<u16>,
    },
    Cancelled,
}

/// SyncFeedsUseCase - Reconciliation driver for the NVD feeds
///
/// Runs the synchronization phases in order:
/// 1. fetch every requested feed and keep the ones whose fingerprint changed
/// 2. transform and write the changed feeds in ascending feed order,
///    persisting each fingerprint right after its feed was written
/// 3. when the aggregate feed was imported, repeat 1 and 2 for the yearly
///    feeds its entries belong to
/// 4. persist the last-sync timestamp unless the run was cancelled
///
/// # Type Parameters
/// * `F` - FeedSource implementation
/// * `R` - RecordsRepository implementation
/// * `P` - ProgressReporter implementation
pub struct SyncFeedsUseCase<F, R, P> {
    feed_source: F,
    repository: R,
    progress_reporter: P,
}

impl<F, R, P> SyncFeedsUseCase<F, R, P>
where
    F: FeedSource,
    R: RecordsRepository,
    P: ProgressReporter,
{
    /// Creates a new SyncFeedsUseCase with injected dependencies
    pub fn new(feed_source: F, repository: R, progress_reporter: P) -> Self {
        Self {
            feed_source,
            repository,
            progress_reporter,
        }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Executes one synchronization pass
    ///
    /// # Errors
    /// Fails only when clearing the repository fails or the repository
    /// reports itself unavailable. Per-feed problems end up in the report.
    pub fn execute(&self, request: &SyncRequest, cancel: &CancellationToken) -> Result<SyncReport> {
        let mut report = SyncReport::new();

        if request.clear_existing {
            self.progress_reporter
                .report("🗑️  Removing existing vulnerability records...");
            self.repository.delete_all()?;
            report.cleared = true;
            info!("Cleared existing vulnerability records");
        }

        let requested = dedupe(&request.feeds);
        info!(feeds = requested.len(), "Starting feed synchronization");

        let implied_years = self.synchronize_feeds(&requested, cancel, &mut report)?;

        if let Some(years) = implied_years.filter(|_| !report.cancelled) {
            report.implied_years = years.clone();
            if !years.is_empty() {
                let feeds: Vec<FeedId> = years.into_iter().map(FeedId::Year).collect();
                info!(
                    feeds = %join_feeds(&feeds),
                    "Synchronizing yearly feeds touched by the aggregate feed"
                );
                self.synchronize_feeds(&feeds, cancel, &mut report)?;
            }
        }

        if report.cancelled {
            warn!("Synchronization cancelled, last sync timestamp left unchanged");
            self.progress_reporter
                .report_error("⚠️  Synchronization cancelled");
            return Ok(report);
        }

        self.persist_last_sync()?;
        self.report_summary(&report);
        Ok(report)
    }

    /// Phases 1 and 2 for one list of feeds
    ///
    /// # Returns
    /// The years implied by the aggregate feed if it was imported
    fn synchronize_feeds(
        &self,
        feeds: &[FeedId],
        cancel: &CancellationToken,
        report: &mut SyncReport,
    ) -> SyncResult<Option<BTreeSet<u16>>> {
        let pending = self.fetch_changed(feeds, cancel, report)?;
        if report.cancelled || pending.is_empty() {
            return Ok(None);
        }
        self.import_changed(pending, cancel, report)
    }

    fn fetch_changed(
        &self,
        feeds: &[FeedId],
        cancel: &CancellationToken,
        report: &mut SyncReport,
    ) -> SyncResult<PendingFeeds> {
        let mut pending = PendingFeeds::new();
        self.progress_reporter
            .report(&format!("📥 Downloading {} feed(s)...", feeds.len()));

        for (index, &feed) in feeds.iter().enumerate() {
            if cancel.is_cancelled() {
                info!(feed = %feed, "Cancellation observed before download");
                report.cancelled = true;
                break;
            }
            self.progress_reporter.report_progress(
                index,
                feeds.len(),
                Some(&format!("nvdcve-{}", feed)),
            );

            let content = match self.feed_source.fetch(feed) {
                Ok(content) => content,
                Err(e) => {
                    self.exclude_feed(feed, e, report)?;
                    continue;
                }
            };
            report.record_fetched(feed);
            debug!(feed = %feed, bytes = content.len(), "Downloaded feed");

            match ChangeDetector::has_changed(&content, &self.repository) {
                Ok(verdict) if verdict.changed => {
                    pending.insert(feed, verdict.fingerprint);
                }
                Ok(_) => {
                    info!(feed = %feed, "Feed unchanged, skipping");
                    report.record_unchanged(feed);
                }
                Err(e) => self.exclude_feed(feed, e, report)?,
            }
        }

        if !report.cancelled {
            self.progress_reporter
                .report_progress(feeds.len(), feeds.len(), Some("downloaded"));
        }
        Ok(pending)
    }

    fn import_changed(
        &self,
        pending: PendingFeeds,
        cancel: &CancellationToken,
        report: &mut SyncReport,
    ) -> SyncResult<Option<BTreeSet<u16>>> {
        let total = pending.len();
        let mut implied: Option<BTreeSet<u16>> = None;
        self.progress_reporter
            .report(&format!("🔄 Importing {} changed feed(s)...", total));

        for (index, (feed, fingerprint)) in pending.into_iter().enumerate() {
            if cancel.is_cancelled() {
                info!(feed = %feed, "Cancellation observed before import");
                report.cancelled = true;
                break;
            }
            self.progress_reporter
                .report_progress(index, total, Some(&format!("nvdcve-{}", feed)));

            match self.import_feed(feed, &fingerprint, cancel) {
                Ok(ImportOutcome::Imported {
                    records,
                    affected,
                    implied_years,
                }) => {
                    info!(feed = %feed, records, affected, "Imported feed");
                    report.record_imported(feed, records, affected);
                    if feed.is_aggregate() {
                        implied.get_or_insert_with(BTreeSet::new).extend(implied_years);
                    }
                }
                Ok(ImportOutcome::Cancelled) => {
                    info!(feed = %feed, "Cancellation observed during transform");
                    report.cancelled = true;
                    break;
                }
                Err(e) => self.exclude_feed(feed, e, report)?,
            }
        }

        Ok(implied)
    }

    /// Reloads one staged feed, writes it, then stores its fingerprint
    fn import_feed(
        &self,
        feed: FeedId,
        fingerprint: &Fingerprint,
        cancel: &CancellationToken,
    ) -> SyncResult<ImportOutcome> {
        let content = self.feed_source.load_staged(feed)?;
        let transform = match FeedTransformer::transform(&content, cancel)? {
            TransformOutcome::Complete(transform) => transform,
            TransformOutcome::Cancelled => return Ok(ImportOutcome::Cancelled),
        };

        let records = self.repository.upsert_vulnerabilities(&transform.records)?;
        let affected = self.repository.insert_affected(&transform.affected)?;
        self.repository.set_fingerprint(feed, fingerprint)?;

        Ok(ImportOutcome::Imported {
            records,
            affected,
            implied_years: transform.implied_years,
        })
    }

    /// Logs a per-feed failure and records it, unless it is fatal
    fn exclude_feed(&self, feed: FeedId, e: SyncError, report: &mut SyncReport) -> SyncResult<()> {
        if e.is_fatal() {
            error!(feed = %feed, error = %e, "Repository unavailable, aborting synchronization");
            return Err(e);
        }
        error!(feed = %feed, error = %e, "Feed excluded from this run");
        self.progress_reporter
            .report_error(&format!("⚠️  Feed {} skipped: {}", feed, short_reason(&e)));
        report.record_failure(feed, e.to_string());
        Ok(())
    }

    fn persist_last_sync(&self) -> SyncResult<()> {
        let now = Utc::now();
        match self.repository.set_last_sync(now) {
            Ok(()) => {
                debug!(timestamp = %now, "Stored last sync timestamp");
                Ok(())
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!(error = %e, "Failed to store last sync timestamp");
                Ok(())
            }
        }
    }

    fn report_summary(&self, report: &SyncReport) {
        let message = format!(
            "✅ Synchronization complete: {} feed(s) imported, {} unchanged, {} failed ({} records, {} affected products)",
            report.imported.len(),
            report.unchanged.len(),
            report.failed.len(),
            report.records_written,
            report.affected_written
        );
        info!(
            imported = report.imported.len(),
            unchanged = report.unchanged.len(),
            failed = report.failed.len(),
            "Synchronization complete"
        );
        self.progress_reporter.report_completion(&message);
    }
}

impl<F, R, P> FeedSyncPort for SyncFeedsUseCase<F, R, P>
where
    F: FeedSource,
    R: RecordsRepository,
    P: ProgressReporter,
{
    fn synchronize(&self, request: &SyncRequest, cancel: &CancellationToken) -> Result<SyncReport> {
        self.execute(request, cancel)
    }
}

fn dedupe(feeds: &[FeedId]) -> Vec<FeedId> {
    let mut seen = BTreeSet::new();
    feeds.iter().copied().filter(|feed| seen.insert(*feed)).collect()
}

fn join_feeds(feeds: &[FeedId]) -> String {
    feeds
        .iter()
        .map(FeedId::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

fn short_reason(e: &SyncError) -> String {
    e.to_string().lines().take(2).collect::<Vec<_>>().join(" - ")
}
