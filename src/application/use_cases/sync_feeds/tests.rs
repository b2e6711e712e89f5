use super::*;
use crate::feed_sync::domain::{AffectedProductVersion, FeedContent, VulnerabilityRecord};
use chrono::DateTime;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

// Mock implementations for testing
#[derive(Default)]
struct MockFeedSource {
    feeds: HashMap<FeedId, String>,
    fetched: RefCell<Vec<FeedId>>,
    /// Copies left behind by successful fetches
    staged: RefCell<HashMap<FeedId, Vec<u8>>>,
    loaded: RefCell<Vec<FeedId>>,
    /// Feeds whose staged copy disappears before import
    lost_staging: Vec<FeedId>,
}

impl MockFeedSource {
    fn with_feed(mut self, feed: FeedId, xml: String) -> Self {
        self.feeds.insert(feed, xml);
        self
    }

    fn fetched(&self) -> Vec<FeedId> {
        self.fetched.borrow().clone()
    }

    fn loaded(&self) -> Vec<FeedId> {
        self.loaded.borrow().clone()
    }
}

impl FeedSource for MockFeedSource {
    fn fetch(&self, feed: FeedId) -> SyncResult<FeedContent> {
        self.fetched.borrow_mut().push(feed);
        match self.feeds.get(&feed) {
            Some(xml) => {
                if !self.lost_staging.contains(&feed) {
                    self.staged
                        .borrow_mut()
                        .insert(feed, xml.as_bytes().to_vec());
                }
                Ok(FeedContent::new(feed, xml.as_bytes().to_vec()))
            }
            None => Err(SyncError::Fetch {
                feed: feed.to_string(),
                details: "HTTP status 404 Not Found".to_string(),
            }),
        }
    }

    fn load_staged(&self, feed: FeedId) -> SyncResult<FeedContent> {
        self.loaded.borrow_mut().push(feed);
        match self.staged.borrow().get(&feed) {
            Some(bytes) => Ok(FeedContent::new(feed, bytes.clone())),
            None => Err(SyncError::Fetch {
                feed: feed.to_string(),
                details: format!("nvdcve-{}.xml is not staged", feed),
            }),
        }
    }
}

#[derive(Default)]
struct MockRepository {
    records: RefCell<BTreeMap<String, VulnerabilityRecord>>,
    affected: RefCell<Vec<AffectedProductVersion>>,
    fingerprints: RefCell<HashMap<FeedId, Fingerprint>>,
    fingerprint_writes: RefCell<Vec<FeedId>>,
    last_sync: Cell<Option<DateTime<Utc>>>,
    deletes: Cell<usize>,
    /// Cancels the token once this many fingerprints were written
    cancel_after: Option<(usize, CancellationToken)>,
    unavailable: bool,
    fail_delete: bool,
}

impl MockRepository {
    fn with_fingerprint(self, feed: FeedId, fingerprint: Fingerprint) -> Self {
        self.fingerprints.borrow_mut().insert(feed, fingerprint);
        self
    }

    fn with_record(self, id: &str) -> Self {
        self.records.borrow_mut().insert(
            id.to_string(),
            VulnerabilityRecord::new(id.to_string(), String::new(), BTreeMap::new()),
        );
        self
    }

    fn record_ids(&self) -> Vec<String> {
        self.records.borrow().keys().cloned().collect()
    }

    fn fingerprint_writes(&self) -> Vec<FeedId> {
        self.fingerprint_writes.borrow().clone()
    }

    fn check_available(&self) -> SyncResult<()> {
        if self.unavailable {
            return Err(SyncError::RepositoryUnavailable {
                details: "unable to open database file".to_string(),
            });
        }
        Ok(())
    }
}

impl RecordsRepository for MockRepository {
    fn delete_all(&self) -> SyncResult<()> {
        if self.fail_delete {
            return Err(SyncError::Repository {
                details: "database table is locked".to_string(),
            });
        }
        self.deletes.set(self.deletes.get() + 1);
        self.records.borrow_mut().clear();
        self.affected.borrow_mut().clear();
        Ok(())
    }

    fn upsert_vulnerabilities(&self, records: &[VulnerabilityRecord]) -> SyncResult<usize> {
        self.check_available()?;
        let mut stored = self.records.borrow_mut();
        for record in records {
            stored.insert(record.id().to_string(), record.clone());
        }
        Ok(records.len())
    }

    fn insert_affected(&self, tuples: &[AffectedProductVersion]) -> SyncResult<usize> {
        self.check_available()?;
        self.affected.borrow_mut().extend_from_slice(tuples);
        Ok(tuples.len())
    }

    fn get_fingerprint(&self, feed: FeedId) -> SyncResult<Option<Fingerprint>> {
        self.check_available()?;
        Ok(self.fingerprints.borrow().get(&feed).cloned())
    }

    fn set_fingerprint(&self, feed: FeedId, fingerprint: &Fingerprint) -> SyncResult<()> {
        self.check_available()?;
        self.fingerprints
            .borrow_mut()
            .insert(feed, fingerprint.clone());
        let mut writes = self.fingerprint_writes.borrow_mut();
        writes.push(feed);
        if let Some((limit, token)) = &self.cancel_after {
            if writes.len() >= *limit {
                token.cancel();
            }
        }
        Ok(())
    }

    fn set_last_sync(&self, timestamp: DateTime<Utc>) -> SyncResult<()> {
        self.check_available()?;
        self.last_sync.set(Some(timestamp));
        Ok(())
    }
}

struct MockProgressReporter;

impl ProgressReporter for MockProgressReporter {
    fn report(&self, _message: &str) {}
    fn report_progress(&self, _current: usize, _total: usize, _message: Option<&str>) {}
    fn report_error(&self, _message: &str) {}
    fn report_completion(&self, _message: &str) {}
}

/// Builds a feed document with one `windows` tuple per entry
fn feed_xml(ids: &[&str]) -> String {
    let entries: String = ids
        .iter()
        .map(|id| {
            let seq = id.trim_start_matches("CVE-");
            format!(
                r#"<entry type="CVE" name="{id}" seq="{seq}"><desc><descript>{id} description</descript></desc><vuln_soft><prod name="windows" vendor="microsoft"><vers num="10"/></prod></vuln_soft></entry>"#
            )
        })
        .collect();
    format!(r#"<nvd xmlns="http://nvd.nist.gov/feeds/cve/1.2">{entries}</nvd>"#)
}

fn use_case(
    source: MockFeedSource,
    repository: MockRepository,
) -> SyncFeedsUseCase<MockFeedSource, MockRepository, MockProgressReporter> {
    SyncFeedsUseCase::new(source, repository, MockProgressReporter)
}

#[test]
fn test_execute_imports_changed_feeds() {
    let source = MockFeedSource::default()
        .with_feed(FeedId::Year(2015), feed_xml(&["CVE-2015-0001", "CVE-2015-0002"]))
        .with_feed(FeedId::Year(2016), feed_xml(&["CVE-2016-0001"]));
    let use_case = use_case(source, MockRepository::default());
    let request = SyncRequest::new(vec![FeedId::Year(2015), FeedId::Year(2016)], false);

    let report = use_case
        .execute(&request, &CancellationToken::new())
        .unwrap();

    assert!(report.is_clean());
    assert_eq!(report.imported, vec!["2015", "2016"]);
    assert_eq!(report.records_written, 3);
    assert_eq!(report.affected_written, 3);

    let repository = use_case.repository();
    assert_eq!(
        repository.record_ids(),
        vec!["CVE-2015-0001", "CVE-2015-0002", "CVE-2016-0001"]
    );
    assert_eq!(
        repository.fingerprint_writes(),
        vec![FeedId::Year(2015), FeedId::Year(2016)]
    );
    assert!(repository.last_sync.get().is_some());
}

#[test]
fn test_unchanged_feed_is_not_transformed_or_written() {
    let xml = feed_xml(&["CVE-2015-0001"]);
    let stored = Fingerprint::of(xml.as_bytes());
    let source = MockFeedSource::default().with_feed(FeedId::Year(2015), xml);
    let repository = MockRepository::default().with_fingerprint(FeedId::Year(2015), stored);
    let use_case = use_case(source, repository);

    let report = use_case
        .execute(
            &SyncRequest::new(vec![FeedId::Year(2015)], false),
            &CancellationToken::new(),
        )
        .unwrap();

    assert_eq!(report.unchanged, vec!["2015"]);
    assert!(report.imported.is_empty());
    assert!(use_case.repository().record_ids().is_empty());
    assert!(use_case.repository().affected.borrow().is_empty());
    assert!(use_case.repository().fingerprint_writes().is_empty());
}

#[test]
fn test_duplicate_requested_feeds_fetched_once() {
    let source = MockFeedSource::default()
        .with_feed(FeedId::Year(2015), feed_xml(&["CVE-2015-0001"]));
    let use_case = use_case(source, MockRepository::default());
    let request = SyncRequest::new(
        vec![FeedId::Year(2015), FeedId::Year(2015)],
        false,
    );

    use_case
        .execute(&request, &CancellationToken::new())
        .unwrap();

    assert_eq!(use_case.feed_source.fetched(), vec![FeedId::Year(2015)]);
}

#[test]
fn test_changed_feeds_imported_in_ascending_order() {
    let source = MockFeedSource::default()
        .with_feed(FeedId::Year(2015), feed_xml(&["CVE-2015-0001"]))
        .with_feed(FeedId::Year(2016), feed_xml(&["CVE-2016-0001"]));
    let use_case = use_case(source, MockRepository::default());
    let request = SyncRequest::new(vec![FeedId::Year(2016), FeedId::Year(2015)], false);

    use_case
        .execute(&request, &CancellationToken::new())
        .unwrap();

    assert_eq!(
        use_case.feed_source.fetched(),
        vec![FeedId::Year(2016), FeedId::Year(2015)]
    );
    assert_eq!(
        use_case.repository().fingerprint_writes(),
        vec![FeedId::Year(2015), FeedId::Year(2016)]
    );
}

#[test]
fn test_clear_then_only_changed_feed_written() {
    let xml_2015 = feed_xml(&["CVE-2015-0001"]);
    let repository = MockRepository::default()
        .with_record("CVE-2010-0001")
        .with_fingerprint(FeedId::Year(2015), Fingerprint::of(xml_2015.as_bytes()))
        .with_fingerprint(FeedId::Year(2016), Fingerprint::of(b"previous content"));
    let source = MockFeedSource::default()
        .with_feed(FeedId::Year(2015), xml_2015)
        .with_feed(FeedId::Year(2016), feed_xml(&["CVE-2016-0001"]));
    let use_case = use_case(source, repository);

    let report = use_case
        .execute(
            &SyncRequest::new(vec![FeedId::Year(2015), FeedId::Year(2016)], true),
            &CancellationToken::new(),
        )
        .unwrap();

    assert!(report.cleared);
    assert_eq!(use_case.repository().deletes.get(), 1);
    assert_eq!(
        use_case.feed_source.fetched(),
        vec![FeedId::Year(2015), FeedId::Year(2016)]
    );
    assert_eq!(report.unchanged, vec!["2015"]);
    assert_eq!(report.imported, vec!["2016"]);
    assert_eq!(use_case.repository().record_ids(), vec!["CVE-2016-0001"]);
    assert_eq!(
        use_case.repository().fingerprint_writes(),
        vec![FeedId::Year(2016)]
    );
}

#[test]
fn test_aggregate_feed_triggers_implied_years() {
    let source = MockFeedSource::default()
        .with_feed(
            FeedId::Modified,
            feed_xml(&["CVE-2020-1000", "CVE-2021-2000", "CVE-2021-2001"]),
        )
        .with_feed(FeedId::Year(2020), feed_xml(&["CVE-2020-1000"]))
        .with_feed(FeedId::Year(2021), feed_xml(&["CVE-2021-2000", "CVE-2021-2001"]));
    let use_case = use_case(source, MockRepository::default());

    let report = use_case
        .execute(
            &SyncRequest::new(vec![FeedId::Modified], false),
            &CancellationToken::new(),
        )
        .unwrap();

    assert_eq!(report.implied_years.iter().copied().collect::<Vec<_>>(), vec![2020, 2021]);
    assert_eq!(
        use_case.feed_source.fetched(),
        vec![FeedId::Modified, FeedId::Year(2020), FeedId::Year(2021)]
    );
    assert_eq!(report.imported, vec!["Modified", "2020", "2021"]);

    let fingerprints = use_case.repository().fingerprints.borrow().clone();
    assert_eq!(fingerprints.get(&FeedId::Modified), Some(&Fingerprint::empty()));
    assert!(fingerprints.contains_key(&FeedId::Year(2020)));
    assert!(fingerprints.contains_key(&FeedId::Year(2021)));
}

#[test]
fn test_implied_year_already_processed_is_skipped_by_change_detection() {
    let source = MockFeedSource::default()
        .with_feed(FeedId::Year(2020), feed_xml(&["CVE-2020-1000"]))
        .with_feed(FeedId::Modified, feed_xml(&["CVE-2020-1000"]));
    let use_case = use_case(source, MockRepository::default());

    let report = use_case
        .execute(
            &SyncRequest::new(vec![FeedId::Year(2020), FeedId::Modified], false),
            &CancellationToken::new(),
        )
        .unwrap();

    assert_eq!(
        use_case.feed_source.fetched(),
        vec![FeedId::Year(2020), FeedId::Modified, FeedId::Year(2020)]
    );
    assert_eq!(report.imported, vec!["2020", "Modified"]);
    assert_eq!(report.unchanged, vec!["2020"]);
}

#[test]
fn test_fetch_failure_excludes_only_that_feed() {
    let source = MockFeedSource::default()
        .with_feed(FeedId::Year(2016), feed_xml(&["CVE-2016-0001"]));
    let use_case = use_case(source, MockRepository::default());

    let report = use_case
        .execute(
            &SyncRequest::new(vec![FeedId::Year(2015), FeedId::Year(2016)], false),
            &CancellationToken::new(),
        )
        .unwrap();

    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].feed, "2015");
    assert_eq!(report.imported, vec!["2016"]);
    assert_eq!(
        use_case.repository().fingerprint_writes(),
        vec![FeedId::Year(2016)]
    );
    assert!(use_case.repository().last_sync.get().is_some());
}

#[test]
fn test_parse_failure_keeps_old_fingerprint() {
    let old = Fingerprint::of(b"old");
    let source = MockFeedSource::default()
        .with_feed(FeedId::Year(2015), "<nvd><entry type=\"CVE\"".to_string());
    let repository = MockRepository::default().with_fingerprint(FeedId::Year(2015), old.clone());
    let use_case = use_case(source, repository);

    let report = use_case
        .execute(
            &SyncRequest::new(vec![FeedId::Year(2015)], false),
            &CancellationToken::new(),
        )
        .unwrap();

    assert!(report.has_failures());
    assert!(report.failed[0].reason.contains("Failed to parse feed 2015"));
    assert_eq!(
        use_case.repository().fingerprints.borrow().get(&FeedId::Year(2015)),
        Some(&old)
    );
}

#[test]
fn test_cancel_after_k_of_n_changed_feeds() {
    let cancel = CancellationToken::new();
    let repository = MockRepository {
        cancel_after: Some((2, cancel.clone())),
        ..Default::default()
    };
    let source = MockFeedSource::default()
        .with_feed(FeedId::Year(2014), feed_xml(&["CVE-2014-0001"]))
        .with_feed(FeedId::Year(2015), feed_xml(&["CVE-2015-0001"]))
        .with_feed(FeedId::Year(2016), feed_xml(&["CVE-2016-0001"]))
        .with_feed(FeedId::Year(2017), feed_xml(&["CVE-2017-0001"]));
    let use_case = use_case(source, repository);
    let feeds = vec![
        FeedId::Year(2014),
        FeedId::Year(2015),
        FeedId::Year(2016),
        FeedId::Year(2017),
    ];

    let report = use_case
        .execute(&SyncRequest::new(feeds, false), &cancel)
        .unwrap();

    assert!(report.cancelled);
    assert_eq!(
        use_case.repository().fingerprint_writes(),
        vec![FeedId::Year(2014), FeedId::Year(2015)]
    );
    assert_eq!(
        use_case.repository().record_ids(),
        vec!["CVE-2014-0001", "CVE-2015-0001"]
    );
    assert!(use_case.repository().last_sync.get().is_none());
}

#[test]
fn test_cancelled_before_start_fetches_nothing() {
    let source = MockFeedSource::default()
        .with_feed(FeedId::Year(2015), feed_xml(&["CVE-2015-0001"]));
    let use_case = use_case(source, MockRepository::default());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = use_case
        .execute(&SyncRequest::new(vec![FeedId::Year(2015)], false), &cancel)
        .unwrap();

    assert!(report.cancelled);
    assert!(use_case.feed_source.fetched().is_empty());
    assert!(use_case.repository().last_sync.get().is_none());
}

#[test]
fn test_unavailable_repository_aborts_job() {
    let source = MockFeedSource::default()
        .with_feed(FeedId::Year(2015), feed_xml(&["CVE-2015-0001"]))
        .with_feed(FeedId::Year(2016), feed_xml(&["CVE-2016-0001"]));
    let repository = MockRepository {
        unavailable: true,
        ..Default::default()
    };
    let use_case = use_case(source, repository);

    let err = use_case
        .execute(
            &SyncRequest::new(vec![FeedId::Year(2015), FeedId::Year(2016)], false),
            &CancellationToken::new(),
        )
        .unwrap_err();

    assert!(err.to_string().contains("Repository is unavailable"));
    assert_eq!(use_case.feed_source.fetched(), vec![FeedId::Year(2015)]);
}

#[test]
fn test_failed_clear_aborts_job() {
    let source = MockFeedSource::default()
        .with_feed(FeedId::Year(2015), feed_xml(&["CVE-2015-0001"]));
    let repository = MockRepository {
        fail_delete: true,
        ..Default::default()
    };
    let use_case = use_case(source, repository);

    let result = use_case.execute(
        &SyncRequest::new(vec![FeedId::Year(2015)], true),
        &CancellationToken::new(),
    );

    assert!(result.is_err());
    assert!(use_case.feed_source.fetched().is_empty());
}

#[test]
fn test_aggregate_reimport_appends_duplicate_tuples() {
    let source = MockFeedSource::default()
        .with_feed(FeedId::Modified, feed_xml(&["CVE-2019-0001"]))
        .with_feed(FeedId::Year(2019), feed_xml(&["CVE-2019-0001"]));
    let use_case = use_case(source, MockRepository::default());
    let request = SyncRequest::new(vec![FeedId::Modified], false);

    use_case.execute(&request, &CancellationToken::new()).unwrap();
    use_case.execute(&request, &CancellationToken::new()).unwrap();

    // The aggregate feed is imported on every run and tuples are not deduplicated
    assert_eq!(use_case.repository().record_ids(), vec!["CVE-2019-0001"]);
    assert_eq!(use_case.repository().affected.borrow().len(), 3);
}

#[test]
fn test_detection_keeps_only_fingerprints_until_import() {
    let unchanged = feed_xml(&["CVE-2017-0001"]);
    let source = MockFeedSource::default()
        .with_feed(FeedId::Year(2016), feed_xml(&["CVE-2016-0001"]))
        .with_feed(FeedId::Year(2015), feed_xml(&["CVE-2015-0001"]))
        .with_feed(FeedId::Year(2017), unchanged.clone());
    let repository = MockRepository::default()
        .with_fingerprint(FeedId::Year(2017), Fingerprint::of(unchanged.as_bytes()));
    let use_case = use_case(source, repository);
    let feeds = vec![FeedId::Year(2016), FeedId::Year(2015), FeedId::Year(2017)];

    let mut report = SyncReport::new();
    let pending = use_case
        .fetch_changed(&feeds, &CancellationToken::new(), &mut report)
        .unwrap();

    assert_eq!(
        pending.keys().copied().collect::<Vec<_>>(),
        vec![FeedId::Year(2015), FeedId::Year(2016)]
    );
    assert_eq!(
        pending[&FeedId::Year(2015)],
        Fingerprint::of(feed_xml(&["CVE-2015-0001"]).as_bytes())
    );
    assert!(use_case.feed_source.loaded().is_empty());

    use_case
        .execute(&SyncRequest::new(feeds, false), &CancellationToken::new())
        .unwrap();

    // Unchanged feeds are never reloaded
    assert_eq!(
        use_case.feed_source.loaded(),
        vec![FeedId::Year(2015), FeedId::Year(2016)]
    );
}

#[test]
fn test_missing_staged_copy_excludes_feed() {
    let source = MockFeedSource {
        lost_staging: vec![FeedId::Year(2015)],
        ..Default::default()
    }
    .with_feed(FeedId::Year(2015), feed_xml(&["CVE-2015-0001"]))
    .with_feed(FeedId::Year(2016), feed_xml(&["CVE-2016-0001"]));
    let use_case = use_case(source, MockRepository::default());

    let report = use_case
        .execute(
            &SyncRequest::new(vec![FeedId::Year(2015), FeedId::Year(2016)], false),
            &CancellationToken::new(),
        )
        .unwrap();

    assert_eq!(report.imported, vec!["2016"]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].feed, "2015");
    assert_eq!(
        use_case.repository().fingerprint_writes(),
        vec![FeedId::Year(2016)]
    );
    assert_eq!(use_case.repository().record_ids(), vec!["CVE-2016-0001"]);
}
