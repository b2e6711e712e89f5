use nvd_feed_sync::prelude::*;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Mock FeedSource serving in-memory documents
///
/// Clones share state, so a test can change "upstream" content between
/// runs and inspect the fetch log after the use case took ownership.
#[derive(Default, Clone)]
pub struct MockFeedSource {
    feeds: Arc<Mutex<HashMap<FeedId, String>>>,
    fetched: Arc<Mutex<Vec<FeedId>>>,
    staged: Arc<Mutex<HashMap<FeedId, String>>>,
}

impl MockFeedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_feed(self, feed: FeedId, xml: impl Into<String>) -> Self {
        self.set_feed(feed, xml);
        self
    }

    /// Replaces the document served for a feed
    pub fn set_feed(&self, feed: FeedId, xml: impl Into<String>) {
        self.feeds.lock().unwrap().insert(feed, xml.into());
    }

    pub fn remove_feed(&self, feed: FeedId) {
        self.feeds.lock().unwrap().remove(&feed);
    }

    pub fn fetched(&self) -> Vec<FeedId> {
        self.fetched.lock().unwrap().clone()
    }

    pub fn clear_log(&self) {
        self.fetched.lock().unwrap().clear();
    }
}

impl FeedSource for MockFeedSource {
    fn fetch(&self, feed: FeedId) -> SyncResult<FeedContent> {
        self.fetched.lock().unwrap().push(feed);
        match self.feeds.lock().unwrap().get(&feed) {
            Some(xml) => {
                self.staged.lock().unwrap().insert(feed, xml.clone());
                Ok(FeedContent::new(feed, xml.as_bytes().to_vec()))
            }
            None => Err(SyncError::Fetch {
                feed: feed.to_string(),
                details: format!("nvdcve-{}.xml.gz returned status code 404 Not Found", feed),
            }),
        }
    }

    fn load_staged(&self, feed: FeedId) -> SyncResult<FeedContent> {
        match self.staged.lock().unwrap().get(&feed) {
            Some(xml) => Ok(FeedContent::new(feed, xml.as_bytes().to_vec())),
            None => Err(SyncError::Fetch {
                feed: feed.to_string(),
                details: format!("nvdcve-{}.xml is not staged", feed),
            }),
        }
    }
}
