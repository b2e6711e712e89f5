use crate::adapters::outbound::filesystem::StagingArea;
use crate::feed_sync::domain::{FeedContent, FeedId};
use crate::ports::outbound::FeedSource;
use crate::shared::error::SyncError;
use crate::shared::{Result, SyncResult};
use reqwest::blocking::Client;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

/// Default location of the NVD 1.2 XML feeds
pub const DEFAULT_FEED_BASE_URL: &str = "https://nvd.nist.gov/download";

/// NVD feed client downloading gzip-compressed XML feeds
///
/// Requests go to `{base_url}/nvdcve-{id}.xml.gz`.
///
/// # Behavior
/// - No request timeout: yearly feeds are large and slow links must finish
/// - No retries: a failed feed is skipped until the next run
/// - Downloads are unpacked through the [`StagingArea`]
pub struct HttpFeedSource {
    client: Client,
    base_url: String,
    staging: StagingArea,
}

impl HttpFeedSource {
    /// Creates a client for the given endpoint and working directory
    pub fn new(base_url: impl Into<String>, work_dir: impl Into<PathBuf>) -> Result<Self> {
        let version = env!("CARGO_PKG_VERSION");
        let user_agent = format!("nvd-feed-sync/{}", version);
        let client = Client::builder()
            .timeout(None::<Duration>)
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            staging: StagingArea::new(work_dir),
        })
    }

    pub fn feed_url(&self, feed: FeedId) -> String {
        format!("{}/nvdcve-{}.xml.gz", self.base_url, feed)
    }

    fn download(&self, feed: FeedId) -> SyncResult<Vec<u8>> {
        let url = self.feed_url(feed);
        let fetch_error = |details: String| SyncError::Fetch {
            feed: feed.to_string(),
            details,
        };

        debug!(feed = %feed, url = %url, "Requesting feed");
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| fetch_error(format!("Request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_error(format!(
                "{} returned status code {}",
                url, status
            )));
        }

        let body = response
            .bytes()
            .map_err(|e| fetch_error(format!("Failed to read body from {}: {}", url, e)))?;
        Ok(body.to_vec())
    }
}

impl FeedSource for HttpFeedSource {
    fn fetch(&self, feed: FeedId) -> SyncResult<FeedContent> {
        let compressed = self.download(feed)?;
        let bytes = self.staging.unpack(feed, &compressed)?;
        info!(
            feed = %feed,
            compressed = compressed.len(),
            bytes = bytes.len(),
            "Fetched feed"
        );
        Ok(FeedContent::new(feed, bytes))
    }

    fn load_staged(&self, feed: FeedId) -> SyncResult<FeedContent> {
        let bytes = self.staging.load(feed)?;
        debug!(feed = %feed, bytes = bytes.len(), "Loaded staged feed");
        Ok(FeedContent::new(feed, bytes))
    }
}
