/// Network adapters for the remote feed endpoint
mod nvd_feed_client;

pub use nvd_feed_client::{HttpFeedSource, DEFAULT_FEED_BASE_URL};
