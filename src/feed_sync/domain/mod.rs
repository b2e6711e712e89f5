pub mod feed_content;
pub mod feed_id;
pub mod fingerprint;
pub mod vulnerability;

pub use feed_content::FeedContent;
pub use feed_id::{FeedId, MODIFIED_FEED};
pub use fingerprint::Fingerprint;
pub use vulnerability::{AffectedProductVersion, VulnerabilityRecord, VERSION_PREV_UNSET};
