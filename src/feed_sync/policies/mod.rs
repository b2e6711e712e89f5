mod feed_selection;

pub use feed_selection::{FeedSelection, FIRST_FEED_YEAR};
