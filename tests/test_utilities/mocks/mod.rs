/// Mock implementations for testing
mod mock_feed_source;
mod mock_progress_reporter;

pub use mock_feed_source::MockFeedSource;
pub use mock_progress_reporter::MockProgressReporter;
