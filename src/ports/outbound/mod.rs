/// Outbound ports (Driven ports) - Infrastructure interfaces
///
/// These ports define the interfaces that the application core uses
/// to interact with external systems (feed endpoint, database, console).
pub mod feed_source;
pub mod progress_reporter;
pub mod records_repository;

pub use feed_source::FeedSource;
pub use progress_reporter::ProgressReporter;
pub use records_repository::RecordsRepository;
