/// Persistence adapters for vulnerability records and feed fingerprints
mod sqlite_repository;

pub use sqlite_repository::{SqliteRecordsRepository, LAST_UPDATE_KEY};
