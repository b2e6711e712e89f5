use crate::shared::error::SyncError;

/// Type alias for Result with anyhow::Error as the error type.
/// This provides a consistent error handling pattern across the codebase.
pub type Result<T> = std::result::Result<T, anyhow::Error>;

/// Result type used by the ports, where callers need to tell feed-scoped
/// failures apart from fatal ones.
pub type SyncResult<T> = std::result::Result<T, SyncError>;
