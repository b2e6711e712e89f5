use std::fmt;
use thiserror::Error;

/// Exit codes for the CLI application.
///
/// These codes allow schedulers and CI systems to distinguish a clean
/// synchronization from one that left feeds behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success - every requested feed was synchronized or unchanged
    Success = 0,
    /// The job finished, but some feeds failed or the job was cancelled
    Incomplete = 1,
    /// Invalid command-line arguments (clap parsing errors)
    InvalidArguments = 2,
    /// Application error (invalid job parameters, unknown job, unreachable database, etc.)
    ApplicationError = 3,
}

impl ExitCode {
    /// Convert to i32 for use with std::process::exit
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitCode::Success => write!(f, "Success (0)"),
            ExitCode::Incomplete => write!(f, "Incomplete (1)"),
            ExitCode::InvalidArguments => write!(f, "Invalid Arguments (2)"),
            ExitCode::ApplicationError => write!(f, "Application Error (3)"),
        }
    }
}

/// Errors raised while synchronizing vulnerability feeds.
///
/// Feed-scoped variants (`Fetch`, `Decompress`, `Parse`, `Repository`) are
/// caught by the reconciliation driver and only exclude the affected feed from
/// the current run. `RepositoryUnavailable` aborts the whole job.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Failed to fetch feed {feed}\nDetails: {details}\n\n💡 Hint: Check your network connection and the feed base URL")]
    Fetch { feed: String, details: String },

    #[error("Failed to decompress feed {feed}\nDetails: {details}")]
    Decompress { feed: String, details: String },

    #[error("Failed to parse feed {feed}\nDetails: {details}")]
    Parse { feed: String, details: String },

    #[error("Repository operation failed: {details}")]
    Repository { details: String },

    #[error("Repository is unavailable: {details}\n\n💡 Hint: Verify the database path and that the file is a valid SQLite database")]
    RepositoryUnavailable { details: String },

    #[error("Invalid value for parameter {name}: '{value}'\nReason: {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Unknown job: {name}\n\n💡 Hint: Available jobs: {known}")]
    UnknownJob { name: String, known: String },

    #[error("Task has already been started")]
    TaskAlreadyStarted,

    #[error("Failed to spawn worker thread: {details}")]
    TaskSpawn { details: String },
}

impl SyncError {
    /// Returns true when the error must abort the whole job rather than a single feed
    pub fn is_fatal(&self) -> bool {
        matches!(self, SyncError::RepositoryUnavailable { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_values() {
        assert_eq!(ExitCode::Success.as_i32(), 0);
        assert_eq!(ExitCode::Incomplete.as_i32(), 1);
        assert_eq!(ExitCode::InvalidArguments.as_i32(), 2);
        assert_eq!(ExitCode::ApplicationError.as_i32(), 3);
    }

    #[test]
    fn test_exit_code_display() {
        assert_eq!(format!("{}", ExitCode::Success), "Success (0)");
        assert_eq!(format!("{}", ExitCode::Incomplete), "Incomplete (1)");
        assert_eq!(
            format!("{}", ExitCode::InvalidArguments),
            "Invalid Arguments (2)"
        );
        assert_eq!(
            format!("{}", ExitCode::ApplicationError),
            "Application Error (3)"
        );
    }

    #[test]
    fn test_fetch_error_display() {
        let error = SyncError::Fetch {
            feed: "2015".to_string(),
            details: "HTTP status 404 Not Found".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("Failed to fetch feed 2015"));
        assert!(display.contains("404"));
        assert!(display.contains("💡 Hint:"));
    }

    #[test]
    fn test_parse_error_display() {
        let error = SyncError::Parse {
            feed: "Modified".to_string(),
            details: "unexpected end of document".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("Failed to parse feed Modified"));
        assert!(display.contains("unexpected end of document"));
    }

    #[test]
    fn test_invalid_parameter_display() {
        let error = SyncError::InvalidParameter {
            name: "BACKGROUND".to_string(),
            value: "maybe".to_string(),
            reason: "expected yes or no".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("BACKGROUND"));
        assert!(display.contains("'maybe'"));
        assert!(display.contains("expected yes or no"));
    }

    #[test]
    fn test_unknown_job_lists_known_jobs() {
        let error = SyncError::UnknownJob {
            name: "update-cpe".to_string(),
            known: "update-cve".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("update-cpe"));
        assert!(display.contains("Available jobs: update-cve"));
    }

    #[test]
    fn test_only_unavailable_repository_is_fatal() {
        assert!(SyncError::RepositoryUnavailable {
            details: "disk I/O error".to_string()
        }
        .is_fatal());
        assert!(!SyncError::Repository {
            details: "constraint failed".to_string()
        }
        .is_fatal());
        assert!(!SyncError::Fetch {
            feed: "2002".to_string(),
            details: "connection refused".to_string()
        }
        .is_fatal());
    }
}
