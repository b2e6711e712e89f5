use crate::shared::error::SyncError;
use std::fmt;
use std::str::FromStr;

/// Textual form of the aggregate "recently modified" feed
pub const MODIFIED_FEED: &str = "Modified";

/// Identifier of one remote feed: a yearly feed or the aggregate feed
/// listing entries changed recently across all years.
///
/// Ordering matches the textual keys: years ascend numerically and the
/// aggregate feed sorts after every year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FeedId {
    Year(u16),
    Modified,
}

impl FeedId {
    pub fn is_aggregate(&self) -> bool {
        matches!(self, FeedId::Modified)
    }

    /// Returns the year for a concrete feed
    pub fn year(&self) -> Option<u16> {
        match self {
            FeedId::Year(year) => Some(*year),
            FeedId::Modified => None,
        }
    }
}

impl fmt::Display for FeedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedId::Year(year) => write!(f, "{:04}", year),
            FeedId::Modified => write!(f, "{}", MODIFIED_FEED),
        }
    }
}

impl FromStr for FeedId {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == MODIFIED_FEED {
            return Ok(FeedId::Modified);
        }

        if s.len() != 4 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(SyncError::InvalidParameter {
                name: "YEARS".to_string(),
                value: s.to_string(),
                reason: format!("expected a four-digit year or '{}'", MODIFIED_FEED),
            });
        }

        // Four ASCII digits always fit into u16
        let year = s.parse::<u16>().map_err(|e| SyncError::InvalidParameter {
            name: "YEARS".to_string(),
            value: s.to_string(),
            reason: e.to_string(),
        })?;
        Ok(FeedId::Year(year))
    }
}
