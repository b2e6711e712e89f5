use crate::feed_sync::domain::FeedId;
use crate::shared::SyncResult;

/// First year published as a separate yearly feed.
///
/// Entries with older identifiers live in this year's feed.
pub const FIRST_FEED_YEAR: u16 = 2002;

/// FeedSelection policy for deciding which feeds a job touches
///
/// Business rules:
/// 1. Without explicit years, every yearly feed from `FIRST_FEED_YEAR` to the
///    current year is requested, followed by the aggregate feed
/// 2. Explicit years are whitespace separated, duplicates are dropped and the
///    first occurrence keeps its position
/// 3. Years derived from aggregate entries are clamped to `FIRST_FEED_YEAR`
pub struct FeedSelection;

impl FeedSelection {
    /// Returns the full default feed list for the given current year
    pub fn default_feeds(current_year: u16) -> Vec<FeedId> {
        let mut feeds: Vec<FeedId> = (FIRST_FEED_YEAR..=current_year.max(FIRST_FEED_YEAR))
            .map(FeedId::Year)
            .collect();
        feeds.push(FeedId::Modified);
        feeds
    }

    /// Parses an explicit years parameter
    ///
    /// # Returns
    /// `None` when the parameter is blank (use the default range)
    ///
    /// # Errors
    /// Returns `SyncError::InvalidParameter` for any malformed token
    pub fn parse_years(years: &str) -> SyncResult<Option<Vec<FeedId>>> {
        if years.trim().is_empty() {
            return Ok(None);
        }

        let mut feeds = Vec::new();
        for token in years.split_whitespace() {
            let feed: FeedId = token.parse()?;
            if !feeds.contains(&feed) {
                feeds.push(feed);
            }
        }
        Ok(Some(feeds))
    }

    /// Maps a year found in an aggregate entry to the yearly feed holding it
    pub fn clamp_to_feed_year(year: u16) -> u16 {
        year.max(FIRST_FEED_YEAR)
    }
}
