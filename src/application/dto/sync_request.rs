use super::job_parameters::{
    JobParameters, PARAM_BACKGROUND, PARAM_CLEAR, PARAM_SILENT, PARAM_YEARS,
};
use crate::feed_sync::domain::FeedId;
use crate::feed_sync::policies::FeedSelection;
use crate::shared::SyncResult;

/// Where the synchronization runs relative to its caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Caller blocks until the job completes
    Foreground,
    /// Caller receives a handle and continues
    Background,
}

/// SyncRequest - Validated request for the feed synchronization use case
///
/// Built once from [`JobParameters`]; everything downstream works with
/// typed values only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRequest {
    /// Feeds to fetch, in request order, without duplicates
    pub feeds: Vec<FeedId>,
    /// Whether all records are deleted before the run
    pub clear_existing: bool,
    pub mode: ExecutionMode,
    /// Suppress progress output
    pub silent: bool,
}

impl SyncRequest {
    pub fn new(feeds: Vec<FeedId>, clear_existing: bool) -> Self {
        Self {
            feeds,
            clear_existing,
            mode: ExecutionMode::Foreground,
            silent: false,
        }
    }

    /// Validates job parameters into a request
    ///
    /// # Arguments
    /// * `params` - Raw job parameters
    /// * `current_year` - Last year of the default feed range
    ///
    /// # Errors
    /// Returns `SyncError::InvalidParameter` naming the first bad parameter
    pub fn from_parameters(params: &JobParameters, current_year: u16) -> SyncResult<Self> {
        let feeds = FeedSelection::parse_years(params.get(PARAM_YEARS).unwrap_or_default())?
            .unwrap_or_else(|| FeedSelection::default_feeds(current_year));

        let mode = if params.flag(PARAM_BACKGROUND)? {
            ExecutionMode::Background
        } else {
            ExecutionMode::Foreground
        };

        Ok(Self {
            feeds,
            clear_existing: params.flag(PARAM_CLEAR)?,
            mode,
            silent: params.flag(PARAM_SILENT)?,
        })
    }

    pub fn is_background(&self) -> bool {
        self.mode == ExecutionMode::Background
    }
}
