/// Use cases module containing application business logic orchestration
mod sync_feeds;

pub use sync_feeds::SyncFeedsUseCase;
