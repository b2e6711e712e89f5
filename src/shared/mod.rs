/// Shared utilities used across all layers
pub mod error;
pub mod interrupt;
pub mod logging;
pub mod result;

pub use result::{Result, SyncResult};
