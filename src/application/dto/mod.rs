/// Data Transfer Objects for application layer
///
/// DTOs are used to transfer data between the application layer
/// and adapters, keeping the domain layer isolated.
mod job_parameters;
mod sync_report;
mod sync_request;

pub use job_parameters::{
    JobParameters, PARAM_BACKGROUND, PARAM_CLEAR, PARAM_SILENT, PARAM_YEARS,
};
pub use sync_report::{FailedFeed, SyncReport};
pub use sync_request::{ExecutionMode, SyncRequest};
