/// Job registry and runner
mod registry;
mod runner;

pub use registry::{
    BoxedJob, JobBuilder, JobDescriptor, JobRegistry, RuntimeSettings, UPDATE_CVE_JOB,
};
pub use runner::{JobRunner, JobTask, LaunchOutcome};
