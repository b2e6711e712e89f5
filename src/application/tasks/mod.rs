/// Background execution of synchronization jobs
mod background_task;

pub use background_task::{BackgroundTask, JoinOutcome, TaskState};
