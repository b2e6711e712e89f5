/// Feed synchronization core: domain values, selection policies and the
/// pure services that decide what to reimport and how.
pub mod domain;
pub mod policies;
pub mod services;
