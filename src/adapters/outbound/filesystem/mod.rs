/// Filesystem adapters for the feed working directory
mod staging_area;

pub use staging_area::StagingArea;
