use clap::Parser;
use std::path::PathBuf;

use crate::application::dto::{
    JobParameters, PARAM_BACKGROUND, PARAM_CLEAR, PARAM_SILENT, PARAM_YEARS,
};
use crate::application::jobs::UPDATE_CVE_JOB;
use crate::shared::logging::LogFormat;
use crate::shared::SyncResult;

/// Keep a local vulnerability database in sync with the NVD CVE feeds
#[derive(Parser, Debug)]
#[command(name = "nvd-feed-sync")]
#[command(version)]
#[command(
    about = "Keep a local vulnerability database in sync with the NVD CVE feeds",
    long_about = None
)]
pub struct Args {
    /// Job to run
    #[arg(default_value = UPDATE_CVE_JOB)]
    pub job: String,

    /// Feeds to synchronize: whitespace separated years and/or "Modified"
    /// (defaults to every year since 2002 plus Modified)
    #[arg(short, long, value_name = "YEARS")]
    pub years: Option<String>,

    /// Delete all stored vulnerability records before synchronizing
    #[arg(long)]
    pub clear: bool,

    /// Run the job on a worker thread and wait with a spinner
    #[arg(long, conflicts_with = "foreground")]
    pub background: bool,

    /// Run the job on a worker thread and block until it finishes
    #[arg(long)]
    pub foreground: bool,

    /// Suppress progress output
    #[arg(short, long)]
    pub silent: bool,

    /// Set a job parameter; can be specified multiple times: --set CLEAR=yes
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,

    /// Path to config file (default: auto-discover nvd-feed-sync.config.yml)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// SQLite database holding records and fingerprints
    #[arg(long, value_name = "FILE")]
    pub database: Option<PathBuf>,

    /// Directory for downloaded feed files
    #[arg(long, value_name = "DIR")]
    pub work_dir: Option<PathBuf>,

    /// Base URL of the feed endpoint
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Log level or filter directive (RUST_LOG takes precedence)
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Log format: pretty, compact or json
    #[arg(long, value_name = "FORMAT")]
    pub log_format: Option<LogFormat>,

    /// Print the job summary as JSON on stdout (printed even with --silent)
    #[arg(long)]
    pub json: bool,

    /// List the available jobs and exit
    #[arg(long)]
    pub list_jobs: bool,
}

impl Args {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Merges job parameters with the precedence flags > `--set` > config file
    ///
    /// # Errors
    /// Returns `SyncError::InvalidParameter` for a malformed `--set` value
    pub fn job_parameters(&self, config_values: &[(String, String)]) -> SyncResult<JobParameters> {
        let mut params = JobParameters::new();
        for (key, value) in config_values {
            params.set(key, value.as_str());
        }
        for assignment in &self.set {
            params.set_assignment(assignment)?;
        }

        if let Some(years) = &self.years {
            params.set(PARAM_YEARS, years.as_str());
        }
        if self.clear {
            params.set(PARAM_CLEAR, "yes");
        }
        if self.background {
            params.set(PARAM_BACKGROUND, "yes");
        }
        if self.foreground {
            params.set(PARAM_BACKGROUND, "no");
        }
        if self.silent {
            params.set(PARAM_SILENT, "yes");
        }
        Ok(params)
    }
}
