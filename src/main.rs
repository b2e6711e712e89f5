mod adapters;
mod application;
mod cli;
mod config;
mod feed_sync;
mod ports;
mod shared;

use application::dto::{JobParameters, PARAM_SILENT};
use application::jobs::{JobRegistry, JobRunner, JobTask, LaunchOutcome, RuntimeSettings};
use application::tasks::{JoinOutcome, TaskState};
use cli::Args;
use config::ConfigFile;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use shared::error::ExitCode;
use shared::interrupt::cancel_on_interrupt;
use shared::logging::{init_logging_with_config, LogConfig};
use shared::Result;
use std::path::{Path, PathBuf};
use std::process;
use std::thread;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const SPINNER_INTERVAL: Duration = Duration::from_millis(100);

fn main() {
    let args = Args::parse_args();

    match run(args) {
        Ok(exit_code) => process::exit(exit_code.as_i32()),
        Err(e) => {
            eprintln!("\n❌ An error occurred:\n");
            eprintln!("{}", e);

            // Display error chain
            let mut source = e.source();
            while let Some(err) = source {
                eprintln!("\nCaused by: {}", err);
                source = err.source();
            }

            eprintln!();
            process::exit(ExitCode::ApplicationError.as_i32());
        }
    }
}

fn run(args: Args) -> Result<ExitCode> {
    let registry = JobRegistry::builtin();
    if args.list_jobs {
        print_jobs(&registry);
        return Ok(ExitCode::Success);
    }

    let (config, config_path) = load_config(&args)?;
    let parameters = args.job_parameters(&config.parameter_values())?;
    let silent = parameters.flag(PARAM_SILENT)?;

    init_logging(&args, &config, silent)?;
    if let Some(path) = &config_path {
        tracing::info!(path = %path.display(), "Loaded config file");
    }

    let settings = runtime_settings(&args, &config);
    tracing::debug!(
        database = %settings.database.display(),
        work_dir = %settings.work_dir.display(),
        base_url = %settings.base_url,
        "Resolved runtime settings"
    );
    log_parameters(&parameters);

    let interrupt = CancellationToken::new();
    if let Err(e) = cancel_on_interrupt(interrupt.clone()) {
        tracing::warn!(error = %e, "Ctrl-C will not cancel the job");
    }

    let runner = JobRunner::new(&registry, settings).with_cancellation(interrupt.clone());
    let outcome = match runner.launch(&args.job, &parameters)? {
        LaunchOutcome::Completed(outcome) => outcome,
        LaunchOutcome::Detached(task) => wait_for_task(task, &interrupt, silent),
    };

    if args.json {
        println!("{}", summary_json(&outcome)?);
    } else if !silent {
        print_summary(&outcome);
    }
    Ok(exit_code_for(&outcome))
}

/// Loads the explicit config file, or auto-discovers one in the current directory
fn load_config(args: &Args) -> Result<(ConfigFile, Option<PathBuf>)> {
    if let Some(path) = &args.config {
        let config = config::load_config_from_path(path)?;
        return Ok((config, Some(path.clone())));
    }
    match config::discover_config(Path::new("."))? {
        Some(config) => Ok((config, Some(PathBuf::from(config::CONFIG_FILENAME)))),
        None => Ok((ConfigFile::default(), None)),
    }
}

fn init_logging(args: &Args, config: &ConfigFile, silent: bool) -> Result<()> {
    let default_level = if silent { "warn" } else { "info" };
    let level = args
        .log_level
        .clone()
        .or_else(|| config.log_level.clone())
        .unwrap_or_else(|| default_level.to_string());
    let format = args.log_format.or(config.log_format).unwrap_or_default();

    init_logging_with_config(LogConfig::new().level(level).format(format))
}

fn runtime_settings(args: &Args, config: &ConfigFile) -> RuntimeSettings {
    let defaults = RuntimeSettings::default();
    RuntimeSettings {
        database: args
            .database
            .clone()
            .or_else(|| config.database.clone())
            .unwrap_or(defaults.database),
        work_dir: args
            .work_dir
            .clone()
            .or_else(|| config.work_dir.clone())
            .unwrap_or(defaults.work_dir),
        base_url: args
            .base_url
            .clone()
            .or_else(|| config.base_url.clone())
            .unwrap_or(defaults.base_url),
    }
}

fn log_parameters(parameters: &JobParameters) {
    for (key, value) in parameters.iter() {
        tracing::debug!(parameter = key, value, "Job parameter");
    }
}

/// Polls a background task with a spinner, then joins it
///
/// An interrupt cancels the task; the worker still runs to its next
/// checkpoint before the join returns.
fn wait_for_task(task: JobTask, interrupt: &CancellationToken, silent: bool) -> JoinOutcome {
    let spinner = if silent {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(style);
        }
        pb
    };
    spinner.set_message(format!("Task {} running in background...", task.id()));

    let mut cancelling = false;
    while !task.is_finished() {
        if interrupt.is_cancelled() && !cancelling {
            task.cancel();
            spinner.set_message(format!("Task {} cancelling...", task.id()));
            cancelling = true;
        }
        spinner.tick();
        thread::sleep(SPINNER_INTERVAL);
    }

    spinner.finish_and_clear();
    task.join()
}

fn exit_code_for(outcome: &JoinOutcome) -> ExitCode {
    match (&outcome.report, outcome.state) {
        (None, _) => ExitCode::ApplicationError,
        (Some(_), TaskState::Cancelled) => ExitCode::Incomplete,
        (Some(report), _) if !report.is_clean() => ExitCode::Incomplete,
        (Some(_), _) => ExitCode::Success,
    }
}

fn summary_json(outcome: &JoinOutcome) -> Result<String> {
    Ok(serde_json::to_string_pretty(outcome)?)
}

fn print_jobs(registry: &JobRegistry) {
    println!("{}", "Available jobs:".bold());
    for job in registry.iter() {
        println!("  {:<14} {}", job.name.green(), job.summary);
    }
}

fn print_summary(outcome: &JoinOutcome) {
    let Some(report) = &outcome.report else {
        println!(
            "{} synchronization aborted, see the log for details",
            "✗".red()
        );
        return;
    };

    let status = match outcome.state {
        TaskState::Cancelled => "cancelled".yellow().to_string(),
        _ if report.has_failures() => "finished with errors".yellow().to_string(),
        _ => "finished".green().to_string(),
    };
    println!("{} {}", "Synchronization".bold(), status);
    if report.cleared {
        println!("  cleared:    all previous records removed");
    }
    println!("  imported:   {}", join_or_dash(&report.imported));
    println!("  unchanged:  {}", join_or_dash(&report.unchanged));
    if !report.implied_years.is_empty() {
        let years: Vec<String> = report.implied_years.iter().map(u16::to_string).collect();
        println!("  via Modified: {}", years.join(" "));
    }
    println!(
        "  written:    {} records, {} affected products",
        report.records_written, report.affected_written
    );
    for failed in &report.failed {
        let reason = failed.reason.lines().next().unwrap_or_default();
        println!("  {} {}: {}", "failed".red(), failed.feed, reason);
    }
}

fn join_or_dash(feeds: &[String]) -> String {
    if feeds.is_empty() {
        "-".to_string()
    } else {
        feeds.join(" ")
    }
}
