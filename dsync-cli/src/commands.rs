// SPDX-License-Identifier: AGPL-3.0-or-later
//! CLI command implementations

use console::style;
use dsync_core::{Action, RetryPolicy, SyncConfig, SyncResult};
use dsync_engine::{run_session, DirTreeReport, ReporterOptions, SessionReport, SessionSummary};
use dsync_providers::open_store;
use std::path::PathBuf;
use std::time::Duration;
use tabled::{Table, Tabled};
use tracing_subscriber::filter::LevelFilter;

/// Raw command-line values a session is configured from
pub struct ConfigArgs {
    pub action: Action,
    pub project_id: String,
    pub endpoint: String,
    pub local_dir: String,
    pub remote_dir: String,
    pub max_attempts: u32,
    pub wait_secs: u64,
    pub retry_permanent: bool,
    pub output_dir: String,
    pub session_name: Option<String>,
}

/// Resolve command-line values into the session's immutable configuration
pub fn build_config(args: ConfigArgs) -> SyncConfig {
    let mut retry = RetryPolicy::new(args.max_attempts, Duration::from_secs(args.wait_secs));
    if !args.retry_permanent {
        retry = retry.fail_fast();
    }

    let config = SyncConfig::new(args.action, args.project_id.trim(), args.endpoint.trim())
        .with_local_dir(expand_home(&args.local_dir))
        .with_remote_dir(&args.remote_dir)
        .with_retry(retry)
        .with_output_dir(expand_home(&args.output_dir));

    match args.session_name {
        Some(name) => config.with_session_name(name),
        None => config,
    }
}

/// Expand a leading `~` to the user's home directory
pub fn expand_home(path: &str) -> PathBuf {
    let home = || directories::BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf());

    if path == "~" {
        if let Some(home) = home() {
            return home;
        }
    } else if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = home() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

pub fn reporter_options(verbose: bool, quiet: bool) -> ReporterOptions {
    let console_level = if verbose {
        LevelFilter::INFO
    } else if quiet {
        LevelFilter::ERROR
    } else {
        LevelFilter::WARN
    };
    ReporterOptions {
        console_level,
        quiet,
    }
}

/// Open the store and run one session
pub async fn sync(
    config: &SyncConfig,
    token: Option<&str>,
    options: ReporterOptions,
) -> SyncResult<SessionReport> {
    config.validate()?;
    let store = open_store(&config.endpoint, &config.project_id, token)?;
    run_session(config, store, options).await
}

#[derive(Tabled)]
struct FailureRow {
    #[tabled(rename = "Path")]
    path: String,
    #[tabled(rename = "Last error")]
    error: String,
}

/// Print the end-of-session summary
pub fn print_report(report: &SessionReport) {
    match report {
        SessionReport::Transfer(summary) => print_transfer(summary),
        SessionReport::Dirs(dirs) => print_dirs(dirs),
    }
}

fn print_transfer(summary: &SessionSummary) {
    println!();
    if summary.is_clean() {
        println!("{} {}", style("✓").green(), summary);
    } else {
        println!("{} {}", style("✗").red(), summary);
        let rows: Vec<FailureRow> = summary
            .failures
            .iter()
            .map(|(path, error)| FailureRow {
                path: path.clone(),
                error: error.clone(),
            })
            .collect();
        println!("{}", Table::new(rows));
    }

    println!(
        "{} {}",
        style("Succeeded:").dim(),
        summary.succeeded_file.display()
    );
    println!("{} {}", style("Failed:").dim(), summary.failed_file.display());
    println!("{} {}", style("Log:").dim(), summary.log_path.display());
    println!(
        "{} {:.1}s",
        style("Elapsed:").dim(),
        summary.elapsed.as_secs_f64()
    );
}

fn print_dirs(dirs: &DirTreeReport) {
    println!();
    let line = format!(
        "Directories created: {}. Already present: {}. Failed: {}.",
        dirs.created.len(),
        dirs.existing.len(),
        dirs.failed.len()
    );
    if dirs.failed.is_empty() {
        println!("{} {}", style("✓").green(), line);
        return;
    }

    println!("{} {}", style("✗").red(), line);
    let rows: Vec<FailureRow> = dirs
        .failed
        .iter()
        .map(|(path, error)| FailureRow {
            path: path.display().to_string(),
            error: error.clone(),
        })
        .collect();
    println!("{}", Table::new(rows));
}
