// SPDX-License-Identifier: AGPL-3.0-or-later
//! dsync CLI
//!
//! Bulk upload and download of a project's files with bounded retry.

mod commands;

use clap::Parser;
use dsync_core::config::{DEFAULT_MAX_ATTEMPTS, DEFAULT_WAIT, ENV_DOMAIN, ENV_PROJECT_ID};
use dsync_core::Action;
use std::process::ExitCode;

/// Exit status when some items failed but the batch completed
const EXIT_ITEM_FAILURES: u8 = 3;
/// Exit status for invalid usage
const EXIT_USAGE: u8 = 2;

#[derive(Parser)]
#[command(name = "dsync")]
#[command(author, version, about = "dsync - Bulk file transfer with retry", long_about = None)]
struct Cli {
    /// upload, download or check-dirs
    #[arg(long, default_value = "")]
    action: String,

    /// Project the remote store is scoped to
    #[arg(long, env = ENV_PROJECT_ID, default_value = "")]
    project_id: String,

    /// Local directory (a leading ~ is expanded)
    #[arg(long, default_value = ".")]
    local_dir: String,

    /// Remote directory inside the project
    #[arg(long, default_value = "/output/")]
    remote_dir: String,

    /// Remote endpoint: file://<dir>, http(s)://<host> or a bare domain
    #[arg(long, env = ENV_DOMAIN, default_value = "")]
    endpoint: String,

    /// Bearer token for the remote store
    #[arg(long, env = "DSYNC_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Attempts per file, first try included
    #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS)]
    max_retries: u32,

    /// Seconds to wait between attempts
    #[arg(long, default_value_t = DEFAULT_WAIT.as_secs())]
    wait_secs: u64,

    /// Give up at once on errors a retry cannot fix (not found, denied)
    #[arg(long)]
    no_retry_permanent: bool,

    /// Directory for the session log and outcome lists
    #[arg(long, default_value = ".")]
    output_dir: String,

    /// Session name, used for the log file name
    #[arg(long)]
    session_name: Option<String>,

    /// Echo INFO messages to stderr
    #[arg(short, long)]
    verbose: bool,

    /// Only print the final summary
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let action: Action = match cli.action.parse() {
        Ok(action) => action,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(EXIT_USAGE);
        }
    };

    let options = commands::reporter_options(cli.verbose, cli.quiet);
    let config = commands::build_config(commands::ConfigArgs {
        action,
        project_id: cli.project_id,
        endpoint: cli.endpoint,
        local_dir: cli.local_dir,
        remote_dir: cli.remote_dir,
        max_attempts: cli.max_retries,
        wait_secs: cli.wait_secs,
        retry_permanent: !cli.no_retry_permanent,
        output_dir: cli.output_dir,
        session_name: cli.session_name,
    });

    match commands::sync(&config, cli.token.as_deref(), options).await {
        Ok(report) => {
            commands::print_report(&report);
            if report.is_clean() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(EXIT_ITEM_FAILURES)
            }
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
