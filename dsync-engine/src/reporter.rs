//! Session reporting: console, session log, and outcome files.
//!
//! A [`SessionReporter`] exists only while its session is active. Creating
//! one opens the log; [`SessionReporter::finalize`] and
//! [`SessionReporter::close`] consume it, so nothing can be reported to a
//! closed session.

use crate::logging::SessionLayer;
use chrono::{DateTime, Local};
use dsync_core::{Action, BatchOutcome, Direction, SyncConfig, SyncError, SyncResult};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::subscriber::DefaultGuard;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Layer;

/// Console behaviour of a session
#[derive(Debug, Clone, Copy)]
pub struct ReporterOptions {
    /// Lowest level echoed to stderr
    pub console_level: LevelFilter,
    /// Suppress plain progress lines on stdout
    pub quiet: bool,
}

impl Default for ReporterOptions {
    fn default() -> Self {
        Self {
            console_level: LevelFilter::WARN,
            quiet: false,
        }
    }
}

/// An active sync session
pub struct SessionReporter {
    session: String,
    action: Action,
    started_at: DateTime<Local>,
    started: Instant,
    output_dir: PathBuf,
    log_path: PathBuf,
    quiet: bool,
    // Dropped in declaration order: detach the dispatcher, then flush the file.
    _dispatch: DefaultGuard,
    _log_guard: WorkerGuard,
}

/// What a finished transfer session produced
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub session: String,
    pub direction: Direction,
    pub succeeded: usize,
    pub failed: usize,
    /// Failed items with their last error, for display
    pub failures: Vec<(String, String)>,
    pub succeeded_file: PathBuf,
    pub failed_file: PathBuf,
    pub log_path: PathBuf,
    pub elapsed: std::time::Duration,
}

impl SessionSummary {
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

impl fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", counts_line(self.direction, self.succeeded, self.failed))
    }
}

/// `Uploaded files: 2. Failed uploads: 0.`
pub fn counts_line(direction: Direction, succeeded: usize, failed: usize) -> String {
    match direction {
        Direction::Upload => format!("Uploaded files: {succeeded}. Failed uploads: {failed}."),
        Direction::Download => {
            format!("Downloaded files: {succeeded}. Failed downloads: {failed}.")
        }
    }
}

impl SessionReporter {
    /// Open `<output_dir>/<session_name>.log` in append mode and route this
    /// thread's tracing events to it and to the console.
    pub fn init(config: &SyncConfig, options: ReporterOptions) -> SyncResult<Self> {
        std::fs::create_dir_all(&config.output_dir)?;

        let appender = RollingFileAppender::builder()
            .rotation(Rotation::NEVER)
            .filename_prefix(&config.session_name)
            .filename_suffix("log")
            .build(&config.output_dir)
            .map_err(|e| SyncError::Config(format!("cannot open session log: {e}")))?;
        let (file_writer, log_guard) = tracing_appender::non_blocking(appender);

        let subscriber = tracing_subscriber::registry()
            .with(
                SessionLayer::new(&config.session_name, file_writer)
                    .with_filter(LevelFilter::DEBUG),
            )
            .with(
                SessionLayer::new(&config.session_name, std::io::stderr)
                    .with_filter(options.console_level),
            );
        let dispatch = tracing::subscriber::set_default(subscriber);

        let reporter = Self {
            session: config.session_name.clone(),
            action: config.action,
            started_at: Local::now(),
            started: Instant::now(),
            output_dir: config.output_dir.clone(),
            log_path: config.output_dir.join(format!("{}.log", config.session_name)),
            quiet: options.quiet,
            _dispatch: dispatch,
            _log_guard: log_guard,
        };

        reporter.report(
            Level::INFO,
            format_args!(
                "Session {} started: {} for project {} at {}",
                reporter.session,
                reporter.action,
                config.project_id,
                reporter.started_at.format("%Y-%m-%d %H:%M:%S")
            ),
        );
        Ok(reporter)
    }

    pub fn session(&self) -> &str {
        &self.session
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Write `message` to the session log; WARN and above also reach the console.
    pub fn report(&self, level: Level, message: impl fmt::Display) {
        match level {
            Level::ERROR => tracing::error!("{message}"),
            Level::WARN => tracing::warn!("{message}"),
            Level::INFO => tracing::info!("{message}"),
            Level::DEBUG => tracing::debug!("{message}"),
            _ => tracing::trace!("{message}"),
        }
    }

    /// A plain progress line on stdout, also logged at INFO.
    pub fn progress(&self, message: impl fmt::Display) {
        if !self.quiet {
            println!("{message}");
        }
        self.report(Level::INFO, message);
    }

    /// Persist both outcome lists, log the final counts and close the session.
    ///
    /// Outcome files from any previous run are replaced.
    pub fn finalize(self, outcome: &BatchOutcome) -> SyncResult<SessionSummary> {
        let direction = outcome.direction;
        let succeeded_file = self.output_dir.join(direction.succeeded_file());
        let failed_file = self.output_dir.join(direction.failed_file());

        let persisted = persist_list(&succeeded_file, &outcome.succeeded_paths())
            .and_then(|()| persist_list(&failed_file, &outcome.failed_paths()));
        if let Err(err) = persisted {
            self.report(Level::ERROR, format_args!("Could not save outcome lists: {err}"));
            self.close();
            return Err(err);
        }

        self.report(
            Level::INFO,
            counts_line(direction, outcome.succeeded.len(), outcome.failed.len()),
        );

        let summary = SessionSummary {
            session: self.session.clone(),
            direction,
            succeeded: outcome.succeeded.len(),
            failed: outcome.failed.len(),
            failures: outcome
                .failed
                .iter()
                .map(|(item, err)| (direction.record_path(item), err.clone()))
                .collect(),
            succeeded_file,
            failed_file,
            log_path: self.log_path.clone(),
            elapsed: self.started.elapsed(),
        };
        self.close();
        Ok(summary)
    }

    /// Close the session without writing outcome files.
    pub fn close(self) {
        self.report(
            Level::INFO,
            format_args!(
                "Session {} closed after {}s",
                self.session,
                self.started.elapsed().as_secs()
            ),
        );
    }
}

/// Write `paths` as a JSON array, replacing `path` atomically.
pub fn persist_list(path: &Path, paths: &[String]) -> SyncResult<()> {
    let persist_err = |message: String| SyncError::Persist {
        path: path.to_path_buf(),
        message,
    };

    let data = serde_json::to_vec_pretty(paths).map_err(|e| SyncError::Serialization(e.to_string()))?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, data).map_err(|e| persist_err(e.to_string()))?;
    std::fs::rename(&tmp, path).map_err(|e| persist_err(e.to_string()))?;
    Ok(())
}

/// Read back a list written by [`persist_list`].
pub fn load_list(path: &Path) -> SyncResult<Vec<String>> {
    let data = std::fs::read(path)?;
    serde_json::from_slice(&data).map_err(|e| SyncError::Serialization(e.to_string()))
}
