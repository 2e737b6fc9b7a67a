//! Session configuration
//!
//! Everything a sync session needs is resolved once, up front, into an
//! immutable [`SyncConfig`] that is handed to the session and batch runner.

use crate::{Direction, RemotePath, SyncError, SyncResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Total attempts per item, first try included
pub const DEFAULT_MAX_ATTEMPTS: u32 = 6;

/// Fixed pause between attempts
pub const DEFAULT_WAIT: Duration = Duration::from_secs(10 * 60);

/// Environment variable holding the remote endpoint (domain override)
pub const ENV_DOMAIN: &str = "DSYNC_DOMAIN";

/// Environment variable holding the project the store is scoped to
pub const ENV_PROJECT_ID: &str = "DSYNC_PROJECT_ID";

/// What a session does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Upload,
    Download,
    /// Mirror the remote directory tree locally without transferring files
    CheckDirs,
}

impl Action {
    pub fn direction(&self) -> Option<Direction> {
        match self {
            Action::Upload => Some(Direction::Upload),
            Action::Download => Some(Direction::Download),
            Action::CheckDirs => None,
        }
    }

    pub fn default_session_name(&self) -> &'static str {
        match self {
            Action::Upload => "dsync_upload",
            Action::Download => "dsync_download",
            Action::CheckDirs => "dsync_check_dirs",
        }
    }
}

impl FromStr for Action {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "upload" => Ok(Action::Upload),
            "download" => Ok(Action::Download),
            "check-dirs" | "check_download_dirs" => Ok(Action::CheckDirs),
            other => Err(SyncError::InvalidAction(other.to_string())),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Upload => write!(f, "upload"),
            Action::Download => write!(f, "download"),
            Action::CheckDirs => write!(f, "check-dirs"),
        }
    }
}

/// Bounded fixed-delay retry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts per item; `SyncConfig::validate` rejects 0
    pub max_attempts: u32,
    /// Pause between consecutive attempts
    pub wait: Duration,
    /// Keep retrying errors that cannot succeed on retry (not found, auth)
    pub retry_permanent: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            wait: DEFAULT_WAIT,
            retry_permanent: true,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, wait: Duration) -> Self {
        Self {
            max_attempts,
            wait,
            retry_permanent: true,
        }
    }

    pub fn fail_fast(mut self) -> Self {
        self.retry_permanent = false;
        self
    }

    /// Whether another attempt should follow failed attempt number `attempt`.
    pub fn should_retry(&self, attempt: u32, err: &SyncError) -> bool {
        if attempt >= self.max_attempts {
            return false;
        }
        self.retry_permanent || !err.is_permanent()
    }
}

/// Immutable configuration of one sync session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub action: Action,
    pub project_id: String,
    /// Remote endpoint: `file://<dir>`, `http(s)://<host>[/base]` or a bare domain
    pub endpoint: String,
    pub local_dir: PathBuf,
    pub remote_dir: RemotePath,
    pub retry: RetryPolicy,
    /// Where the session log and outcome files are written
    pub output_dir: PathBuf,
    pub session_name: String,
}

impl SyncConfig {
    pub fn new(action: Action, project_id: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            action,
            project_id: project_id.into(),
            endpoint: endpoint.into(),
            local_dir: PathBuf::from("."),
            remote_dir: RemotePath::new("/output/"),
            retry: RetryPolicy::default(),
            output_dir: PathBuf::from("."),
            session_name: action.default_session_name().to_string(),
        }
    }

    pub fn with_local_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.local_dir = dir.into();
        self
    }

    pub fn with_remote_dir(mut self, dir: impl AsRef<str>) -> Self {
        self.remote_dir = RemotePath::new(dir);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_session_name(mut self, name: impl Into<String>) -> Self {
        self.session_name = name.into();
        self
    }

    pub fn validate(&self) -> SyncResult<()> {
        if self.project_id.trim().is_empty() {
            return Err(SyncError::Config(format!(
                "project id is required (use --project-id or {ENV_PROJECT_ID})"
            )));
        }
        if self.endpoint.trim().is_empty() {
            return Err(SyncError::Config(format!(
                "remote endpoint is required (use --endpoint or {ENV_DOMAIN})"
            )));
        }
        if self.session_name.trim().is_empty() || self.session_name.contains('/') {
            return Err(SyncError::Config(format!(
                "invalid session name: {:?}",
                self.session_name
            )));
        }
        if self.retry.max_attempts == 0 {
            return Err(SyncError::Config("max attempts must be at least 1".into()));
        }
        if self.action == Action::Upload && !self.local_dir.is_dir() {
            return Err(SyncError::Config(format!(
                "local directory does not exist: {}",
                self.local_dir.display()
            )));
        }
        Ok(())
    }
}
