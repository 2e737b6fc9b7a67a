//! Error types for dsync

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias
pub type SyncResult<T> = Result<T, SyncError>;

/// Main error type
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Path not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate limited: retry after {retry_after_secs:?}s")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Timeout")]
    Timeout,

    #[error("Provider API error ({provider}): {message}")]
    ProviderApi { provider: String, message: String },

    #[error("Transfer failed for {path}: {message}")]
    Transfer { path: String, message: String },

    #[error("Failed to list {path}: {message}")]
    Listing { path: String, message: String },

    #[error("Failed to create directory {}: {source}", path.display())]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Action should be either 'upload', 'download' or 'check-dirs'. Currently: action={0}")]
    InvalidAction(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to persist {}: {message}", path.display())]
    Persist { path: PathBuf, message: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("{0}")]
    Other(String),
}

impl SyncError {
    /// Wrap any error raised while enumerating `path`.
    pub fn listing(path: impl Into<String>, err: impl std::fmt::Display) -> Self {
        SyncError::Listing {
            path: path.into(),
            message: err.to_string(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SyncError::Network(_)
                | SyncError::RateLimited { .. }
                | SyncError::Timeout
                | SyncError::Transfer { .. }
                | SyncError::Io(_)
                | SyncError::ProviderApi { .. }
        )
    }

    /// Errors that repeating the same call cannot fix.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            SyncError::NotFound(_)
                | SyncError::PermissionDenied(_)
                | SyncError::AuthFailed(_)
                | SyncError::InvalidPath(_)
        )
    }

    /// Errors that end the whole session rather than a single item.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SyncError::Listing { .. }
                | SyncError::InvalidAction(_)
                | SyncError::Config(_)
                | SyncError::Persist { .. }
                | SyncError::Serialization(_)
        )
    }
}
