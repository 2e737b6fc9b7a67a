//! Transfer items and their outcomes

use crate::RemotePath;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Transfer direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Upload,
    Download,
}

impl Direction {
    /// File that receives the paths of transferred items.
    pub fn succeeded_file(&self) -> &'static str {
        match self {
            Direction::Upload => "uploaded_files.json",
            Direction::Download => "downloaded_files.json",
        }
    }

    /// File that receives the paths of failed items.
    pub fn failed_file(&self) -> &'static str {
        match self {
            Direction::Upload => "failed_uploads.json",
            Direction::Download => "failed_downloads.json",
        }
    }

    /// Path recorded for `item` in the outcome files: the source side.
    pub fn record_path(&self, item: &TransferItem) -> String {
        match self {
            Direction::Upload => item.local_path.display().to_string(),
            Direction::Download => item.remote_path.to_path_string(),
        }
    }

    pub fn verb(&self) -> &'static str {
        match self {
            Direction::Upload => "Upload",
            Direction::Download => "Download",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Upload => write!(f, "upload"),
            Direction::Download => write!(f, "download"),
        }
    }
}

/// A single file to transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferItem {
    pub local_path: PathBuf,
    pub remote_path: RemotePath,
}

impl TransferItem {
    pub fn new(local_path: impl Into<PathBuf>, remote_path: RemotePath) -> Self {
        Self {
            local_path: local_path.into(),
            remote_path,
        }
    }
}

/// Result of driving one item through the executor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    Success { item: TransferItem, attempts: u32 },
    Failure { item: TransferItem, last_error: String },
}

impl TransferOutcome {
    pub fn item(&self) -> &TransferItem {
        match self {
            TransferOutcome::Success { item, .. } | TransferOutcome::Failure { item, .. } => item,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TransferOutcome::Success { .. })
    }
}

/// Succeeded and failed items of a batch, in enumeration order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    pub direction: Direction,
    pub succeeded: Vec<TransferItem>,
    /// Failed items with the text of their last error
    pub failed: Vec<(TransferItem, String)>,
}

impl BatchOutcome {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }

    /// File each outcome into exactly one list.
    pub fn record(&mut self, outcome: TransferOutcome) {
        match outcome {
            TransferOutcome::Success { item, .. } => self.succeeded.push(item),
            TransferOutcome::Failure { item, last_error } => self.failed.push((item, last_error)),
        }
    }

    /// Append another batch of the same direction.
    pub fn merge(mut self, other: BatchOutcome) -> Self {
        debug_assert_eq!(self.direction, other.direction);
        self.succeeded.extend(other.succeeded);
        self.failed.extend(other.failed);
        self
    }

    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn succeeded_paths(&self) -> Vec<String> {
        self.succeeded
            .iter()
            .map(|item| self.direction.record_path(item))
            .collect()
    }

    pub fn failed_paths(&self) -> Vec<String> {
        self.failed
            .iter()
            .map(|(item, _)| self.direction.record_path(item))
            .collect()
    }
}
