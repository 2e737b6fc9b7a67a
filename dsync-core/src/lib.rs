//! dsync Core
//!
//! Core traits, types, and configuration for bulk file sync between a local
//! filesystem and a project-scoped remote store.

pub mod config;
pub mod entry;
pub mod error;
pub mod outcome;
pub mod path;
pub mod store;

pub use config::{Action, RetryPolicy, SyncConfig};
pub use entry::{classify_entry, EntryKind, ListingEntry};
pub use error::{SyncError, SyncResult};
pub use outcome::{BatchOutcome, Direction, TransferItem, TransferOutcome};
pub use path::RemotePath;
pub use store::RemoteStore;
