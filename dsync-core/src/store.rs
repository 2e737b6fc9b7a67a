//! Remote store trait

use async_trait::async_trait;
use std::path::Path;

use crate::{entry::ListingEntry, error::SyncResult, RemotePath};

/// Project-scoped remote object store
///
/// Every call addresses the project the store was opened for.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    fn project_id(&self) -> &str;
    fn display_name(&self) -> &str;

    /// List every entry below `dir`, recursively.
    ///
    /// Directory entries end with `/`. Entries are absolute paths within the
    /// project namespace.
    async fn list(&self, dir: &RemotePath) -> SyncResult<Vec<ListingEntry>>;

    /// Fetch `remote` into the local file `local`. The parent of `local`
    /// must already exist.
    async fn get(&self, remote: &RemotePath, local: &Path) -> SyncResult<()>;

    /// Store the local file `local` at `remote`.
    async fn put(&self, local: &Path, remote: &RemotePath) -> SyncResult<()>;
}
