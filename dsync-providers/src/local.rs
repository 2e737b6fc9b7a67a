//! Local directory store
//!
//! Keeps each project under `<root>/<project_id>/`. Useful against mounted
//! network shares and as a stand-in for a real remote in tests.

use async_trait::async_trait;
use dsync_core::{ListingEntry, RemotePath, RemoteStore, SyncError, SyncResult};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use walkdir::WalkDir;

/// Directory-backed remote store
pub struct LocalStore {
    project_id: String,
    namespace: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl AsRef<Path>, project_id: impl Into<String>) -> Self {
        let project_id = project_id.into();
        let namespace = root.as_ref().join(&project_id);
        Self { project_id, namespace }
    }

    /// Directory holding this project's files
    pub fn namespace(&self) -> &Path {
        &self.namespace
    }

    fn to_real_path(&self, path: &RemotePath) -> PathBuf {
        path.to_local(&self.namespace)
    }

    fn to_remote_path(&self, real: &Path) -> SyncResult<RemotePath> {
        let relative = real
            .strip_prefix(&self.namespace)
            .map_err(|_| SyncError::InvalidPath(real.display().to_string()))?;
        Ok(RemotePath::new(relative.to_string_lossy()))
    }

    fn walk(&self, real: &Path) -> SyncResult<Vec<ListingEntry>> {
        let mut entries = Vec::new();
        for entry in WalkDir::new(real).min_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|e| SyncError::Io(io::Error::other(e.to_string())))?;
            let remote = self.to_remote_path(entry.path())?.to_path_string();
            if entry.file_type().is_dir() {
                entries.push(ListingEntry::directory(remote));
            } else {
                entries.push(ListingEntry::file(remote));
            }
        }
        Ok(entries)
    }
}

/// Translate an io error on `path` into the store's error vocabulary.
fn map_io(err: io::Error, path: impl std::fmt::Display) -> SyncError {
    match err.kind() {
        io::ErrorKind::NotFound => SyncError::NotFound(path.to_string()),
        io::ErrorKind::PermissionDenied => SyncError::PermissionDenied(path.to_string()),
        _ => SyncError::Io(err),
    }
}

#[async_trait]
impl RemoteStore for LocalStore {
    fn project_id(&self) -> &str {
        &self.project_id
    }

    fn display_name(&self) -> &str {
        "Local Directory"
    }

    async fn list(&self, dir: &RemotePath) -> SyncResult<Vec<ListingEntry>> {
        let real = self.to_real_path(dir);
        if !real.is_dir() {
            return Err(SyncError::NotFound(dir.to_string()));
        }
        let mut entries = vec![ListingEntry::directory(dir.to_path_string())];
        entries.extend(self.walk(&real)?);
        Ok(entries)
    }

    async fn get(&self, remote: &RemotePath, local: &Path) -> SyncResult<()> {
        let real = self.to_real_path(remote);
        if !real.is_file() {
            return Err(SyncError::NotFound(remote.to_string()));
        }
        fs::copy(&real, local)
            .await
            .map_err(|e| map_io(e, local.display()))?;
        Ok(())
    }

    async fn put(&self, local: &Path, remote: &RemotePath) -> SyncResult<()> {
        if !local.is_file() {
            return Err(SyncError::NotFound(local.display().to_string()));
        }
        let real = self.to_real_path(remote);
        if let Some(parent) = real.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| map_io(e, remote))?;
        }
        fs::copy(local, &real).await.map_err(|e| map_io(e, remote))?;
        Ok(())
    }
}
