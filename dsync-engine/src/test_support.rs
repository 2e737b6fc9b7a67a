//! In-memory store double with scripted failures

use async_trait::async_trait;
use dsync_core::{ListingEntry, RemotePath, RemoteStore, SyncError, SyncResult};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List(String),
    Get(String, PathBuf),
    Put(PathBuf, String),
}

/// How a path responds to transfers
#[derive(Debug, Clone, Copy)]
pub enum Script {
    /// Fail this many times, then succeed
    FailTimes(u32),
    AlwaysFail,
    /// Always fail with a permanent error
    Missing,
    Panic,
}

#[derive(Default)]
pub struct ScriptedStore {
    listing: Vec<ListingEntry>,
    list_error: bool,
    scripts: Mutex<HashMap<String, Script>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listing(mut self, paths: &[&str]) -> Self {
        self.listing = paths.iter().map(|p| ListingEntry::raw(*p)).collect();
        self
    }

    pub fn with_list_error(mut self) -> Self {
        self.list_error = true;
        self
    }

    /// Script responses for a remote path (downloads) or local path (uploads)
    pub fn script(self, key: impl Into<String>, script: Script) -> Self {
        self.scripts.lock().unwrap().insert(key.into(), script);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn transfer_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| !matches!(c, Call::List(_)))
            .count()
    }

    fn respond(&self, key: &str) -> SyncResult<()> {
        let script = self.scripts.lock().unwrap().get(key).copied();
        match script {
            None | Some(Script::FailTimes(0)) => Ok(()),
            Some(Script::FailTimes(n)) => {
                self.scripts
                    .lock()
                    .unwrap()
                    .insert(key.to_string(), Script::FailTimes(n - 1));
                Err(SyncError::Network(format!("connection reset while moving {key}")))
            }
            Some(Script::AlwaysFail) => Err(SyncError::Network(format!("remote unavailable for {key}"))),
            Some(Script::Missing) => Err(SyncError::NotFound(key.to_string())),
            Some(Script::Panic) => panic!("store blew up on {key}"),
        }
    }
}

#[async_trait]
impl RemoteStore for ScriptedStore {
    fn project_id(&self) -> &str {
        "test-project"
    }

    fn display_name(&self) -> &str {
        "Scripted"
    }

    async fn list(&self, dir: &RemotePath) -> SyncResult<Vec<ListingEntry>> {
        self.calls.lock().unwrap().push(Call::List(dir.to_path_string()));
        if self.list_error {
            return Err(SyncError::Network("listing timed out".into()));
        }
        Ok(self.listing.clone())
    }

    async fn get(&self, remote: &RemotePath, local: &Path) -> SyncResult<()> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Get(remote.to_path_string(), local.to_path_buf()));
        self.respond(&remote.to_path_string())?;
        std::fs::write(local, remote.to_path_string())?;
        Ok(())
    }

    async fn put(&self, local: &Path, remote: &RemotePath) -> SyncResult<()> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Put(local.to_path_buf(), remote.to_path_string()));
        self.respond(&local.display().to_string())
    }
}
