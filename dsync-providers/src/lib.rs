//! Remote store providers for dsync
//!
//! Supports a local directory store and, with the `webdav` feature, any
//! WebDAV server.

mod local;

#[cfg(feature = "webdav")]
pub mod webdav;

pub use local::LocalStore;

#[cfg(feature = "webdav")]
pub use webdav::{WebDavAuth, WebDavConfig, WebDavStore};

use dsync_core::{RemoteStore, SyncError, SyncResult};
use std::path::PathBuf;
use std::sync::Arc;

/// Where a project's files live
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// `file://<dir>`: a directory holding one subdirectory per project
    Local(PathBuf),
    /// `http(s)://...` or a bare domain: a WebDAV server
    WebDav(String),
}

impl Endpoint {
    pub fn parse(endpoint: &str) -> SyncResult<Self> {
        let endpoint = endpoint.trim();
        if endpoint.is_empty() {
            return Err(SyncError::Config("empty remote endpoint".into()));
        }
        if let Some(dir) = endpoint.strip_prefix("file://") {
            if dir.is_empty() {
                return Err(SyncError::Config("file:// endpoint needs a directory".into()));
            }
            return Ok(Endpoint::Local(PathBuf::from(dir)));
        }
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            return Ok(Endpoint::WebDav(endpoint.to_string()));
        }
        if endpoint.contains("://") {
            return Err(SyncError::Config(format!("unsupported endpoint scheme: {endpoint}")));
        }
        Ok(Endpoint::WebDav(format!("https://{endpoint}")))
    }
}

/// Open the store serving `project_id` at `endpoint`.
pub fn open_store(
    endpoint: &str,
    project_id: &str,
    token: Option<&str>,
) -> SyncResult<Arc<dyn RemoteStore>> {
    match Endpoint::parse(endpoint)? {
        Endpoint::Local(root) => {
            if !root.is_dir() {
                return Err(SyncError::Config(format!(
                    "store directory does not exist: {}",
                    root.display()
                )));
            }
            tracing::debug!("opening local store at {}", root.display());
            Ok(Arc::new(LocalStore::new(root, project_id)))
        }
        #[cfg(feature = "webdav")]
        Endpoint::WebDav(base_url) => {
            tracing::debug!("opening WebDAV store at {base_url}");
            let auth = match token {
                Some(token) => WebDavAuth::Bearer(token.to_string()),
                None => WebDavAuth::None,
            };
            let store = WebDavStore::new(WebDavConfig {
                base_url,
                project_id: project_id.to_string(),
                auth,
            })?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "webdav"))]
        Endpoint::WebDav(base_url) => {
            let _ = token;
            Err(SyncError::Config(format!(
                "{base_url}: built without WebDAV support (enable the `webdav` feature)"
            )))
        }
    }
}
