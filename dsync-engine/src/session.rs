//! One end-to-end sync session

use crate::batch::{BatchRunner, DirTreeReport};
use crate::reporter::{ReporterOptions, SessionReporter, SessionSummary};
use dsync_core::{Action, BatchOutcome, RemoteStore, SyncConfig, SyncResult};
use std::sync::Arc;
use tracing::Level;

/// What a completed session produced
#[derive(Debug, Clone)]
pub enum SessionReport {
    /// Upload or download, with outcome files written
    Transfer(SessionSummary),
    /// Directory check only, nothing transferred
    Dirs(DirTreeReport),
}

impl SessionReport {
    /// True when no item or directory failed.
    pub fn is_clean(&self) -> bool {
        match self {
            SessionReport::Transfer(summary) => summary.is_clean(),
            SessionReport::Dirs(report) => report.failed.is_empty(),
        }
    }
}

/// Open the session log, run the configured action against `store`, then
/// close the session.
///
/// Per-item failures end up in the summary. A fatal error (bad config,
/// unreadable listing, outcome files that cannot be saved) is logged and
/// returned; no outcome files are written in that case.
pub async fn run_session(
    config: &SyncConfig,
    store: Arc<dyn RemoteStore>,
    options: ReporterOptions,
) -> SyncResult<SessionReport> {
    config.validate()?;

    let reporter = SessionReporter::init(config, options)?;
    let runner = BatchRunner::new(store, config.retry, &reporter);
    let result = match config.action {
        Action::Upload => runner
            .run_upload(&config.local_dir, &config.remote_dir)
            .await
            .map(Completed::Batch),
        Action::Download => runner
            .run_download(&config.local_dir, &config.remote_dir)
            .await
            .map(Completed::Batch),
        Action::CheckDirs => runner
            .check_dirs(&config.local_dir, &config.remote_dir)
            .await
            .map(Completed::Dirs),
    };
    drop(runner);

    match result {
        Ok(Completed::Batch(outcome)) => reporter.finalize(&outcome).map(SessionReport::Transfer),
        Ok(Completed::Dirs(dirs)) => {
            reporter.close();
            Ok(SessionReport::Dirs(dirs))
        }
        Err(err) => {
            reporter.report(Level::ERROR, format_args!("Session aborted: {err}"));
            reporter.close();
            Err(err)
        }
    }
}

enum Completed {
    Batch(BatchOutcome),
    Dirs(DirTreeReport),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::load_list;
    use crate::test_support::{Script, ScriptedStore};
    use dsync_core::{RetryPolicy, SyncError};
    use std::time::Duration;
    use tempfile::TempDir;
    use tracing_subscriber::filter::LevelFilter;

    fn quiet() -> ReporterOptions {
        ReporterOptions {
            console_level: LevelFilter::OFF,
            quiet: true,
        }
    }

    fn config(action: Action, dir: &TempDir) -> SyncConfig {
        SyncConfig::new(action, "proj", "file:///unused")
            .with_local_dir(dir.path().join("data"))
            .with_output_dir(dir.path().join("out"))
            .with_retry(RetryPolicy::new(6, Duration::ZERO))
    }

    #[tokio::test]
    async fn test_upload_session_writes_outcome_files() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("data")).unwrap();
        std::fs::write(dir.path().join("data/a.csv"), "1").unwrap();
        std::fs::write(dir.path().join("data/b.csv"), "2").unwrap();

        let store = Arc::new(ScriptedStore::new());
        let report = run_session(&config(Action::Upload, &dir), store, quiet())
            .await
            .unwrap();

        let SessionReport::Transfer(summary) = report else {
            panic!("expected a transfer report");
        };
        assert!(summary.is_clean());
        assert_eq!(summary.to_string(), "Uploaded files: 2. Failed uploads: 0.");
        assert_eq!(load_list(&dir.path().join("out/uploaded_files.json")).unwrap().len(), 2);
        assert!(load_list(&dir.path().join("out/failed_uploads.json")).unwrap().is_empty());

        let log = std::fs::read_to_string(dir.path().join("out/dsync_upload.log")).unwrap();
        assert!(log.contains("There are 2 files in total ..."));
    }

    #[tokio::test]
    async fn test_download_session_with_failures_is_not_clean() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(
            ScriptedStore::new()
                .with_listing(&["/output/sub/", "/output/sub/c.txt"])
                .script("/output/sub/c.txt", Script::AlwaysFail),
        );

        let report = run_session(&config(Action::Download, &dir), store, quiet())
            .await
            .unwrap();

        assert!(!report.is_clean());
        assert!(dir.path().join("data/output/sub").is_dir());
        assert_eq!(
            load_list(&dir.path().join("out/failed_downloads.json")).unwrap(),
            vec!["/output/sub/c.txt"]
        );
    }

    #[tokio::test]
    async fn test_listing_error_writes_no_outcome_files() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(ScriptedStore::new().with_list_error());

        let err = run_session(&config(Action::Download, &dir), store, quiet())
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::Listing { .. }));
        assert!(!dir.path().join("out/downloaded_files.json").exists());
        assert!(!dir.path().join("out/failed_downloads.json").exists());
        let log = std::fs::read_to_string(dir.path().join("out/dsync_download.log")).unwrap();
        assert!(log.contains(" - ERROR - Session aborted: Failed to list /output"));
    }

    #[tokio::test]
    async fn test_check_dirs_session() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(ScriptedStore::new().with_listing(&["/output/a/", "/output/a/b/"]));

        let report = run_session(&config(Action::CheckDirs, &dir), store.clone(), quiet())
            .await
            .unwrap();

        assert!(matches!(report, SessionReport::Dirs(ref d) if d.created.len() == 2));
        assert!(report.is_clean());
        assert_eq!(store.transfer_calls(), 0);
        assert!(!dir.path().join("out/downloaded_files.json").exists());
    }

    #[tokio::test]
    async fn test_invalid_config_opens_no_session() {
        let dir = TempDir::new().unwrap();
        let cfg = config(Action::Download, &dir).with_session_name("");

        let err = run_session(&cfg, Arc::new(ScriptedStore::new()), quiet())
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::Config(_)));
        assert!(!dir.path().join("out").exists());
    }
}
