//! Batch runner: enumerate items and drive each through the executor

use crate::executor::TransferExecutor;
use crate::reporter::SessionReporter;
use dsync_core::{
    BatchOutcome, Direction, EntryKind, ListingEntry, RemotePath, RemoteStore, RetryPolicy,
    SyncError, SyncResult, TransferItem, TransferOutcome,
};
use glob::{MatchOptions, Pattern};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::Level;
use walkdir::WalkDir;

/// Result of mirroring remote directories locally
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirTreeReport {
    pub created: Vec<PathBuf>,
    pub existing: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
    /// Directories found by the counting pass afterwards
    pub observed: usize,
}

impl DirTreeReport {
    /// Directories that exist locally after the pass
    pub fn present(&self) -> usize {
        self.created.len() + self.existing.len()
    }
}

/// Remote listing split by entry kind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadPlan {
    pub directories: Vec<RemotePath>,
    pub files: Vec<TransferItem>,
    /// Entries that are neither, skipped
    pub unknown: Vec<String>,
}

/// Runs whole upload, download and check-dirs batches for one session
pub struct BatchRunner<'a> {
    store: Arc<dyn RemoteStore>,
    executor: TransferExecutor,
    reporter: &'a SessionReporter,
}

impl<'a> BatchRunner<'a> {
    pub fn new(store: Arc<dyn RemoteStore>, retry: RetryPolicy, reporter: &'a SessionReporter) -> Self {
        let executor = TransferExecutor::new(store.clone(), retry);
        Self {
            store,
            executor,
            reporter,
        }
    }

    /// Upload the immediate children of `local_dir` into `remote_dir`.
    pub async fn run_upload(&self, local_dir: &Path, remote_dir: &RemotePath) -> SyncResult<BatchOutcome> {
        self.reporter.progress("Starting upload session");

        let items = enumerate_upload_items(local_dir, remote_dir)?;
        for item in items.iter().filter(|item| item.local_path.is_dir()) {
            self.reporter.report(
                Level::WARN,
                format_args!(
                    "{} is a directory; its contents are not uploaded",
                    item.local_path.display()
                ),
            );
        }
        self.reporter
            .progress(format_args!("There are {} files in total ...", items.len()));

        let mut outcome = BatchOutcome::new(Direction::Upload);
        for item in items {
            let size = std::fs::metadata(&item.local_path)
                .map(|m| bytesize::ByteSize(m.len()).to_string())
                .unwrap_or_else(|_| "?".to_string());
            self.reporter.progress(format_args!(
                "Uploading file: {} ({})",
                item.local_path.display(),
                size
            ));

            let result = self.executor.run(item, Direction::Upload).await;
            match &result {
                TransferOutcome::Success { item, .. } => {
                    self.reporter
                        .progress(format_args!("Uploaded file: {}", item.remote_path));
                }
                TransferOutcome::Failure { item, last_error } => {
                    self.reporter.report(
                        Level::ERROR,
                        format_args!(
                            "Failed to upload file: {} ({})",
                            item.local_path.display(),
                            last_error
                        ),
                    );
                }
            }
            outcome.record(result);
        }

        Ok(outcome)
    }

    /// Mirror `remote_dir` under `local_dir`: directories first, then files.
    pub async fn run_download(&self, local_dir: &Path, remote_dir: &RemotePath) -> SyncResult<BatchOutcome> {
        self.reporter.progress("Starting download session");

        let plan = self.plan_download(local_dir, remote_dir).await?;
        self.mirror_directories(local_dir, remote_dir, &plan.directories);

        self.reporter
            .progress(format_args!("Files to download: {}", plan.files.len()));

        let mut outcome = BatchOutcome::new(Direction::Download);
        for item in plan.files {
            self.reporter
                .progress(format_args!("Downloading: {}", item.remote_path));

            let result = self.executor.run(item, Direction::Download).await;
            match &result {
                TransferOutcome::Success { item, .. } => {
                    self.reporter
                        .progress(format_args!("Downloaded: {}", item.remote_path));
                }
                TransferOutcome::Failure { item, last_error } => {
                    self.reporter.report(
                        Level::ERROR,
                        format_args!("Error downloading file {}: {}", item.remote_path, last_error),
                    );
                }
            }
            outcome.record(result);
        }

        Ok(outcome)
    }

    /// Only recreate the remote directory tree locally.
    pub async fn check_dirs(&self, local_dir: &Path, remote_dir: &RemotePath) -> SyncResult<DirTreeReport> {
        let plan = self.plan_download(local_dir, remote_dir).await?;
        Ok(self.mirror_directories(local_dir, remote_dir, &plan.directories))
    }

    async fn plan_download(&self, local_dir: &Path, remote_dir: &RemotePath) -> SyncResult<DownloadPlan> {
        let entries = self
            .store
            .list(remote_dir)
            .await
            .map_err(|e| SyncError::listing(remote_dir.to_path_string(), e))?;

        let plan = partition_listing(&entries, local_dir);
        for entry in &plan.unknown {
            self.reporter.report(
                Level::WARN,
                format_args!("Skipping entry of unknown kind: {entry}"),
            );
        }
        Ok(plan)
    }

    fn mirror_directories(&self, local_dir: &Path, remote_dir: &RemotePath, dirs: &[RemotePath]) -> DirTreeReport {
        self.reporter.progress("Creating local folder structure...");

        let mut report = create_local_dir_tree(local_dir, dirs);
        for dir in &report.created {
            self.reporter
                .report(Level::DEBUG, format_args!("Created directory {}", dir.display()));
        }
        for (dir, err) in &report.failed {
            self.reporter.report(
                Level::ERROR,
                format_args!("Could not create directory {}: {}", dir.display(), err),
            );
        }

        report.observed = count_local_dirs(&remote_dir.to_local(local_dir));
        self.reporter.progress(format_args!(
            "Directories created: {} ({} already present, {} failed)",
            report.created.len(),
            report.existing.len(),
            report.failed.len()
        ));
        self.reporter
            .progress(format_args!("Directories checked: {}", report.observed));
        if report.observed < report.present() {
            self.reporter.report(
                Level::WARN,
                format_args!(
                    "Directory count mismatch: {} expected, {} found",
                    report.present(),
                    report.observed
                ),
            );
        }
        report
    }
}

/// Immediate children of `local_dir` matched by `*`, sorted.
///
/// Hidden files are not matched. Subdirectories are items like any other
/// child and are never walked into.
pub fn enumerate_upload_items(local_dir: &Path, remote_dir: &RemotePath) -> SyncResult<Vec<TransferItem>> {
    let listing_err = |message: String| SyncError::listing(local_dir.display().to_string(), message);

    if !local_dir.is_dir() {
        return Err(listing_err("not a directory".to_string()));
    }

    let escaped = Pattern::escape(&local_dir.to_string_lossy());
    let pattern = Path::new(&escaped).join("*");
    let options = MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: true,
    };

    let mut items = Vec::new();
    for path in glob::glob_with(&pattern.to_string_lossy(), options).map_err(|e| listing_err(e.to_string()))? {
        let path = path.map_err(|e| listing_err(e.to_string()))?;
        let Some(name) = path.file_name() else {
            continue;
        };
        let remote = remote_dir.join(name.to_string_lossy());
        items.push(TransferItem::new(path, remote));
    }

    Ok(items)
}

/// Split a remote listing into directories to create and files to fetch.
///
/// Each file maps onto `local_dir/<remote path>`. Repeated entries are kept once.
pub fn partition_listing(entries: &[ListingEntry], local_dir: &Path) -> DownloadPlan {
    let mut plan = DownloadPlan::default();
    let mut seen = HashSet::new();

    for entry in entries {
        let remote = entry.remote_path();
        match entry.kind() {
            EntryKind::Directory => {
                if seen.insert((EntryKind::Directory, remote.clone())) {
                    plan.directories.push(remote);
                }
            }
            EntryKind::File => {
                if seen.insert((EntryKind::File, remote.clone())) {
                    let local = remote.to_local(local_dir);
                    plan.files.push(TransferItem::new(local, remote));
                }
            }
            EntryKind::Unknown => plan.unknown.push(entry.path.clone()),
        }
    }

    plan
}

/// Create `base/<dir>` for every remote directory that is not there yet.
///
/// Running it again over an existing tree changes nothing and reports no
/// failures.
pub fn create_local_dir_tree(base: &Path, dirs: &[RemotePath]) -> DirTreeReport {
    let mut report = DirTreeReport::default();

    for dir in dirs {
        let local = dir.to_local(base);
        if local.is_dir() {
            report.existing.push(local);
            continue;
        }
        match std::fs::create_dir_all(&local) {
            Ok(()) => report.created.push(local),
            Err(source) => {
                let err = SyncError::DirectoryCreation {
                    path: local.clone(),
                    source,
                };
                report.failed.push((local, err.to_string()));
            }
        }
    }

    report
}

/// Number of directories under `root`, `root` included; 0 when absent.
pub fn count_local_dirs(root: &Path) -> usize {
    WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_dir())
        .count()
}
