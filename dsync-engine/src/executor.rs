//! Single-item transfer with bounded fixed-delay retry

use dsync_core::{
    Direction, RemoteStore, RetryPolicy, SyncError, SyncResult, TransferItem, TransferOutcome,
};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Moves one item between the local filesystem and the remote store
pub struct TransferExecutor {
    store: Arc<dyn RemoteStore>,
    policy: RetryPolicy,
}

impl TransferExecutor {
    pub fn new(store: Arc<dyn RemoteStore>, policy: RetryPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Transfer `item`, retrying failed attempts after a fixed pause.
    ///
    /// Returns the number of attempts used, or the error of the last attempt
    /// once the policy gives up. Every attempt repeats the same call.
    pub async fn attempt_transfer(&self, item: &TransferItem, direction: Direction) -> SyncResult<u32> {
        let path = direction.record_path(item);
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!("{} attempt {} for {}", direction.verb(), attempt, path);

            let err = match self.transfer_once(item, direction).await {
                Ok(()) => {
                    if attempt > 1 {
                        info!("{} of {} succeeded on attempt {}", direction.verb(), path, attempt);
                    }
                    return Ok(attempt);
                }
                Err(err) => err,
            };

            if !self.policy.should_retry(attempt, &err) {
                warn!(
                    "{} of {} failed after {} attempt(s): {}",
                    direction.verb(),
                    path,
                    attempt,
                    err
                );
                return Err(err);
            }

            warn!(
                "{} of {} failed (attempt {}/{}): {}. Trying again in {}s",
                direction.verb(),
                path,
                attempt,
                self.policy.max_attempts,
                err,
                self.policy.wait.as_secs()
            );
            tokio::time::sleep(self.policy.wait).await;
        }
    }

    /// Run [`attempt_transfer`](Self::attempt_transfer) and classify the result.
    pub async fn run(&self, item: TransferItem, direction: Direction) -> TransferOutcome {
        match self.attempt_transfer(&item, direction).await {
            Ok(attempts) => TransferOutcome::Success { item, attempts },
            Err(err) => TransferOutcome::Failure {
                item,
                last_error: err.to_string(),
            },
        }
    }

    /// One store call. A panic inside the store becomes an error.
    async fn transfer_once(&self, item: &TransferItem, direction: Direction) -> SyncResult<()> {
        let call = async {
            match direction {
                Direction::Upload => self.store.put(&item.local_path, &item.remote_path).await,
                Direction::Download => self.store.get(&item.remote_path, &item.local_path).await,
            }
        };

        match AssertUnwindSafe(call).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => Err(SyncError::Transfer {
                path: direction.record_path(item),
                message: format!("store panicked: {}", panic_message(payload.as_ref())),
            }),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Script, ScriptedStore};
    use dsync_core::RemotePath;
    use std::time::Duration;
    use tokio::time::Instant;

    const WAIT: Duration = Duration::from_secs(600);

    fn download_item() -> TransferItem {
        TransferItem::new("./output/c.txt", RemotePath::new("/output/c.txt"))
    }

    fn executor(store: Arc<ScriptedStore>, policy: RetryPolicy) -> TransferExecutor {
        TransferExecutor::new(store, policy)
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_transient_failures() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("output")).unwrap();
        let item = TransferItem::new(dir.path().join("output/c.txt"), RemotePath::new("/output/c.txt"));

        let store = Arc::new(ScriptedStore::new().script("/output/c.txt", Script::FailTimes(3)));
        let exec = executor(store.clone(), RetryPolicy::new(6, WAIT));

        let started = Instant::now();
        let attempts = exec.attempt_transfer(&item, Direction::Download).await.unwrap();

        assert_eq!(attempts, 4);
        assert_eq!(store.transfer_calls(), 4);
        assert_eq!(started.elapsed(), WAIT * 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts_with_fixed_delay() {
        let store = Arc::new(ScriptedStore::new().script("/output/c.txt", Script::AlwaysFail));
        let exec = executor(store.clone(), RetryPolicy::default());

        let started = Instant::now();
        let err = exec
            .attempt_transfer(&download_item(), Direction::Download)
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::Network(_)));
        assert_eq!(store.transfer_calls(), 6);
        // Five pauses between six attempts, none after the last
        assert_eq!(started.elapsed(), WAIT * 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_records_failure_with_last_error() {
        let store = Arc::new(ScriptedStore::new().script("/output/c.txt", Script::AlwaysFail));
        let exec = executor(store, RetryPolicy::new(2, WAIT));

        let outcome = exec.run(download_item(), Direction::Download).await;
        match outcome {
            TransferOutcome::Failure { item, last_error } => {
                assert_eq!(item, download_item());
                assert!(last_error.contains("remote unavailable"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_panicking_store_becomes_failure() {
        let store = Arc::new(ScriptedStore::new().script("/output/c.txt", Script::Panic));
        let exec = executor(store.clone(), RetryPolicy::new(2, Duration::ZERO));

        let err = exec
            .attempt_transfer(&download_item(), Direction::Download)
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::Transfer { ref message, .. } if message.contains("store blew up")));
        assert_eq!(store.transfer_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fail_fast_does_not_retry_permanent_errors() {
        let store = Arc::new(ScriptedStore::new().script("/output/c.txt", Script::Missing));
        let exec = executor(store.clone(), RetryPolicy::default().fail_fast());

        let started = Instant::now();
        let err = exec
            .attempt_transfer(&download_item(), Direction::Download)
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::NotFound(_)));
        assert_eq!(store.transfer_calls(), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_upload_calls_put_once_on_success() {
        let store = Arc::new(ScriptedStore::new());
        let exec = executor(store.clone(), RetryPolicy::default());
        let item = TransferItem::new("data/a.csv", RemotePath::new("/output/a.csv"));

        let outcome = exec.run(item, Direction::Upload).await;
        assert!(matches!(outcome, TransferOutcome::Success { attempts: 1, .. }));
        assert_eq!(
            store.calls(),
            vec![crate::test_support::Call::Put("data/a.csv".into(), "/output/a.csv".into())]
        );
    }
}
