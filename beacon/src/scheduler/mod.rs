//! Durable delayed-task scheduler
//!
//! One-shot tasks are persisted to the record store at schedule time, so
//! scheduled work survives process restarts. A worker loop polls for due
//! tasks and dispatches each to the single registered [`TaskHandler`].
//!
//! Delivery is at-least-once: a task is only removed after its handler
//! succeeds, so a handler failure or a crash mid-handler re-fires the task
//! on the next poll or after a restart. Overdue tasks found at startup fire
//! on the first poll — a misfire is never skipped.
//!
//! There is no cancel operation by design. Cancellation of effect is the
//! handler's job: the escalation handler checks the session cache and no-ops
//! when the entry is absent.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::store::{DelayedTask, SharedAlertStore, StoreError};

/// Error type for scheduler operations
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("handler error: {0}")]
    Handler(String),
}

/// Handler invoked when a scheduled task becomes due
#[async_trait]
pub trait TaskHandler: Send + Sync {
    /// Process a due task
    async fn handle(&self, task: DelayedTask) -> Result<(), SchedulerError>;
}

/// Shared reference to the scheduler
pub type SharedScheduler = Arc<DelayedTaskScheduler>;

/// Store-backed one-shot delayed-task scheduler
pub struct DelayedTaskScheduler {
    store: SharedAlertStore,
    poll_interval: Duration,
}

impl DelayedTaskScheduler {
    /// Create a scheduler over the given store
    pub fn new(store: SharedAlertStore, poll_interval: Duration) -> Self {
        Self {
            store,
            poll_interval,
        }
    }

    /// Create a shared reference to this scheduler
    pub fn shared(self) -> SharedScheduler {
        Arc::new(self)
    }

    /// Durably schedule a one-shot escalation check for an alert
    ///
    /// The task is persisted before this returns; a restart between schedule
    /// and fire does not lose it.
    pub fn schedule(&self, alert_id: &str, run_at: DateTime<Utc>) -> Result<(), SchedulerError> {
        let task = DelayedTask {
            task_id: alert_id.to_string(),
            alert_id: alert_id.to_string(),
            run_at,
        };
        self.store.put_task(&task)?;
        debug!(alert_id, run_at = %run_at, "scheduled escalation task");
        Ok(())
    }

    /// Dispatch every currently due task to the handler, returning how many
    /// completed
    ///
    /// A task whose handler fails stays in the store and re-fires on the
    /// next poll. The handler re-checks alert state itself, so a retry after
    /// the alert has settled is a no-op and the task is then removed.
    pub async fn drain_due(&self, handler: &Arc<dyn TaskHandler>) -> usize {
        let due = match self.store.due_tasks(Utc::now()) {
            Ok(due) => due,
            Err(e) => {
                warn!("failed to scan due tasks: {}", e);
                return 0;
            }
        };

        let mut completed = 0;
        for task in due {
            debug!(alert_id = %task.alert_id, "dispatching due task");
            if let Err(e) = handler.handle(task.clone()).await {
                warn!(alert_id = %task.alert_id, "task handler failed; task retained for retry: {}", e);
                continue;
            }
            // Removal happens after the handler so a crash mid-handler
            // re-fires the task on restart.
            if let Err(e) = self.store.remove_task(&task) {
                warn!(alert_id = %task.alert_id, "failed to remove completed task: {}", e);
            }
            completed += 1;
        }
        completed
    }

    /// Spawn the polling worker loop
    ///
    /// The first poll happens immediately, so tasks that came due while the
    /// process was down fire as soon as the worker starts.
    pub fn spawn_worker(self: &Arc<Self>, handler: Arc<dyn TaskHandler>) -> JoinHandle<()> {
        let scheduler = Arc::clone(self);
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(scheduler.poll_interval);
            loop {
                tick.tick().await;
                scheduler.drain_due(&handler).await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use std::sync::Mutex;
    use tempfile::tempdir;

    use crate::store::AlertStore;

    struct RecordingHandler {
        seen: Mutex<Vec<String>>,
        fail: bool,
    }

    impl RecordingHandler {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                seen: Mutex::new(Vec::new()),
                fail: false,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                seen: Mutex::new(Vec::new()),
                fail: true,
            })
        }

        fn seen(&self) -> Vec<String> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TaskHandler for RecordingHandler {
        async fn handle(&self, task: DelayedTask) -> Result<(), SchedulerError> {
            self.seen.lock().unwrap().push(task.alert_id.clone());
            if self.fail {
                Err(SchedulerError::Handler("boom".to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn test_scheduler() -> (SharedScheduler, SharedAlertStore, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let store = AlertStore::open(dir.path().join("test.db")).unwrap().shared();
        let scheduler =
            DelayedTaskScheduler::new(store.clone(), Duration::from_millis(20)).shared();
        (scheduler, store, dir)
    }

    #[tokio::test]
    async fn test_drain_fires_only_due_tasks() {
        let (scheduler, _store, _dir) = test_scheduler();
        let handler = RecordingHandler::new();

        scheduler
            .schedule("overdue", Utc::now() - ChronoDuration::seconds(5))
            .unwrap();
        scheduler
            .schedule("future", Utc::now() + ChronoDuration::seconds(300))
            .unwrap();

        let dyn_handler: Arc<dyn TaskHandler> = handler.clone();
        let fired = scheduler.drain_due(&dyn_handler).await;

        assert_eq!(fired, 1);
        assert_eq!(handler.seen(), vec!["overdue".to_string()]);
    }

    #[tokio::test]
    async fn test_fired_task_is_removed() {
        let (scheduler, store, _dir) = test_scheduler();
        let handler: Arc<dyn TaskHandler> = RecordingHandler::new();

        scheduler
            .schedule("a1", Utc::now() - ChronoDuration::seconds(1))
            .unwrap();

        assert_eq!(scheduler.drain_due(&handler).await, 1);
        assert!(store.due_tasks(Utc::now()).unwrap().is_empty());
        assert_eq!(scheduler.drain_due(&handler).await, 0);
    }

    #[tokio::test]
    async fn test_failed_task_retries_on_next_poll() {
        let (scheduler, store, _dir) = test_scheduler();
        let handler = RecordingHandler::failing();

        scheduler
            .schedule("a1", Utc::now() - ChronoDuration::seconds(1))
            .unwrap();

        let dyn_handler: Arc<dyn TaskHandler> = handler.clone();
        assert_eq!(scheduler.drain_due(&dyn_handler).await, 0);
        assert_eq!(store.due_tasks(Utc::now()).unwrap().len(), 1);

        // The next poll dispatches the same task again.
        assert_eq!(scheduler.drain_due(&dyn_handler).await, 0);
        assert_eq!(handler.seen(), vec!["a1".to_string(), "a1".to_string()]);
    }

    #[tokio::test]
    async fn test_overdue_task_fires_after_restart() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        {
            let store = AlertStore::open(&path).unwrap().shared();
            let scheduler = DelayedTaskScheduler::new(store, Duration::from_millis(20));
            scheduler
                .schedule("a1", Utc::now() - ChronoDuration::seconds(30))
                .unwrap();
            // Process "crashes" before the task fires.
        }

        let store = AlertStore::open(&path).unwrap().shared();
        let scheduler = DelayedTaskScheduler::new(store, Duration::from_millis(20)).shared();
        let handler = RecordingHandler::new();

        let dyn_handler: Arc<dyn TaskHandler> = handler.clone();
        assert_eq!(scheduler.drain_due(&dyn_handler).await, 1);
        assert_eq!(handler.seen(), vec!["a1".to_string()]);
    }

    #[tokio::test]
    async fn test_worker_loop_dispatches() {
        let (scheduler, _store, _dir) = test_scheduler();
        let handler = RecordingHandler::new();

        scheduler
            .schedule("a1", Utc::now() + ChronoDuration::milliseconds(40))
            .unwrap();

        let worker = scheduler.spawn_worker(handler.clone());
        tokio::time::sleep(Duration::from_millis(200)).await;
        worker.abort();

        assert_eq!(handler.seen(), vec!["a1".to_string()]);
    }
}
