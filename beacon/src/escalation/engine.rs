//! Escalation engine — alert lifecycle orchestration
//!
//! Drives every alert through the pipeline: trigger fans out immediate
//! pushes, arms the session cache and schedules the escalation check;
//! resolve settles the alert if it wins the race; the escalation check
//! consults the cache and, finding the session still live, escalates and
//! notifies every contact durably.
//!
//! The engine never decides the resolve-versus-escalate race itself. Both
//! paths funnel into the store's conditional transition, which admits
//! exactly one winner per alert.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::cache::{session_key, CacheError, SessionCache, SessionSnapshot};
use crate::directory::SharedDirectory;
use crate::notify::{AlertPush, DurableChannel, EscalationNotice, SharedFanout};
use crate::scheduler::{SchedulerError, SharedScheduler, TaskHandler};
use crate::store::{
    AlertId, AlertRecord, AlertStatus, Channel, DelayedTask, NotificationLogEntry,
    SharedAlertStore, StoreError, SubjectId,
};

/// Trigger-time location of the subject
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

/// Configuration for the escalation engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How long a pending alert may go unresolved before escalating
    pub grace_period: Duration,
    /// How often the scheduler worker polls for due escalation checks
    pub poll_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            grace_period: Duration::from_secs(180),
            poll_interval: Duration::from_millis(500),
        }
    }
}

/// Error type for engine operations
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Subject {0} is not registered")]
    SubjectNotFound(SubjectId),

    #[error("Alert {0} does not exist")]
    AlertNotFound(AlertId),

    #[error("Subject {subject_id} may not resolve alert {alert_id}")]
    NotAuthorized {
        subject_id: SubjectId,
        alert_id: AlertId,
    },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Failed to schedule escalation for alert {alert_id}: {source}")]
    ScheduleFailed {
        alert_id: AlertId,
        source: SchedulerError,
    },
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// One delivered notification in a history response
///
/// The recipient is resolved to their durable delivery address; recipients
/// without one (or no longer registered) fall back to their subject id.
/// Internal log-entry ids do not leave the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationView {
    pub recipient_address: String,
    pub channel: Channel,
    pub sent_at: DateTime<Utc>,
}

/// One alert with its delivery history, as returned by [`EscalationEngine::history`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertHistoryEntry {
    pub alert: AlertRecord,
    pub notifications: Vec<NotificationView>,
}

/// Shared reference to the engine
pub type SharedEngine = Arc<EscalationEngine>;

/// The escalation engine
pub struct EscalationEngine {
    store: SharedAlertStore,
    cache: Arc<dyn SessionCache>,
    scheduler: SharedScheduler,
    fanout: SharedFanout,
    durable: Arc<dyn DurableChannel>,
    directory: SharedDirectory,
    config: EngineConfig,
}

impl EscalationEngine {
    /// Create an engine over the given collaborators
    pub fn new(
        store: SharedAlertStore,
        cache: Arc<dyn SessionCache>,
        scheduler: SharedScheduler,
        fanout: SharedFanout,
        durable: Arc<dyn DurableChannel>,
        directory: SharedDirectory,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            cache,
            scheduler,
            fanout,
            durable,
            directory,
            config,
        }
    }

    /// Create a shared reference to this engine
    pub fn shared(self) -> SharedEngine {
        Arc::new(self)
    }

    /// Raise a distress alert for a subject
    ///
    /// Creates a pending alert, arms its session entry for the grace period,
    /// supersedes any older pending alerts from the same subject, pushes
    /// immediate notifications to the subject's contacts and schedules the
    /// escalation check.
    pub async fn trigger(
        &self,
        subject_id: &str,
        location: Location,
    ) -> EngineResult<AlertRecord> {
        let subject = self
            .directory
            .subject(subject_id)?
            .ok_or_else(|| EngineError::SubjectNotFound(subject_id.to_string()))?;

        // A newer cry for help replaces any older unresolved one.
        for stale in self.store.pending_alerts_for_subject(subject_id)? {
            let moved =
                self.store
                    .transition_alert(&stale.id, AlertStatus::Pending, AlertStatus::Triggered)?;
            if moved {
                debug!(alert_id = %stale.id, "Superseded older pending alert");
            }
        }

        let alert = AlertRecord::new(subject_id, location.latitude, location.longitude);
        self.store.put_alert(&alert)?;

        let snapshot = SessionSnapshot {
            alert_id: alert.id.clone(),
            subject_id: subject_id.to_string(),
            latitude: location.latitude,
            longitude: location.longitude,
            created_at: alert.created_at,
        };
        self.cache
            .put(&session_key(&alert.id), &snapshot, self.config.grace_period)
            .await?;

        // Immediate fan-out is best-effort; a disconnected contact misses
        // the push but still gets the durable notice on escalation.
        let contacts = self.directory.contacts_of(subject_id)?;
        for contact in &contacts {
            let push = AlertPush {
                recipient_id: contact.id.clone(),
                alert_id: alert.id.clone(),
                subject_id: subject_id.to_string(),
                subject_name: subject.display_name.clone(),
                latitude: location.latitude,
                longitude: location.longitude,
                raised_at: alert.created_at,
            };
            self.fanout.push(push);
            let entry = NotificationLogEntry::new(&alert.id, &contact.id, Channel::Immediate);
            self.store.append_notification(&entry)?;
        }

        let run_at = alert.created_at
            + ChronoDuration::from_std(self.config.grace_period)
                .unwrap_or_else(|_| ChronoDuration::seconds(180));
        if let Err(e) = self.scheduler.schedule(&alert.id, run_at) {
            // Without the scheduled check the alert would silently never
            // escalate, so the caller must know.
            error!(alert_id = %alert.id, "Failed to schedule escalation check: {}", e);
            return Err(EngineError::ScheduleFailed {
                alert_id: alert.id.clone(),
                source: e,
            });
        }

        info!(
            alert_id = %alert.id,
            subject_id,
            contacts = contacts.len(),
            grace_secs = self.config.grace_period.as_secs(),
            "Alert raised"
        );
        Ok(alert)
    }

    /// Mark an alert as resolved by a human
    ///
    /// The caller must be the alert's owner or one of the owner's contacts.
    /// If escalation already won the race the record is returned unchanged;
    /// the store's conditional transition is the arbiter, so a late resolve
    /// never rewrites an escalated alert.
    pub async fn resolve(&self, caller_id: &str, alert_id: &str) -> EngineResult<AlertRecord> {
        let alert = self
            .store
            .get_alert(alert_id)?
            .ok_or_else(|| EngineError::AlertNotFound(alert_id.to_string()))?;

        let authorized =
            caller_id == alert.subject_id || self.directory.is_contact(&alert.subject_id, caller_id)?;
        if !authorized {
            return Err(EngineError::NotAuthorized {
                subject_id: caller_id.to_string(),
                alert_id: alert_id.to_string(),
            });
        }

        let resolved =
            self.store
                .transition_alert(alert_id, AlertStatus::Pending, AlertStatus::Resolved)?;
        if resolved {
            info!(alert_id, caller_id, "Alert resolved");
        } else {
            debug!(alert_id, status = %alert.status, "Resolve was a no-op; alert already settled");
        }

        // Best-effort: a lost delete only costs the escalation check a
        // redundant status lookup before it no-ops.
        let existed = self.cache.delete(&session_key(alert_id)).await;
        debug!(alert_id, existed, "Session entry cleared");

        self.store
            .get_alert(alert_id)?
            .ok_or_else(|| EngineError::AlertNotFound(alert_id.to_string()))
    }

    /// Run the escalation check for an alert whose grace period elapsed
    ///
    /// Returns whether the alert actually escalated. An absent session
    /// entry means the alert was resolved (or the entry expired after a
    /// restart gap) and the check is a no-op.
    pub async fn escalate(&self, alert_id: &str) -> EngineResult<bool> {
        let key = session_key(alert_id);
        let Some(snapshot) = self.cache.get(&key).await else {
            debug!(alert_id, "Session entry absent; skipping escalation");
            return Ok(false);
        };

        let escalated =
            self.store
                .transition_alert(alert_id, AlertStatus::Pending, AlertStatus::Escalated)?;
        if !escalated {
            // Resolve won the race after our cache read, or the alert was
            // superseded. Nothing left to do but drop the stale entry.
            debug!(alert_id, "Alert no longer pending; skipping escalation");
            self.cache.delete(&key).await;
            return Ok(false);
        }
        self.cache.delete(&key).await;

        let subject = self
            .directory
            .subject(&snapshot.subject_id)?
            .ok_or_else(|| EngineError::SubjectNotFound(snapshot.subject_id.clone()))?;
        let notice = EscalationNotice::compose(
            alert_id,
            &subject,
            snapshot.latitude,
            snapshot.longitude,
            snapshot.created_at,
        );

        let contacts = self.directory.contacts_of(&snapshot.subject_id)?;
        let mut delivered = 0usize;
        for contact in &contacts {
            match self.durable.deliver(contact, &notice).await {
                Ok(()) => {
                    let entry =
                        NotificationLogEntry::new(alert_id, &contact.id, Channel::Durable);
                    self.store.append_notification(&entry)?;
                    delivered += 1;
                }
                Err(e) => {
                    warn!(alert_id, recipient_id = %contact.id, "Durable notice failed: {}", e);
                }
            }
        }

        info!(
            alert_id,
            subject_id = %snapshot.subject_id,
            delivered,
            contacts = contacts.len(),
            "Alert escalated"
        );
        Ok(true)
    }

    /// Fetch a subject's alerts, newest first, each with its delivery log
    pub fn history(&self, subject_id: &str) -> EngineResult<Vec<AlertHistoryEntry>> {
        let alerts = self.store.alerts_for_subject(subject_id)?;
        let mut entries = Vec::with_capacity(alerts.len());
        for alert in alerts {
            let mut notifications = Vec::new();
            for log in self.store.notifications_for_alert(&alert.id)? {
                let recipient_address = self
                    .directory
                    .subject(&log.recipient_id)?
                    .and_then(|s| s.delivery_address)
                    .unwrap_or_else(|| log.recipient_id.clone());
                notifications.push(NotificationView {
                    recipient_address,
                    channel: log.channel,
                    sent_at: log.sent_at,
                });
            }
            entries.push(AlertHistoryEntry {
                alert,
                notifications,
            });
        }
        Ok(entries)
    }

    /// Spawn the scheduler worker that runs due escalation checks
    pub fn start_worker(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let handler: Arc<dyn TaskHandler> = Arc::new(EscalationTaskHandler {
            engine: Arc::clone(self),
        });
        self.scheduler.spawn_worker(handler)
    }
}

/// Bridges due scheduler tasks into the engine's escalation check
pub struct EscalationTaskHandler {
    engine: SharedEngine,
}

impl EscalationTaskHandler {
    /// Create a handler dispatching into the given engine
    pub fn new(engine: SharedEngine) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl TaskHandler for EscalationTaskHandler {
    async fn handle(&self, task: DelayedTask) -> Result<(), SchedulerError> {
        self.engine
            .escalate(&task.alert_id)
            .await
            .map(|_| ())
            .map_err(|e| SchedulerError::Handler(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::tempdir;

    use crate::cache::MokaSessionCache;
    use crate::directory::StoreDirectory;
    use crate::notify::{FanoutChannel, NotifyError, NotifyResult};
    use crate::scheduler::DelayedTaskScheduler;
    use crate::store::{AlertStore, ContactEdge, Subject};

    /// Durable channel that records deliveries instead of sending them
    struct RecordingDurable {
        deliveries: Mutex<Vec<(SubjectId, AlertId)>>,
    }

    impl RecordingDurable {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                deliveries: Mutex::new(Vec::new()),
            })
        }

        fn deliveries(&self) -> Vec<(SubjectId, AlertId)> {
            self.deliveries.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DurableChannel for RecordingDurable {
        async fn deliver(
            &self,
            recipient: &Subject,
            notice: &EscalationNotice,
        ) -> NotifyResult<()> {
            if recipient.delivery_address.is_none() {
                return Err(NotifyError::NoAddress(recipient.id.clone()));
            }
            self.deliveries
                .lock()
                .unwrap()
                .push((recipient.id.clone(), notice.alert_id.clone()));
            Ok(())
        }
    }

    struct Fixture {
        engine: SharedEngine,
        store: SharedAlertStore,
        cache: Arc<MokaSessionCache>,
        durable: Arc<RecordingDurable>,
        fanout: SharedFanout,
        _dir: tempfile::TempDir,
    }

    fn subject(id: &str, name: &str) -> Subject {
        Subject {
            id: id.to_string(),
            display_name: name.to_string(),
            delivery_address: Some(format!("{}@example.com", id)),
        }
    }

    fn fixture_with_grace(grace: Duration) -> Fixture {
        let dir = tempdir().unwrap();
        let store = AlertStore::open(dir.path().join("test.db")).unwrap().shared();
        let cache = MokaSessionCache::new(64).shared();
        let scheduler =
            DelayedTaskScheduler::new(store.clone(), Duration::from_millis(20)).shared();
        let fanout = FanoutChannel::new().shared();
        let durable = RecordingDurable::new();

        let directory = StoreDirectory::new(store.clone());
        directory.register_subject(&subject("owner", "Ada")).unwrap();
        directory.register_subject(&subject("c1", "Grace")).unwrap();
        directory.register_subject(&subject("c2", "Edsger")).unwrap();
        directory.register_subject(&subject("stranger", "Eve")).unwrap();
        directory.add_contact("owner", "c1").unwrap();
        directory.add_contact("owner", "c2").unwrap();

        let engine = EscalationEngine::new(
            store.clone(),
            cache.clone() as Arc<dyn SessionCache>,
            scheduler,
            fanout.clone(),
            durable.clone() as Arc<dyn DurableChannel>,
            directory.shared() as SharedDirectory,
            EngineConfig {
                grace_period: grace,
                poll_interval: Duration::from_millis(20),
            },
        )
        .shared();

        Fixture {
            engine,
            store,
            cache,
            durable,
            fanout,
            _dir: dir,
        }
    }

    fn fixture() -> Fixture {
        fixture_with_grace(Duration::from_secs(60))
    }

    fn here() -> Location {
        Location {
            latitude: 40.7128,
            longitude: -74.006,
        }
    }

    #[tokio::test]
    async fn test_trigger_creates_pending_alert_with_session() {
        let f = fixture();
        let alert = f.engine.trigger("owner", here()).await.unwrap();

        let stored = f.store.get_alert(&alert.id).unwrap().unwrap();
        assert_eq!(stored.status, AlertStatus::Pending);

        let snap = f.cache.get(&session_key(&alert.id)).await.unwrap();
        assert_eq!(snap.alert_id, alert.id);
        assert_eq!(snap.subject_id, "owner");

        // Escalation check is armed.
        let due = f
            .store
            .due_tasks(chrono::Utc::now() + ChronoDuration::seconds(120))
            .unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].alert_id, alert.id);
    }

    #[tokio::test]
    async fn test_trigger_logs_immediate_notifications() {
        let f = fixture();
        let alert = f.engine.trigger("owner", here()).await.unwrap();

        let log = f.store.notifications_for_alert(&alert.id).unwrap();
        assert_eq!(log.len(), 2);
        assert!(log.iter().all(|e| e.channel == Channel::Immediate));
        let recipients: Vec<&str> = log.iter().map(|e| e.recipient_id.as_str()).collect();
        assert!(recipients.contains(&"c1"));
        assert!(recipients.contains(&"c2"));
    }

    #[tokio::test]
    async fn test_trigger_pushes_to_contact_topics() {
        let f = fixture();
        let mut topic = f.fanout.subscribe_topic("c1");

        let alert = f.engine.trigger("owner", here()).await.unwrap();

        let push = topic.recv().await.unwrap();
        assert_eq!(push.alert_id, alert.id);
        assert_eq!(push.subject_name, "Ada");
    }

    #[tokio::test]
    async fn test_trigger_unknown_subject() {
        let f = fixture();
        let err = f.engine.trigger("ghost", here()).await.unwrap_err();
        assert!(matches!(err, EngineError::SubjectNotFound(id) if id == "ghost"));
    }

    #[tokio::test]
    async fn test_new_trigger_supersedes_pending_alert() {
        let f = fixture();
        let first = f.engine.trigger("owner", here()).await.unwrap();
        let second = f.engine.trigger("owner", here()).await.unwrap();

        let first_stored = f.store.get_alert(&first.id).unwrap().unwrap();
        let second_stored = f.store.get_alert(&second.id).unwrap().unwrap();
        assert_eq!(first_stored.status, AlertStatus::Triggered);
        assert_eq!(second_stored.status, AlertStatus::Pending);
    }

    #[tokio::test]
    async fn test_trigger_with_no_contacts() {
        let f = fixture();
        let alert = f.engine.trigger("stranger", here()).await.unwrap();

        let stored = f.store.get_alert(&alert.id).unwrap().unwrap();
        assert_eq!(stored.status, AlertStatus::Pending);
        assert!(f.store.notifications_for_alert(&alert.id).unwrap().is_empty());

        // Escalation still happens, just with nobody to notify.
        assert!(f.engine.escalate(&alert.id).await.unwrap());
        assert_eq!(
            f.store.get_alert(&alert.id).unwrap().unwrap().status,
            AlertStatus::Escalated
        );
        assert!(f.durable.deliveries().is_empty());
    }

    #[tokio::test]
    async fn test_resolve_by_owner() {
        let f = fixture();
        let alert = f.engine.trigger("owner", here()).await.unwrap();

        let resolved = f.engine.resolve("owner", &alert.id).await.unwrap();
        assert_eq!(resolved.status, AlertStatus::Resolved);
        assert!(f.cache.get(&session_key(&alert.id)).await.is_none());
    }

    #[tokio::test]
    async fn test_resolve_by_contact() {
        let f = fixture();
        let alert = f.engine.trigger("owner", here()).await.unwrap();

        let resolved = f.engine.resolve("c1", &alert.id).await.unwrap();
        assert_eq!(resolved.status, AlertStatus::Resolved);
    }

    #[tokio::test]
    async fn test_resolve_by_stranger_rejected() {
        let f = fixture();
        let alert = f.engine.trigger("owner", here()).await.unwrap();

        let err = f.engine.resolve("stranger", &alert.id).await.unwrap_err();
        assert!(matches!(err, EngineError::NotAuthorized { .. }));

        let stored = f.store.get_alert(&alert.id).unwrap().unwrap();
        assert_eq!(stored.status, AlertStatus::Pending);
    }

    #[tokio::test]
    async fn test_resolve_unknown_alert() {
        let f = fixture();
        let err = f.engine.resolve("owner", "no-such-alert").await.unwrap_err();
        assert!(matches!(err, EngineError::AlertNotFound(_)));
    }

    #[tokio::test]
    async fn test_escalation_after_resolve_is_noop() {
        let f = fixture();
        let alert = f.engine.trigger("owner", here()).await.unwrap();
        f.engine.resolve("owner", &alert.id).await.unwrap();

        assert!(!f.engine.escalate(&alert.id).await.unwrap());
        let stored = f.store.get_alert(&alert.id).unwrap().unwrap();
        assert_eq!(stored.status, AlertStatus::Resolved);
        assert!(f.durable.deliveries().is_empty());
    }

    #[tokio::test]
    async fn test_escalation_with_live_session() {
        let f = fixture();
        let alert = f.engine.trigger("owner", here()).await.unwrap();

        assert!(f.engine.escalate(&alert.id).await.unwrap());

        let stored = f.store.get_alert(&alert.id).unwrap().unwrap();
        assert_eq!(stored.status, AlertStatus::Escalated);

        let deliveries = f.durable.deliveries();
        assert_eq!(deliveries.len(), 2);
        assert!(deliveries.iter().all(|(_, aid)| *aid == alert.id));

        let durable_entries: Vec<_> = f
            .store
            .notifications_for_alert(&alert.id)
            .unwrap()
            .into_iter()
            .filter(|e| e.channel == Channel::Durable)
            .collect();
        assert_eq!(durable_entries.len(), 2);
    }

    #[tokio::test]
    async fn test_escalation_is_idempotent() {
        let f = fixture();
        let alert = f.engine.trigger("owner", here()).await.unwrap();

        assert!(f.engine.escalate(&alert.id).await.unwrap());
        assert!(!f.engine.escalate(&alert.id).await.unwrap());
        assert_eq!(f.durable.deliveries().len(), 2);
    }

    #[tokio::test]
    async fn test_resolve_after_escalation_keeps_escalated_status() {
        let f = fixture();
        let alert = f.engine.trigger("owner", here()).await.unwrap();
        f.engine.escalate(&alert.id).await.unwrap();

        let after = f.engine.resolve("owner", &alert.id).await.unwrap();
        assert_eq!(after.status, AlertStatus::Escalated);
    }

    #[tokio::test]
    async fn test_stale_session_without_pending_record() {
        let f = fixture();
        let alert = f.engine.trigger("owner", here()).await.unwrap();

        // Record settles but the cache delete is lost.
        f.store
            .transition_alert(&alert.id, AlertStatus::Pending, AlertStatus::Resolved)
            .unwrap();

        assert!(!f.engine.escalate(&alert.id).await.unwrap());
        assert!(f.durable.deliveries().is_empty());
        // The stale entry was dropped during the check.
        assert!(f.cache.get(&session_key(&alert.id)).await.is_none());
    }

    #[tokio::test]
    async fn test_history_newest_first_with_notifications() {
        let f = fixture();
        let first = f.engine.trigger("owner", here()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        let second = f.engine.trigger("owner", here()).await.unwrap();

        let history = f.engine.history("owner").unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].alert.id, second.id);
        assert_eq!(history[1].alert.id, first.id);
        assert_eq!(history[0].notifications.len(), 2);
    }

    #[tokio::test]
    async fn test_history_round_trip_after_resolve() {
        let f = fixture();
        let alert = f.engine.trigger("owner", here()).await.unwrap();
        f.engine.resolve("owner", &alert.id).await.unwrap();
        assert!(!f.engine.escalate(&alert.id).await.unwrap());

        let history = f.engine.history("owner").unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].alert.status, AlertStatus::Resolved);

        // Only the immediate pushes from trigger time; no durable rows.
        let notifications = &history[0].notifications;
        assert_eq!(notifications.len(), 2);
        assert!(notifications.iter().all(|n| n.channel == Channel::Immediate));

        // Recipients come back as their delivery addresses.
        let addresses: Vec<&str> = notifications
            .iter()
            .map(|n| n.recipient_address.as_str())
            .collect();
        assert!(addresses.contains(&"c1@example.com"));
        assert!(addresses.contains(&"c2@example.com"));
    }

    #[tokio::test]
    async fn test_history_falls_back_to_id_without_address() {
        let f = fixture();
        f.store
            .put_subject(&Subject {
                id: "c3".to_string(),
                display_name: "Alan".to_string(),
                delivery_address: None,
            })
            .unwrap();
        f.store
            .put_contact(&ContactEdge {
                owner_id: "owner".to_string(),
                contact_user_id: "c3".to_string(),
            })
            .unwrap();

        f.engine.trigger("owner", here()).await.unwrap();

        let history = f.engine.history("owner").unwrap();
        let addresses: Vec<&str> = history[0]
            .notifications
            .iter()
            .map(|n| n.recipient_address.as_str())
            .collect();
        assert!(addresses.contains(&"c3"));
    }

    #[tokio::test]
    async fn test_worker_escalates_unresolved_alert() {
        let f = fixture_with_grace(Duration::from_millis(100));
        let alert = f.engine.trigger("owner", here()).await.unwrap();

        let worker = f.engine.start_worker();
        tokio::time::sleep(Duration::from_millis(400)).await;
        worker.abort();

        let stored = f.store.get_alert(&alert.id).unwrap().unwrap();
        assert_eq!(stored.status, AlertStatus::Escalated);
        assert_eq!(f.durable.deliveries().len(), 2);
    }

    #[tokio::test]
    async fn test_worker_skips_resolved_alert() {
        let f = fixture_with_grace(Duration::from_millis(100));
        let alert = f.engine.trigger("owner", here()).await.unwrap();
        f.engine.resolve("owner", &alert.id).await.unwrap();

        let worker = f.engine.start_worker();
        tokio::time::sleep(Duration::from_millis(400)).await;
        worker.abort();

        let stored = f.store.get_alert(&alert.id).unwrap().unwrap();
        assert_eq!(stored.status, AlertStatus::Resolved);
        assert!(f.durable.deliveries().is_empty());
    }
}
