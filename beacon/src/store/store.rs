//! RocksDB-backed record store for alerts, notification logs and tasks
//!
//! Provides persistent storage with column families for logical data
//! separation. Values are serialized as JSON for debuggability. Alert status
//! changes go through [`AlertStore::transition_alert`], a compare-and-set
//! executed under the store's exclusive write lock, so at most one of a
//! concurrent resolve/escalate pair can win.

use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use rocksdb::{ColumnFamilyDescriptor, IteratorMode, Options, DB};
use serde::{de::DeserializeOwned, Serialize};

use super::schema::{self, ALL_CFS};
use super::types::*;

/// Error type for record store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("RocksDB error: {0}")]
    RocksDb(#[from] rocksdb::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Key not found: {0}")]
    NotFound(String),

    #[error("Lock poisoned")]
    LockPoisoned,

    #[error("Column family not found: {0}")]
    ColumnFamilyNotFound(String),
}

/// Result type for record store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Shared reference to AlertStore
pub type SharedAlertStore = Arc<AlertStore>;

/// RocksDB-backed persistent record store
pub struct AlertStore {
    db: RwLock<DB>,
    path: PathBuf,
}

impl AlertStore {
    /// Open or create a record store at the given path
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<ColumnFamilyDescriptor> = ALL_CFS
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()))
            .collect();

        let db = DB::open_cf_descriptors(&opts, &path, cf_descriptors)?;

        Ok(Self {
            db: RwLock::new(db),
            path,
        })
    }

    /// Create a shared reference to this store
    pub fn shared(self) -> SharedAlertStore {
        Arc::new(self)
    }

    /// Get the database path
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    // =========================================================================
    // Generic operations
    // =========================================================================

    /// Store a value in a column family
    fn put<T: Serialize>(&self, cf_name: &str, key: &str, value: &T) -> StoreResult<()> {
        let db = self.db.read().map_err(|_| StoreError::LockPoisoned)?;
        let cf = db
            .cf_handle(cf_name)
            .ok_or_else(|| StoreError::ColumnFamilyNotFound(cf_name.to_string()))?;

        let bytes =
            serde_json::to_vec(value).map_err(|e| StoreError::Serialization(e.to_string()))?;

        db.put_cf(&cf, key.as_bytes(), bytes)?;
        Ok(())
    }

    /// Get a value from a column family
    fn get<T: DeserializeOwned>(&self, cf_name: &str, key: &str) -> StoreResult<Option<T>> {
        let db = self.db.read().map_err(|_| StoreError::LockPoisoned)?;
        let cf = db
            .cf_handle(cf_name)
            .ok_or_else(|| StoreError::ColumnFamilyNotFound(cf_name.to_string()))?;

        match db.get_cf(&cf, key.as_bytes())? {
            Some(bytes) => {
                let value = serde_json::from_slice(&bytes)
                    .map_err(|e| StoreError::Deserialization(e.to_string()))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Delete a value from a column family
    fn delete(&self, cf_name: &str, key: &str) -> StoreResult<()> {
        let db = self.db.read().map_err(|_| StoreError::LockPoisoned)?;
        let cf = db
            .cf_handle(cf_name)
            .ok_or_else(|| StoreError::ColumnFamilyNotFound(cf_name.to_string()))?;

        db.delete_cf(&cf, key.as_bytes())?;
        Ok(())
    }

    /// List all keys with a prefix in a column family
    fn list_keys(&self, cf_name: &str, prefix: &str) -> StoreResult<Vec<String>> {
        let db = self.db.read().map_err(|_| StoreError::LockPoisoned)?;
        let cf = db
            .cf_handle(cf_name)
            .ok_or_else(|| StoreError::ColumnFamilyNotFound(cf_name.to_string()))?;

        let mut keys = Vec::new();
        let iter = db.prefix_iterator_cf(&cf, prefix.as_bytes());

        for result in iter {
            let (key, _) = result?;
            if let Ok(key_str) = String::from_utf8(key.to_vec()) {
                if key_str.starts_with(prefix) {
                    keys.push(key_str);
                } else {
                    break; // Prefix no longer matches
                }
            }
        }

        Ok(keys)
    }

    // =========================================================================
    // Alert operations
    // =========================================================================

    /// Store an alert record
    pub fn put_alert(&self, alert: &AlertRecord) -> StoreResult<()> {
        let key = schema::keys::alert(&alert.id);
        self.put(schema::CF_ALERTS, &key, alert)
    }

    /// Get an alert record by ID
    pub fn get_alert(&self, alert_id: &str) -> StoreResult<Option<AlertRecord>> {
        let key = schema::keys::alert(alert_id);
        self.get(schema::CF_ALERTS, &key)
    }

    /// Atomically transition an alert's status, but only if its current
    /// status matches `expected`.
    ///
    /// Returns `Ok(true)` when the transition applied and `Ok(false)` when
    /// the record was no longer in the expected status (another writer won).
    /// The compare and the set run under the store's exclusive write lock,
    /// never as a read-then-write pair in the caller.
    pub fn transition_alert(
        &self,
        alert_id: &str,
        expected: AlertStatus,
        to: AlertStatus,
    ) -> StoreResult<bool> {
        let db = self.db.write().map_err(|_| StoreError::LockPoisoned)?;
        let cf = db
            .cf_handle(schema::CF_ALERTS)
            .ok_or_else(|| StoreError::ColumnFamilyNotFound(schema::CF_ALERTS.to_string()))?;

        let key = schema::keys::alert(alert_id);
        let bytes = db
            .get_cf(&cf, key.as_bytes())?
            .ok_or_else(|| StoreError::NotFound(key.clone()))?;

        let mut alert: AlertRecord = serde_json::from_slice(&bytes)
            .map_err(|e| StoreError::Deserialization(e.to_string()))?;

        if alert.status != expected {
            return Ok(false);
        }

        alert.status = to;
        let updated =
            serde_json::to_vec(&alert).map_err(|e| StoreError::Serialization(e.to_string()))?;
        db.put_cf(&cf, key.as_bytes(), updated)?;
        Ok(true)
    }

    /// All alerts raised by a subject, newest first
    pub fn alerts_for_subject(&self, subject_id: &str) -> StoreResult<Vec<AlertRecord>> {
        let keys = self.list_keys(schema::CF_ALERTS, "alert:")?;

        let mut alerts: Vec<AlertRecord> = keys
            .iter()
            .filter_map(|key| self.get::<AlertRecord>(schema::CF_ALERTS, key).ok()?)
            .filter(|a| a.subject_id == subject_id)
            .collect();

        alerts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(alerts)
    }

    /// Pending alerts raised by a subject
    pub fn pending_alerts_for_subject(&self, subject_id: &str) -> StoreResult<Vec<AlertRecord>> {
        Ok(self
            .alerts_for_subject(subject_id)?
            .into_iter()
            .filter(|a| a.status == AlertStatus::Pending)
            .collect())
    }

    // =========================================================================
    // Notification log operations
    // =========================================================================

    /// Append a notification log entry
    pub fn append_notification(&self, entry: &NotificationLogEntry) -> StoreResult<()> {
        let key = schema::keys::notification(&entry.alert_id, &entry.id);
        self.put(schema::CF_NOTIFICATIONS, &key, entry)
    }

    /// All notification log entries for an alert, oldest first
    pub fn notifications_for_alert(&self, alert_id: &str) -> StoreResult<Vec<NotificationLogEntry>> {
        let prefix = schema::keys::notification_prefix(alert_id);
        let keys = self.list_keys(schema::CF_NOTIFICATIONS, &prefix)?;

        let mut entries: Vec<NotificationLogEntry> = keys
            .iter()
            .filter_map(|key| self.get(schema::CF_NOTIFICATIONS, key).ok()?)
            .collect();

        entries.sort_by(|a: &NotificationLogEntry, b: &NotificationLogEntry| {
            a.sent_at.cmp(&b.sent_at)
        });
        Ok(entries)
    }

    // =========================================================================
    // Subject and contact operations
    // =========================================================================

    /// Store a subject
    pub fn put_subject(&self, subject: &Subject) -> StoreResult<()> {
        let key = schema::keys::subject(&subject.id);
        self.put(schema::CF_SUBJECTS, &key, subject)
    }

    /// Get a subject by ID
    pub fn get_subject(&self, subject_id: &str) -> StoreResult<Option<Subject>> {
        let key = schema::keys::subject(subject_id);
        self.get(schema::CF_SUBJECTS, &key)
    }

    /// Store a contact edge
    pub fn put_contact(&self, edge: &ContactEdge) -> StoreResult<()> {
        let key = schema::keys::contact(&edge.owner_id, &edge.contact_user_id);
        self.put(schema::CF_CONTACTS, &key, edge)
    }

    /// All contact edges owned by a subject
    pub fn contacts_of(&self, owner_id: &str) -> StoreResult<Vec<ContactEdge>> {
        let prefix = schema::keys::contact_prefix(owner_id);
        let keys = self.list_keys(schema::CF_CONTACTS, &prefix)?;

        let edges: Vec<ContactEdge> = keys
            .iter()
            .filter_map(|key| self.get(schema::CF_CONTACTS, key).ok()?)
            .collect();

        Ok(edges)
    }

    /// Whether `candidate` is a contact of `owner`
    pub fn has_contact(&self, owner_id: &str, candidate_id: &str) -> StoreResult<bool> {
        let key = schema::keys::contact(owner_id, candidate_id);
        Ok(self.get::<ContactEdge>(schema::CF_CONTACTS, &key)?.is_some())
    }

    // =========================================================================
    // Delayed-task operations
    // =========================================================================

    /// Durably persist a delayed task
    pub fn put_task(&self, task: &DelayedTask) -> StoreResult<()> {
        let run_at_nanos = task.run_at.timestamp_nanos_opt().unwrap_or(0);
        let key = schema::keys::task(run_at_nanos, &task.task_id);
        self.put(schema::CF_TASKS, &key, task)
    }

    /// All tasks whose due time has passed, in due order
    ///
    /// The scan reads from the start of the task column family and stops at
    /// the first task still in the future, so overdue tasks from before a
    /// restart come back immediately.
    pub fn due_tasks(&self, now: DateTime<Utc>) -> StoreResult<Vec<DelayedTask>> {
        let db = self.db.read().map_err(|_| StoreError::LockPoisoned)?;
        let cf = db
            .cf_handle(schema::CF_TASKS)
            .ok_or_else(|| StoreError::ColumnFamilyNotFound(schema::CF_TASKS.to_string()))?;

        let now_nanos = now.timestamp_nanos_opt().unwrap_or(0);
        let mut tasks = Vec::new();

        for result in db.iterator_cf(&cf, IteratorMode::Start) {
            let (key, value) = result?;
            let key_str = String::from_utf8(key.to_vec())
                .map_err(|e| StoreError::Deserialization(e.to_string()))?;

            if let Some(run_at_nanos) = schema::keys::parse_task_run_at(&key_str) {
                if run_at_nanos > now_nanos {
                    break;
                }
                let task: DelayedTask = serde_json::from_slice(&value)
                    .map_err(|e| StoreError::Deserialization(e.to_string()))?;
                tasks.push(task);
            }
        }

        Ok(tasks)
    }

    /// Remove a completed task
    pub fn remove_task(&self, task: &DelayedTask) -> StoreResult<()> {
        let run_at_nanos = task.run_at.timestamp_nanos_opt().unwrap_or(0);
        let key = schema::keys::task(run_at_nanos, &task.task_id);
        self.delete(schema::CF_TASKS, &key)
    }
}
