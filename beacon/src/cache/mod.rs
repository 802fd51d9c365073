//! Session cache — the liveness signal for outstanding alerts
//!
//! One entry exists per unresolved alert, written at trigger time with a TTL
//! equal to the escalation grace period. Resolution deletes the entry;
//! otherwise it self-reaps when the TTL elapses. The escalation callback
//! treats entry absence as "already resolved or stale" and no-ops, which is
//! the only cancellation mechanism in the pipeline — the scheduler itself
//! never cancels tasks.
//!
//! The cache is deliberately not coordinated with the record store: callers
//! must tolerate lost updates, and the record store's conditional transition
//! remains the final arbiter of an alert's outcome.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use moka::future::Cache;
use moka::Expiry;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::store::{AlertId, SubjectId};

/// Snapshot of an outstanding alert, held in the cache while it is unresolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Alert the session belongs to
    pub alert_id: AlertId,
    /// Subject who raised the alert
    pub subject_id: SubjectId,
    /// Latitude at trigger time
    pub latitude: f64,
    /// Longitude at trigger time
    pub longitude: f64,
    /// When the alert was raised
    pub created_at: DateTime<Utc>,
}

/// Cache key for an alert's session entry
pub fn session_key(alert_id: &str) -> String {
    format!("alert:session:{}", alert_id)
}

/// Error type for session cache operations
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Keyed store with per-entry expiry
///
/// `get` cannot distinguish "expired" from "never set"; both come back as
/// absent. `delete` reports whether an entry existed so resolution can log
/// the best-effort cleanup outcome.
#[async_trait]
pub trait SessionCache: Send + Sync {
    /// Store a snapshot, overwriting any prior entry, expiring after `ttl`
    async fn put(
        &self,
        key: &str,
        snapshot: &SessionSnapshot,
        ttl: Duration,
    ) -> Result<(), CacheError>;

    /// Get the snapshot for a key, or absent
    async fn get(&self, key: &str) -> Option<SessionSnapshot>;

    /// Remove the entry, reporting whether one existed
    async fn delete(&self, key: &str) -> bool;
}

/// Serialized snapshot plus its requested lifetime
#[derive(Clone)]
struct CachedEntry {
    bytes: Arc<Vec<u8>>,
    ttl: Duration,
}

/// Expiry policy reading the per-entry TTL stored alongside the payload
struct PerEntryExpiry;

impl Expiry<String, CachedEntry> for PerEntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        entry: &CachedEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }
}

/// Moka-backed session cache with per-entry TTL
pub struct MokaSessionCache {
    inner: Cache<String, CachedEntry>,
}

impl MokaSessionCache {
    /// Create a cache bounded to `max_entries` live sessions
    pub fn new(max_entries: u64) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_entries)
                .expire_after(PerEntryExpiry)
                .build(),
        }
    }

    /// Create a shared reference to this cache
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

/// Decode a cached payload, treating malformed bytes as cache-absent
fn decode_snapshot(key: &str, bytes: &[u8]) -> Option<SessionSnapshot> {
    match serde_json::from_slice(bytes) {
        Ok(snapshot) => Some(snapshot),
        Err(e) => {
            warn!(key, "discarding malformed session payload: {}", e);
            None
        }
    }
}

#[async_trait]
impl SessionCache for MokaSessionCache {
    async fn put(
        &self,
        key: &str,
        snapshot: &SessionSnapshot,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let bytes =
            serde_json::to_vec(snapshot).map_err(|e| CacheError::Serialization(e.to_string()))?;
        self.inner
            .insert(
                key.to_string(),
                CachedEntry {
                    bytes: Arc::new(bytes),
                    ttl,
                },
            )
            .await;
        Ok(())
    }

    async fn get(&self, key: &str) -> Option<SessionSnapshot> {
        let entry = self.inner.get(key).await?;
        decode_snapshot(key, &entry.bytes)
    }

    async fn delete(&self, key: &str) -> bool {
        self.inner.remove(key).await.is_some()
    }
}
