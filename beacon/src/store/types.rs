//! Persistent types for the alert record store
//!
//! These types are stored in RocksDB and form the durable history of the
//! escalation pipeline. Alert records are never deleted; their status only
//! moves forward through the lifecycle state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for alerts
pub type AlertId = String;

/// Unique identifier for subjects (alert owners and their contacts)
pub type SubjectId = String;

/// Lifecycle status of an alert
///
/// Transitions are monotone: `Pending` is the only non-terminal state.
/// `Resolved`, `Escalated` and `Triggered` (superseded by a newer alert from
/// the same subject) are terminal for this engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    /// Awaiting human resolution; eligible for escalation
    Pending,
    /// Superseded by a newer alert from the same subject
    Triggered,
    /// The grace period elapsed without resolution
    Escalated,
    /// A human resolved the alert within the grace period
    Resolved,
}

impl AlertStatus {
    /// Whether this status permits no further transitions
    pub fn is_terminal(&self) -> bool {
        !matches!(self, AlertStatus::Pending)
    }
}

impl std::fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertStatus::Pending => write!(f, "pending"),
            AlertStatus::Triggered => write!(f, "triggered"),
            AlertStatus::Escalated => write!(f, "escalated"),
            AlertStatus::Resolved => write!(f, "resolved"),
        }
    }
}

/// A single distress alert raised by a subject
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRecord {
    /// Opaque alert identifier
    pub id: AlertId,
    /// Subject who raised the alert
    pub subject_id: SubjectId,
    /// Last known latitude at trigger time
    pub latitude: f64,
    /// Last known longitude at trigger time
    pub longitude: f64,
    /// When the alert was raised
    pub created_at: DateTime<Utc>,
    /// Current lifecycle status
    pub status: AlertStatus,
}

impl AlertRecord {
    /// Create a new pending alert for a subject
    pub fn new(subject_id: impl Into<SubjectId>, latitude: f64, longitude: f64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            subject_id: subject_id.into(),
            latitude,
            longitude,
            created_at: Utc::now(),
            status: AlertStatus::Pending,
        }
    }
}

/// Delivery channel for a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Low-latency push to a contact's live subscription
    Immediate,
    /// Higher-latency escalation delivery (e.g. webhook to an address)
    Durable,
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Channel::Immediate => write!(f, "immediate"),
            Channel::Durable => write!(f, "durable"),
        }
    }
}

/// Append-only record of one successful delivery to one recipient
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationLogEntry {
    /// Log entry identifier
    pub id: String,
    /// Alert this delivery belongs to
    pub alert_id: AlertId,
    /// Recipient of the notification
    pub recipient_id: SubjectId,
    /// Channel the delivery went through
    pub channel: Channel,
    /// When the delivery was made
    pub sent_at: DateTime<Utc>,
}

impl NotificationLogEntry {
    /// Create a log entry stamped with the current time
    pub fn new(
        alert_id: impl Into<AlertId>,
        recipient_id: impl Into<SubjectId>,
        channel: Channel,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            alert_id: alert_id.into(),
            recipient_id: recipient_id.into(),
            channel,
            sent_at: Utc::now(),
        }
    }
}

/// A registered subject: alert owner or trusted contact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    /// Opaque subject identifier
    pub id: SubjectId,
    /// Human-readable name used in notifications
    pub display_name: String,
    /// Address for durable-channel delivery, if the subject registered one
    pub delivery_address: Option<String>,
}

/// Directed trust edge: `owner` nominates `contact_user` as a trusted contact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactEdge {
    /// Subject who owns the contact list
    pub owner_id: SubjectId,
    /// Subject nominated as a contact
    pub contact_user_id: SubjectId,
}

/// A durably scheduled one-shot escalation check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelayedTask {
    /// Unique task identifier (one per alert)
    pub task_id: String,
    /// Alert to re-check when the task fires
    pub alert_id: AlertId,
    /// When the task becomes due
    pub run_at: DateTime<Utc>,
}
