//! Beacon — distress-signal escalation service
//!
//! When a subject raises a distress alert, their contacts are pushed an
//! immediate notification and a grace-period countdown starts. If nobody
//! marks the alert resolved before the countdown elapses, the alert
//! escalates and every contact gets a durable notice with the subject's
//! last known location.
//!
//! # Architecture
//!
//! - `store`: RocksDB-backed records — alerts, notification log, subjects,
//!   contact edges, scheduled tasks. Owns the conditional status transition
//!   that settles the resolve-versus-escalate race.
//! - `cache`: TTL session cache, one entry per unresolved alert. Entry
//!   absence is the signal that escalation should not happen.
//! - `scheduler`: durable one-shot tasks over the store, polled by a
//!   worker. Tasks that come due while the process is down fire at startup.
//! - `notify`: immediate broadcast fan-out plus durable escalation notices.
//! - `directory`: subjects and their contact circles.
//! - `escalation`: the engine tying it all together.
//! - `api`: axum HTTP surface.

#![allow(clippy::uninlined_format_args)]

pub mod api;
pub mod cache;
pub mod directory;
pub mod escalation;
pub mod notify;
pub mod scheduler;
pub mod store;

// Re-export the types most callers need
pub use cache::{MokaSessionCache, SessionCache, SessionSnapshot};
pub use directory::{Directory, SharedDirectory, StoreDirectory};
pub use escalation::{
    AlertHistoryEntry, EngineConfig, EngineError, EscalationEngine, Location, NotificationView,
    SharedEngine,
};
pub use notify::{DurableChannel, FanoutChannel, LoggingDurableChannel, WebhookDurableChannel};
pub use scheduler::{DelayedTaskScheduler, TaskHandler};
pub use store::{AlertRecord, AlertStatus, AlertStore, Channel, SharedAlertStore, Subject};
