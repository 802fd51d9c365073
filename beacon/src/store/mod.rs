//! Record persistence module for the escalation pipeline
//!
//! This module provides RocksDB-backed persistent storage for:
//! - Alert records and their guarded status transitions
//! - Append-only notification log entries
//! - Registered subjects and directed contact edges
//! - Durably scheduled escalation tasks
//!
//! # Architecture
//!
//! The record store uses RocksDB column families to logically separate
//! different data types while sharing a single database instance:
//!
//! - `alerts`: AlertRecord with the lifecycle status
//! - `notifications`: NotificationLogEntry per successful delivery
//! - `subjects`: registered Subject records
//! - `contacts`: directed owner -> contact edges
//! - `tasks`: DelayedTask keyed by due time for in-order scans
//!
//! Status changes never go through read-then-write in callers: the store
//! exposes a compare-and-set transition executed under its write lock, which
//! is what settles the race between human resolution and timed escalation.

pub mod schema;
pub mod store;
pub mod types;

// Re-export core types
pub use store::{AlertStore, SharedAlertStore, StoreError, StoreResult};
pub use types::{
    AlertId, AlertRecord, AlertStatus, Channel, ContactEdge, DelayedTask, NotificationLogEntry,
    Subject, SubjectId,
};
