//! Notification delivery for the escalation pipeline
//!
//! Two delivery paths with different guarantees:
//!
//! 1. **Immediate fan-out** (`fanout.rs`): Tokio broadcast-based pushes to
//!    connected listeners at trigger time. Best-effort; a disconnected
//!    listener misses the push.
//!
//! 2. **Durable notices** (`durable.rs`): composed escalation notices
//!    delivered to each contact's durable address when the grace period
//!    elapses unresolved.
//!
//! Both paths append to the store's notification log on success, so the
//! delivery history of an alert can be audited afterwards.

pub mod durable;
pub mod fanout;

// Re-export core types
pub use durable::{
    map_link, DurableChannel, EscalationNotice, LoggingDurableChannel, NotifyError, NotifyResult,
    WebhookDurableChannel,
};
pub use fanout::{AlertPush, FanoutChannel, SharedFanout, TopicReceiver};
