//! Alert escalation orchestration
//!
//! The engine ties the other modules together: the record store holds the
//! durable truth, the session cache carries the liveness signal, the
//! scheduler fires the grace-period check, and the notify channels deliver
//! to contacts. See `engine.rs` for the lifecycle semantics.

pub mod engine;

// Re-export core types
pub use engine::{
    AlertHistoryEntry, EngineConfig, EngineError, EngineResult, EscalationEngine,
    EscalationTaskHandler, Location, NotificationView, SharedEngine,
};
