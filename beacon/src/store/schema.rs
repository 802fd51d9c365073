//! Column family definitions for the RocksDB record store
//!
//! Each column family provides logical separation of data types
//! while sharing the same RocksDB instance. Delayed-task keys embed a
//! zero-padded timestamp so a forward scan yields tasks in due order.

/// Column family for alert records
pub const CF_ALERTS: &str = "alerts";

/// Column family for notification log entries
pub const CF_NOTIFICATIONS: &str = "notifications";

/// Column family for registered subjects
pub const CF_SUBJECTS: &str = "subjects";

/// Column family for contact edges
pub const CF_CONTACTS: &str = "contacts";

/// Column family for scheduled escalation tasks
pub const CF_TASKS: &str = "tasks";

/// All column family names
pub const ALL_CFS: &[&str] = &[
    CF_ALERTS,
    CF_NOTIFICATIONS,
    CF_SUBJECTS,
    CF_CONTACTS,
    CF_TASKS,
];

/// Key prefixes for compound keys
pub mod keys {
    /// Create an alert key
    pub fn alert(alert_id: &str) -> String {
        format!("alert:{}", alert_id)
    }

    /// Create a notification log key
    pub fn notification(alert_id: &str, entry_id: &str) -> String {
        format!("note:{}:{}", alert_id, entry_id)
    }

    /// Prefix matching all notification log entries of one alert
    pub fn notification_prefix(alert_id: &str) -> String {
        format!("note:{}:", alert_id)
    }

    /// Create a subject key
    pub fn subject(subject_id: &str) -> String {
        format!("subj:{}", subject_id)
    }

    /// Create a contact edge key
    pub fn contact(owner_id: &str, contact_user_id: &str) -> String {
        format!("edge:{}:{}", owner_id, contact_user_id)
    }

    /// Prefix matching all contact edges of one owner
    pub fn contact_prefix(owner_id: &str) -> String {
        format!("edge:{}:", owner_id)
    }

    /// Create a delayed-task key (timestamp-based for due ordering)
    pub fn task(run_at_nanos: i64, task_id: &str) -> String {
        format!("task:{:020}:{}", run_at_nanos, task_id)
    }

    /// Parse the due timestamp from a task key
    pub fn parse_task_run_at(key: &str) -> Option<i64> {
        let parts: Vec<&str> = key.split(':').collect();
        if parts.len() >= 2 && parts[0] == "task" {
            parts[1].parse().ok()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_generation() {
        assert_eq!(keys::alert("a1"), "alert:a1");
        assert_eq!(keys::notification("a1", "n1"), "note:a1:n1");
        assert_eq!(keys::subject("s1"), "subj:s1");
        assert_eq!(keys::contact("s1", "s2"), "edge:s1:s2");
    }

    #[test]
    fn test_task_key_ordering() {
        let earlier = keys::task(1_000_000_000, "t1");
        let later = keys::task(2_000_000_000, "t2");
        assert!(earlier < later);
    }

    #[test]
    fn test_parse_task_run_at() {
        let key = keys::task(12345, "t1");
        assert_eq!(keys::parse_task_run_at(&key), Some(12345));
        assert_eq!(keys::parse_task_run_at("alert:a1"), None);
    }
}
