//! Subject directory: who exists and who watches out for whom
//!
//! The directory resolves subjects and their contact circles for the
//! escalation engine. Contact edges are directed: `owner -> contact` means
//! the contact is notified when the owner's alerts fire, not the reverse.
//!
//! Lookups go through the [`Directory`] trait so the engine never touches
//! edge keys directly; [`StoreDirectory`] is the record-store implementation.

use std::sync::Arc;

use tracing::warn;

use crate::store::{ContactEdge, SharedAlertStore, StoreError, StoreResult, Subject};

/// Read-side resolution of subjects and contact circles
pub trait Directory: Send + Sync {
    /// Look up a subject by id
    fn subject(&self, subject_id: &str) -> StoreResult<Option<Subject>>;

    /// Resolve the full subject records of an owner's contacts
    ///
    /// Edges pointing at unregistered subjects are skipped with a warning
    /// rather than failing the whole resolution.
    fn contacts_of(&self, owner_id: &str) -> StoreResult<Vec<Subject>>;

    /// Check whether `candidate_id` is in `owner_id`'s contact circle
    fn is_contact(&self, owner_id: &str, candidate_id: &str) -> StoreResult<bool>;
}

/// Shared reference to a directory
pub type SharedDirectory = Arc<dyn Directory>;

/// Record-store backed directory
pub struct StoreDirectory {
    store: SharedAlertStore,
}

impl StoreDirectory {
    /// Create a directory over the given store
    pub fn new(store: SharedAlertStore) -> Self {
        Self { store }
    }

    /// Create a shared reference to this directory
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Register a subject, overwriting any prior record with the same id
    pub fn register_subject(&self, subject: &Subject) -> StoreResult<()> {
        self.store.put_subject(subject)
    }

    /// Add a directed contact edge
    ///
    /// Both endpoints must already be registered.
    pub fn add_contact(&self, owner_id: &str, contact_user_id: &str) -> StoreResult<()> {
        if self.store.get_subject(owner_id)?.is_none() {
            return Err(StoreError::NotFound(format!("subject {}", owner_id)));
        }
        if self.store.get_subject(contact_user_id)?.is_none() {
            return Err(StoreError::NotFound(format!("subject {}", contact_user_id)));
        }
        self.store.put_contact(&ContactEdge {
            owner_id: owner_id.to_string(),
            contact_user_id: contact_user_id.to_string(),
        })
    }
}

impl Directory for StoreDirectory {
    fn subject(&self, subject_id: &str) -> StoreResult<Option<Subject>> {
        self.store.get_subject(subject_id)
    }

    fn contacts_of(&self, owner_id: &str) -> StoreResult<Vec<Subject>> {
        let edges = self.store.contacts_of(owner_id)?;
        let mut contacts = Vec::with_capacity(edges.len());
        for edge in edges {
            match self.store.get_subject(&edge.contact_user_id)? {
                Some(subject) => contacts.push(subject),
                None => {
                    warn!(
                        owner_id,
                        contact_user_id = %edge.contact_user_id,
                        "Skipping contact edge to unregistered subject"
                    );
                }
            }
        }
        Ok(contacts)
    }

    fn is_contact(&self, owner_id: &str, candidate_id: &str) -> StoreResult<bool> {
        self.store.has_contact(owner_id, candidate_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    use crate::store::AlertStore;

    fn subject(id: &str, name: &str) -> Subject {
        Subject {
            id: id.to_string(),
            display_name: name.to_string(),
            delivery_address: Some(format!("{}@example.com", id)),
        }
    }

    fn test_directory() -> (StoreDirectory, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let store = AlertStore::open(dir.path().join("test.db")).unwrap().shared();
        (StoreDirectory::new(store), dir)
    }

    #[test]
    fn test_register_and_lookup() {
        let (directory, _dir) = test_directory();
        directory.register_subject(&subject("s1", "Ada")).unwrap();

        let found = directory.subject("s1").unwrap().unwrap();
        assert_eq!(found.display_name, "Ada");
        assert!(directory.subject("missing").unwrap().is_none());
    }

    #[test]
    fn test_contacts_resolve_to_subjects() {
        let (directory, _dir) = test_directory();
        directory.register_subject(&subject("s1", "Ada")).unwrap();
        directory.register_subject(&subject("c1", "Grace")).unwrap();
        directory.register_subject(&subject("c2", "Edsger")).unwrap();

        directory.add_contact("s1", "c1").unwrap();
        directory.add_contact("s1", "c2").unwrap();

        let contacts = directory.contacts_of("s1").unwrap();
        let names: Vec<&str> = contacts.iter().map(|s| s.display_name.as_str()).collect();
        assert_eq!(contacts.len(), 2);
        assert!(names.contains(&"Grace"));
        assert!(names.contains(&"Edsger"));
    }

    #[test]
    fn test_add_contact_requires_registered_endpoints() {
        let (directory, _dir) = test_directory();
        directory.register_subject(&subject("s1", "Ada")).unwrap();

        let err = directory.add_contact("s1", "ghost").unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));

        let err = directory.add_contact("ghost", "s1").unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn test_is_contact_directed() {
        let (directory, _dir) = test_directory();
        directory.register_subject(&subject("s1", "Ada")).unwrap();
        directory.register_subject(&subject("c1", "Grace")).unwrap();
        directory.add_contact("s1", "c1").unwrap();

        assert!(directory.is_contact("s1", "c1").unwrap());
        assert!(!directory.is_contact("c1", "s1").unwrap());
    }

    #[test]
    fn test_dangling_edge_skipped() {
        let (directory, _dir) = test_directory();
        directory.register_subject(&subject("s1", "Ada")).unwrap();

        // Edge written directly, pointing at a subject that was never
        // registered.
        directory
            .store
            .put_contact(&ContactEdge {
                owner_id: "s1".to_string(),
                contact_user_id: "ghost".to_string(),
            })
            .unwrap();

        let contacts = directory.contacts_of("s1").unwrap();
        assert!(contacts.is_empty());
    }
}
