//! Registry of known subjects.

use crate::storage::{SUBJECTS_KEY, Storage, StoreError, load_json, save_json};
use crate::types::Subject;

/// Ordered set of subjects the user can study.
///
/// Subjects are never removed or renamed. Adding an existing or empty name is
/// a silent no-op.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectRegistry {
    subjects: Vec<Subject>,
}

impl SubjectRegistry {
    /// Loads the registry, starting empty if nothing usable is stored.
    ///
    /// Empty or duplicated names in stored data are dropped.
    pub fn load<S: Storage + ?Sized>(storage: &S) -> Self {
        let stored: Vec<String> = load_json(storage, SUBJECTS_KEY).unwrap_or_default();
        let mut registry = Self::default();
        for name in stored {
            if !registry.insert(&name) {
                tracing::warn!(%name, "skipping invalid stored subject");
            }
        }
        registry
    }

    /// Adds `name` and persists the registry.
    ///
    /// Returns `Ok(false)` without touching storage if the name is empty or
    /// already present. A failed write keeps the in-memory addition.
    pub fn add<S: Storage + ?Sized>(&mut self, storage: &S, name: &str) -> Result<bool, StoreError> {
        if !self.insert(name) {
            tracing::debug!(name, "subject not added");
            return Ok(false);
        }
        save_json(storage, SUBJECTS_KEY, &self.subjects)?;
        Ok(true)
    }

    /// Returns the subjects in insertion order.
    pub fn list(&self) -> &[Subject] {
        &self.subjects
    }

    /// Returns true if `name` is registered (exact match).
    pub fn contains(&self, name: &str) -> bool {
        self.subjects.iter().any(|s| s == name)
    }

    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }

    fn insert(&mut self, name: &str) -> bool {
        if self.contains(name) {
            return false;
        }
        match Subject::new(name) {
            Ok(subject) => {
                self.subjects.push(subject);
                true
            }
            Err(_) => false,
        }
    }
}
