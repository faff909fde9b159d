//! Persistence port.
//!
//! The tracker keeps its durable state as JSON documents in a key-value
//! store. Two keys are used:
//!
//! - [`SUBJECTS_KEY`]: JSON array of subject names
//! - [`SESSIONS_KEY`]: JSON array of study session objects
//!
//! Backends implement [`Storage`]; [`MemoryStorage`] is an in-process fake
//! used by tests and by callers that don't need durability.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::convert::Infallible;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Key holding the subject registry.
pub const SUBJECTS_KEY: &str = "subjects";

/// Key holding the recorded study sessions.
pub const SESSIONS_KEY: &str = "studySessions";

/// A key-value store holding JSON documents.
///
/// Methods take `&self`; backends that need mutation use interior
/// mutability. Writes must be complete before `write` returns.
pub trait Storage {
    /// Backend-specific failure.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Reads the raw value stored under `key`, if any.
    fn read(&self, key: &str) -> Result<Option<String>, Self::Error>;

    /// Replaces the value stored under `key`.
    fn write(&self, key: &str, value: &str) -> Result<(), Self::Error>;
}

/// Errors surfaced when persisting state.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The in-memory value could not be encoded.
    #[error("failed to serialize {key}: {source}")]
    Serialize {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },
    /// The backend rejected the write.
    #[error("failed to write {key}: {source}")]
    Backend {
        key: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Reads and decodes the document under `key`.
///
/// Missing, unreadable, or unparseable data yields `None`; the caller starts
/// from an empty state.
pub(crate) fn load_json<S, T>(storage: &S, key: &'static str) -> Option<T>
where
    S: Storage + ?Sized,
    T: DeserializeOwned,
{
    let raw = match storage.read(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            tracing::warn!(key, error = %e, "failed to read stored data, starting empty");
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(key, error = %e, "stored data is malformed, starting empty");
            None
        }
    }
}

/// Encodes `value` and writes it under `key`.
pub(crate) fn save_json<S, T>(storage: &S, key: &'static str, value: &T) -> Result<(), StoreError>
where
    S: Storage + ?Sized,
    T: Serialize + ?Sized,
{
    let json =
        serde_json::to_string(value).map_err(|source| StoreError::Serialize { key, source })?;
    storage
        .write(key, &json)
        .map_err(|e| StoreError::Backend {
            key,
            source: Box::new(e),
        })
}

/// In-memory [`Storage`] backed by a sorted map.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RefCell<BTreeMap<String, String>>,
}

impl MemoryStorage {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a raw value, e.g. to simulate data written by an older version.
    #[must_use]
    pub fn with_entry(self, key: &str, value: &str) -> Self {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        self
    }

    /// Returns the raw value stored under `key`.
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }
}

impl Storage for MemoryStorage {
    type Error = Infallible;

    fn read(&self, key: &str) -> Result<Option<String>, Self::Error> {
        Ok(self.get(key))
    }

    fn write(&self, key: &str, value: &str) -> Result<(), Self::Error> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}
