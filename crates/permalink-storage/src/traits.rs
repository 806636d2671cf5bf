use std::future::Future;

use permalink_core::{EntryKey, Resource};
use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("no {resource} entry with key {key}")]
    NotFound { resource: Resource, key: EntryKey },
    #[error("key {0} already exists")]
    DuplicateKey(EntryKey),
    #[error("internal storage error: {0}")]
    Internal(String),
}

/// A value waiting to be written. The store assigns the key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntry {
    pub resource: Resource,
    pub value: Vec<u8>,
    pub parent_resource_id: Option<String>,
    pub created_by: Option<String>,
    pub expires_at: Option<OffsetDateTime>,
}

impl NewEntry {
    pub fn new(resource: Resource, value: impl Into<Vec<u8>>) -> Self {
        Self {
            resource,
            value: value.into(),
            parent_resource_id: None,
            created_by: None,
            expires_at: None,
        }
    }

    pub fn with_parent(mut self, parent_resource_id: impl Into<String>) -> Self {
        self.parent_resource_id = Some(parent_resource_id.into());
        self
    }

    pub fn with_creator(mut self, created_by: impl Into<String>) -> Self {
        self.created_by = Some(created_by.into());
        self
    }

    pub fn expiring_at(mut self, expires_at: Option<OffsetDateTime>) -> Self {
        self.expires_at = expires_at;
        self
    }
}

/// A persisted entry. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValueEntry {
    pub key: EntryKey,
    pub resource: Resource,
    pub value: Vec<u8>,
    pub parent_resource_id: Option<String>,
    pub created_by: Option<String>,
    pub created_at: OffsetDateTime,
    pub expires_at: Option<OffsetDateTime>,
}

impl KeyValueEntry {
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expires_at.is_some_and(|deadline| deadline <= now)
    }
}

pub trait KeyValueStore: Send + Sync {
    /// Persists `entry` under a freshly generated key and returns that key.
    fn create(
        &self,
        entry: NewEntry,
    ) -> impl Future<Output = Result<EntryKey, StorageError>> + Send;

    /// Returns the entry stored under `key` in `resource`. Expired entries
    /// are reported as [`StorageError::NotFound`].
    fn get(
        &self,
        resource: Resource,
        key: &EntryKey,
    ) -> impl Future<Output = Result<KeyValueEntry, StorageError>> + Send;

    fn delete(
        &self,
        resource: Resource,
        key: &EntryKey,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Removes every entry whose deadline is at or before `now`.
    fn purge_expired(
        &self,
        now: OffsetDateTime,
    ) -> impl Future<Output = Result<usize, StorageError>> + Send;
}
