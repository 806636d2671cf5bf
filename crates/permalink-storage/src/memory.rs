use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use permalink_core::{EntryKey, Resource};
use time::OffsetDateTime;

use crate::traits::{KeyValueEntry, KeyValueStore, NewEntry, StorageError};

#[derive(Debug, Default)]
struct InnerState {
    entries: HashMap<EntryKey, KeyValueEntry>,
}

/// Process-local store. Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<InnerState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry_count(&self) -> usize {
        self.state.lock().map_or(0, |s| s.entries.len())
    }

    fn lock(&self) -> Result<MutexGuard<'_, InnerState>, StorageError> {
        self.state
            .lock()
            .map_err(|_| StorageError::Internal("in-memory store lock poisoned".to_string()))
    }
}

impl KeyValueStore for InMemoryStore {
    async fn create(&self, entry: NewEntry) -> Result<EntryKey, StorageError> {
        let mut state = self.lock()?;

        let mut key = EntryKey::generate();
        while state.entries.contains_key(&key) {
            key = EntryKey::generate();
        }

        state.entries.insert(
            key,
            KeyValueEntry {
                key,
                resource: entry.resource,
                value: entry.value,
                parent_resource_id: entry.parent_resource_id,
                created_by: entry.created_by,
                created_at: OffsetDateTime::now_utc(),
                expires_at: entry.expires_at,
            },
        );

        Ok(key)
    }

    async fn get(&self, resource: Resource, key: &EntryKey) -> Result<KeyValueEntry, StorageError> {
        let state = self.lock()?;
        let now = OffsetDateTime::now_utc();

        state
            .entries
            .get(key)
            .filter(|e| e.resource == resource && !e.is_expired_at(now))
            .cloned()
            .ok_or(StorageError::NotFound {
                resource,
                key: *key,
            })
    }

    async fn delete(&self, resource: Resource, key: &EntryKey) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        let now = OffsetDateTime::now_utc();

        match state.entries.get(key) {
            Some(e) if e.resource == resource && !e.is_expired_at(now) => {
                state.entries.remove(key);
                Ok(())
            }
            _ => Err(StorageError::NotFound {
                resource,
                key: *key,
            }),
        }
    }

    async fn purge_expired(&self, now: OffsetDateTime) -> Result<usize, StorageError> {
        let mut state = self.lock()?;

        let before = state.entries.len();
        state.entries.retain(|_, e| !e.is_expired_at(now));

        Ok(before - state.entries.len())
    }
}
