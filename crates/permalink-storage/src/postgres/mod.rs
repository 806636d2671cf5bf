pub mod migrations;
mod queries;

use permalink_core::{EntryKey, Resource};
use sqlx::PgPool;
use time::OffsetDateTime;

use crate::traits::{KeyValueEntry, KeyValueStore, NewEntry, StorageError};

/// Fresh keys tried before a collision is reported.
const MAX_KEY_ATTEMPTS: usize = 5;

/// Durable store backed by the `key_value` table.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn insert_with_keys(
        &self,
        entry: &NewEntry,
        candidates: impl Iterator<Item = EntryKey>,
    ) -> Result<EntryKey, StorageError> {
        let mut collision = None;
        for key in candidates.take(MAX_KEY_ATTEMPTS) {
            match queries::insert_entry(&self.pool, &key, entry).await {
                Ok(()) => return Ok(key),
                Err(StorageError::DuplicateKey(taken)) => {
                    tracing::warn!(key = %taken, "generated key already in use, retrying");
                    collision = Some(taken);
                }
                Err(e) => return Err(e),
            }
        }
        Err(collision.map_or_else(
            || StorageError::Internal("no key candidates".to_string()),
            StorageError::DuplicateKey,
        ))
    }
}

impl KeyValueStore for PostgresStore {
    async fn create(&self, entry: NewEntry) -> Result<EntryKey, StorageError> {
        self.insert_with_keys(&entry, std::iter::repeat_with(EntryKey::generate))
            .await
    }

    async fn get(&self, resource: Resource, key: &EntryKey) -> Result<KeyValueEntry, StorageError> {
        let now = OffsetDateTime::now_utc();
        queries::fetch_live_entry(&self.pool, resource, key, now)
            .await?
            .ok_or(StorageError::NotFound {
                resource,
                key: *key,
            })
    }

    async fn delete(&self, resource: Resource, key: &EntryKey) -> Result<(), StorageError> {
        let now = OffsetDateTime::now_utc();
        let removed = queries::delete_entry(&self.pool, resource, key, now).await?;
        if removed == 0 {
            return Err(StorageError::NotFound {
                resource,
                key: *key,
            });
        }
        Ok(())
    }

    async fn purge_expired(&self, now: OffsetDateTime) -> Result<usize, StorageError> {
        let removed = queries::delete_expired(&self.pool, now).await?;
        usize::try_from(removed).map_err(|e| StorageError::Internal(e.to_string()))
    }
}
