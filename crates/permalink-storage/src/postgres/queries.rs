use permalink_core::{EntryKey, Resource};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::traits::{KeyValueEntry, NewEntry, StorageError};

fn to_storage_error(e: sqlx::Error) -> StorageError {
    StorageError::Internal(e.to_string())
}

#[derive(sqlx::FromRow)]
struct EntryRow {
    uuid: Uuid,
    value: Vec<u8>,
    parent_resource_id: Option<String>,
    created_by: Option<String>,
    created_at: OffsetDateTime,
    expires_at: Option<OffsetDateTime>,
}

impl EntryRow {
    fn into_entry(self, resource: Resource) -> KeyValueEntry {
        KeyValueEntry {
            key: EntryKey::new(self.uuid),
            resource,
            value: self.value,
            parent_resource_id: self.parent_resource_id,
            created_by: self.created_by,
            created_at: self.created_at,
            expires_at: self.expires_at,
        }
    }
}

pub async fn insert_entry<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    key: &EntryKey,
    entry: &NewEntry,
) -> Result<(), StorageError> {
    sqlx::query(
        r#"
        INSERT INTO key_value
            (uuid, resource, value, parent_resource_id, created_by, expires_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(key.as_uuid())
    .bind(entry.resource.as_str())
    .bind(&entry.value)
    .bind(&entry.parent_resource_id)
    .bind(&entry.created_by)
    .bind(entry.expires_at)
    .execute(executor)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            return StorageError::DuplicateKey(*key);
        }
        to_storage_error(e)
    })?;
    Ok(())
}

pub async fn fetch_live_entry<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    resource: Resource,
    key: &EntryKey,
    now: OffsetDateTime,
) -> Result<Option<KeyValueEntry>, StorageError> {
    let row = sqlx::query_as::<_, EntryRow>(
        r#"
        SELECT uuid, value, parent_resource_id, created_by, created_at, expires_at
        FROM key_value
        WHERE uuid = $1
          AND resource = $2
          AND (expires_at IS NULL OR expires_at > $3)
        "#,
    )
    .bind(key.as_uuid())
    .bind(resource.as_str())
    .bind(now)
    .fetch_optional(executor)
    .await
    .map_err(to_storage_error)?;

    Ok(row.map(|r| r.into_entry(resource)))
}

pub async fn delete_entry<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    resource: Resource,
    key: &EntryKey,
    now: OffsetDateTime,
) -> Result<u64, StorageError> {
    let result = sqlx::query(
        r#"
        DELETE FROM key_value
        WHERE uuid = $1
          AND resource = $2
          AND (expires_at IS NULL OR expires_at > $3)
        "#,
    )
    .bind(key.as_uuid())
    .bind(resource.as_str())
    .bind(now)
    .execute(executor)
    .await
    .map_err(to_storage_error)?;
    Ok(result.rows_affected())
}

pub async fn delete_expired<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    now: OffsetDateTime,
) -> Result<u64, StorageError> {
    let result = sqlx::query("DELETE FROM key_value WHERE expires_at IS NOT NULL AND expires_at <= $1")
        .bind(now)
        .execute(executor)
        .await
        .map_err(to_storage_error)?;
    Ok(result.rows_affected())
}
