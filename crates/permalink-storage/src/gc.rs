use time::OffsetDateTime;

use crate::traits::{KeyValueStore, StorageError};

/// One retention pass: drops every entry whose deadline has passed.
pub async fn run_purge_cycle<S: KeyValueStore>(store: &S) -> Result<usize, StorageError> {
    let now = OffsetDateTime::now_utc();
    let removed = store.purge_expired(now).await?;

    if removed > 0 {
        tracing::info!(removed, "purged expired key-value entries");
    } else {
        tracing::debug!("no expired key-value entries to purge");
    }

    Ok(removed)
}
