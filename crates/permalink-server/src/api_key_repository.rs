use permalink_core::Principal;
use sqlx::PgPool;

use crate::auth::ApiKeyRecord;

#[derive(Debug, Clone)]
pub struct ApiKeyRepository {
    pool: PgPool,
}

impl ApiKeyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn lookup_by_key_id(
        &self,
        key_id: &str,
    ) -> Result<Option<ApiKeyRecord>, sqlx::Error> {
        let row = sqlx::query_as::<_, ApiKeyRow>(
            "SELECT key_id, key_hash, principal, admin, (revoked_at IS NOT NULL) AS revoked \
             FROM api_keys WHERE key_id = $1",
        )
        .bind(key_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| ApiKeyRecord {
            key_id: r.key_id,
            key_hash: r.key_hash,
            principal: Principal {
                name: r.principal,
                admin: r.admin,
            },
            revoked: r.revoked,
        }))
    }

    pub async fn insert(
        &self,
        key_id: &str,
        key_hash: &str,
        principal: &Principal,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO api_keys (key_id, key_hash, principal, admin) VALUES ($1, $2, $3, $4)",
        )
        .bind(key_id)
        .bind(key_hash)
        .bind(&principal.name)
        .bind(principal.admin)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct ApiKeyRow {
    key_id: String,
    key_hash: String,
    principal: String,
    admin: bool,
    revoked: bool,
}
