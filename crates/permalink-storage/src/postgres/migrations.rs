use sqlx::PgPool;

const STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS key_value (
        uuid                UUID PRIMARY KEY,
        resource            TEXT NOT NULL,
        value               BYTEA NOT NULL,
        parent_resource_id  TEXT,
        created_by          TEXT,
        created_at          TIMESTAMPTZ NOT NULL DEFAULT now(),
        expires_at          TIMESTAMPTZ
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_key_value_expires_at
    ON key_value (expires_at)
    WHERE expires_at IS NOT NULL
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS api_keys (
        id          UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        key_id      TEXT NOT NULL UNIQUE,
        key_hash    TEXT NOT NULL,
        principal   TEXT NOT NULL,
        admin       BOOLEAN NOT NULL DEFAULT false,
        created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
        revoked_at  TIMESTAMPTZ
    )
    "#,
];

/// Idempotent: every statement is `IF NOT EXISTS`.
pub async fn run_shared_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    for statement in STATEMENTS {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_statement_is_idempotent() {
        for statement in STATEMENTS {
            assert!(
                statement.contains("IF NOT EXISTS"),
                "migration is not idempotent: {statement}"
            );
        }
    }

    #[test]
    fn key_value_table_uses_uuid_primary_key() {
        assert!(STATEMENTS[0].contains("uuid                UUID PRIMARY KEY"));
    }
}
