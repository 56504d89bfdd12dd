use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::{PgPool, Row};

use super::storage::KeyValueStore;
use crate::error::Result;

/// Key-value storage backed by the `kv_store` table.
#[derive(Clone)]
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl KeyValueStore for PgStorage {
    async fn get(&self, key: &str) -> Result<Option<JsonValue>> {
        let row = sqlx::query(r#"SELECT value FROM kv_store WHERE key = $1"#)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(row.try_get::<JsonValue, _>("value")?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: JsonValue) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value)
            VALUES ($1, $2)
            ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
