use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;

use punchcard_domain::store::KvStore;
use punchcard_domain::{EngineError, PluginId};

/// SQLite-backed per-plugin key-value store.
///
/// Values are stored as JSON text in a single `plugin_data` table keyed
/// by `(plugin_id, key)`.
pub struct SqliteKvStore {
    pool: Arc<SqlitePool>,
}

impl SqliteKvStore {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl KvStore for SqliteKvStore {
    async fn get(
        &self,
        plugin: &PluginId,
        key: &str,
    ) -> Result<Option<serde_json::Value>, EngineError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT value FROM plugin_data WHERE plugin_id = ?1 AND key = ?2")
                .bind(plugin.as_str())
                .bind(key)
                .fetch_optional(&*self.pool)
                .await
                .map_err(|e| EngineError::Store(format!("Get {}/{} failed: {}", plugin, key, e)))?;

        match row {
            Some((text,)) => {
                let value = serde_json::from_str(&text).map_err(|e| {
                    EngineError::Store(format!("Corrupt value under {}/{}: {}", plugin, key, e))
                })?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn put(
        &self,
        plugin: &PluginId,
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), EngineError> {
        let text = serde_json::to_string(&value)
            .map_err(|e| EngineError::Store(format!("Serialize {}/{} failed: {}", plugin, key, e)))?;

        sqlx::query(
            r#"
            INSERT INTO plugin_data (plugin_id, key, value, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT (plugin_id, key)
            DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(plugin.as_str())
        .bind(key)
        .bind(text)
        .bind(Utc::now().to_rfc3339())
        .execute(&*self.pool)
        .await
        .map_err(|e| EngineError::Store(format!("Put {}/{} failed: {}", plugin, key, e)))?;

        Ok(())
    }

    async fn remove(&self, plugin: &PluginId, key: &str) -> Result<(), EngineError> {
        sqlx::query("DELETE FROM plugin_data WHERE plugin_id = ?1 AND key = ?2")
            .bind(plugin.as_str())
            .bind(key)
            .execute(&*self.pool)
            .await
            .map_err(|e| EngineError::Store(format!("Remove {}/{} failed: {}", plugin, key, e)))?;

        Ok(())
    }
}
