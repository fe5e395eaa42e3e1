//! # Settings Repository
//!
//! Plain key/value settings (company details, preferences). The document
//! counters live in the same table but are accessed through
//! [`CounterRepository`](super::counter::CounterRepository).

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;

/// Repository for the `settings` table.
#[derive(Debug, Clone)]
pub struct SettingsRepository {
    pool: SqlitePool,
}

impl SettingsRepository {
    /// Creates a new SettingsRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SettingsRepository { pool }
    }

    /// Reads a setting. A missing key and a NULL value both read as `None`.
    pub async fn get(&self, key: &str) -> DbResult<Option<String>> {
        let value: Option<Option<String>> =
            sqlx::query_scalar("SELECT value FROM settings WHERE key = ?1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        Ok(value.flatten())
    }

    /// Writes a setting, replacing any previous value.
    pub async fn set(&self, key: &str, value: &str) -> DbResult<()> {
        debug!(key = %key, "Saving setting");

        sqlx::query(
            r#"
            INSERT INTO settings (key, value) VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Lists every setting, ordered by key.
    pub async fn list(&self) -> DbResult<Vec<(String, Option<String>)>> {
        let rows = sqlx::query_as("SELECT key, value FROM settings ORDER BY key")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert_eq!(db.settings().get("company_name").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_then_overwrite() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let settings = db.settings();

        settings.set("company_name", "Sanbill Logistics").await.unwrap();
        settings.set("company_name", "Sanbill Logistics LLP").await.unwrap();

        assert_eq!(
            settings.get("company_name").await.unwrap().as_deref(),
            Some("Sanbill Logistics LLP")
        );
        assert_eq!(settings.list().await.unwrap().len(), 1);
    }
}
