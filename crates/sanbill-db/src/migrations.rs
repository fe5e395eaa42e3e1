//! # Database Migrations
//!
//! Embedded SQL migrations for Sanbill.
//!
//! Migrations are forward-only. To change the schema:
//!
//! 1. Add a file to `migrations/sqlite/` with the next sequence number
//! 2. Name format: `NNN_description.sql` (e.g., `002_add_bank_details.sql`)
//! 3. **NEVER** modify an existing migration: the checksum is recorded

use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::DbResult;

/// Embedded migrations from the workspace `migrations/sqlite` directory.
///
/// `sqlx::migrate!()` embeds every SQL file at compile time, so the
/// binary needs no migration files at runtime.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Runs all pending database migrations.
///
/// Idempotent; each migration runs in its own transaction, in filename order.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    info!("Checking for pending migrations");

    MIGRATOR.run(pool).await?;

    info!("All migrations applied successfully");
    Ok(())
}

/// Returns `(total_migrations, applied_migrations)`.
///
/// Used by `sanbill status` style diagnostics.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let total = MIGRATOR.migrations.len();

    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await
        .unwrap_or(0);

    debug!(total, applied, "Migration status");
    Ok((total, applied.max(0) as usize))
}

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig};

    use super::*;

    #[tokio::test]
    async fn test_all_migrations_applied() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let (total, applied) = migration_status(db.pool()).await.unwrap();

        assert!(total >= 1);
        assert_eq!(total, applied);
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.run_migrations().await.unwrap();
        assert!(db.health_check().await);
    }
}
