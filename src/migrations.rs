//! Schema for the listing backend's metadata database.

use sqlx::SqlitePool;
use tracing::{debug, info};

/// Embedded copy of `migrations/0001_init.sql`.
const INIT_SQL: &str = include_str!("../migrations/0001_init.sql");

/// Apply the schema statement by statement. Every statement is idempotent
/// (`IF NOT EXISTS`), so running this against an existing database is safe.
pub async fn run_migrations(db: &SqlitePool) -> Result<(), sqlx::Error> {
    let statements = INIT_SQL
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>();

    info!("Running {} migration statements...", statements.len());

    for stmt in statements {
        debug!("Executing migration SQL: {}", stmt);
        sqlx::query(stmt).execute(db).await?;
    }

    Ok(())
}
