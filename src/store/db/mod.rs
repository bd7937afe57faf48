//! Database connection management using Diesel ORM.
//!
//! Provides connection pooling, migration support, and connection
//! configuration for SQLite databases.

pub mod model;
pub mod schema;

use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use crate::config::DatabaseConfig;
use crate::error::{Result, StorageError};

/// Embedded database migrations compiled from the migrations/ directory.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Type alias for a SQLite connection pool.
pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;

/// Create a connection pool for the given database URL.
///
/// In-memory databases are private to one connection, so `:memory:` URLs
/// should use a pool size of 1.
///
/// # Errors
/// Returns an error if the pool cannot be created.
pub fn create_pool(database_url: &str, max_size: u32) -> Result<DbPool> {
    let manager = ConnectionManager::<SqliteConnection>::new(database_url);
    let pool = Pool::builder()
        .max_size(max_size)
        .build(manager)
        .map_err(|e| StorageError::Connection(e.to_string()))?;
    Ok(pool)
}

/// Create a pool from configuration and bring its schema up to date.
///
/// # Errors
/// Returns an error if the pool cannot be created or migrations fail.
pub fn open(config: &DatabaseConfig) -> Result<DbPool> {
    let pool = create_pool(&config.url, config.pool_size)?;
    run_migrations(&pool)?;
    Ok(pool)
}

/// Run all pending database migrations.
///
/// # Errors
/// Returns an error if migrations fail.
pub fn run_migrations(pool: &DbPool) -> Result<()> {
    let mut conn = pool.get().map_err(StorageError::from)?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| StorageError::Migration(e.to_string()))?;
    Ok(())
}

/// Configure SQLite connection pragmas used for presence writes.
///
/// # Errors
/// Returns an error if a pragma fails to apply.
pub fn configure_sqlite_connection(conn: &mut SqliteConnection, busy_timeout_ms: u32) -> Result<()> {
    diesel::sql_query(format!("PRAGMA busy_timeout={busy_timeout_ms}"))
        .execute(conn)
        .map_err(StorageError::from)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(diesel::QueryableByName)]
    struct TableName {
        #[diesel(sql_type = diesel::sql_types::Text)]
        name: String,
    }

    #[test]
    fn create_pool_with_memory_db() {
        let pool = create_pool(":memory:", 1);
        assert!(pool.is_ok());
    }

    #[test]
    fn run_migrations_creates_tables() {
        let pool = create_pool(":memory:", 1).unwrap();
        run_migrations(&pool).unwrap();

        let mut conn = pool.get().unwrap();
        let result: Vec<String> = diesel::sql_query(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' AND name != '__diesel_schema_migrations' ORDER BY name"
        )
        .load::<TableName>(&mut conn)
        .unwrap()
        .into_iter()
        .map(|t| t.name)
        .collect();

        assert!(result.contains(&"gacha_available_ex".to_string()));
        assert!(result.contains(&"gacha_contiguous_presence".to_string()));
        assert!(result.contains(&"history".to_string()));
    }

    #[test]
    fn open_sizes_pool_and_migrates() {
        let config = crate::testkit::config::with_database(":memory:", 1);
        let pool = open(&config.database).unwrap();
        assert_eq!(pool.max_size(), 1);

        let mut conn = pool.get().unwrap();
        let tables = diesel::sql_query("SELECT name FROM sqlite_master WHERE type='table' AND name = 'history'")
            .load::<TableName>(&mut conn)
            .unwrap();
        assert_eq!(tables.len(), 1);
    }

    #[test]
    fn run_migrations_is_idempotent() {
        let pool = create_pool(":memory:", 1).unwrap();
        run_migrations(&pool).unwrap();
        run_migrations(&pool).unwrap();
    }

    #[test]
    fn configure_sqlite_connection_sets_pragmas() {
        let pool = create_pool(":memory:", 1).unwrap();
        let mut conn = pool.get().unwrap();
        assert!(configure_sqlite_connection(&mut conn, 1000).is_ok());
    }
}
