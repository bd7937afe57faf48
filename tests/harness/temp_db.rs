use banner_timeline::store::db::{create_pool, run_migrations, DbPool};
use banner_timeline::store::SqliteStore;
use diesel::prelude::*;
use tempfile::TempDir;

/// Temporary file-backed SQLite database for integration tests.
pub struct TempDb {
    _dir: TempDir,
    pool: DbPool,
}

impl TempDb {
    pub fn create(name: &str) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join(format!("timeline-{name}.db"));

        let url = format!("sqlite://{}", path.display());
        let pool = create_pool(&url, 4).expect("create sqlite pool");
        run_migrations(&pool).expect("run migrations");

        // WAL mode improves concurrent writer behavior in tests.
        {
            let mut conn = pool.get().expect("get sqlite connection");
            diesel::sql_query("PRAGMA journal_mode=WAL")
                .execute(&mut conn)
                .expect("enable WAL mode");
        }

        Self { _dir: dir, pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn store(&self) -> SqliteStore {
        SqliteStore::new(self.pool.clone(), 1000)
    }
}
