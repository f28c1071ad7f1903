//! Database initialization, connection pooling, and lifecycle management.
//!
//! Uses SQLite in WAL mode with r2d2 connection pooling, so readers keep
//! running against a consistent snapshot while a write transaction is open.
//! Runs integrity checks on startup and applies versioned migrations.

use std::path::Path;
use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use tracing::{info, warn, error};

use moch_core::error::{MochError, MochResult};
use moch_core::config::DatabaseConfig;

use crate::schema;
use crate::migrations;

/// Type alias for the SQLite connection pool.
pub type DbPool = Pool<SqliteConnectionManager>;

/// Pooled connection handed out by [`Database::conn`].
pub type PooledConn = r2d2::PooledConnection<SqliteConnectionManager>;

/// Database wrapper providing initialization, pooling, and lifecycle management.
#[derive(Clone)]
pub struct Database {
    pool: Arc<DbPool>,
}

impl Database {
    /// Initialize the database at the given path with the provided configuration.
    ///
    /// Creates parent directories, configures the pool (WAL, foreign keys),
    /// optionally runs an integrity check, then creates the schema and runs
    /// pending migrations.
    pub fn init(db_path: &Path, config: &DatabaseConfig) -> MochResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        info!("initializing database at {}", db_path.display());

        let manager = SqliteConnectionManager::file(db_path);
        let pool = Pool::builder()
            .max_size(config.pool_size.max(1))
            .connection_customizer(Box::new(ConnectionCustomizer {
                wal_mode: config.wal_mode,
            }))
            .build(manager)
            .map_err(|e| MochError::Pool(e.to_string()))?;

        let db = Self {
            pool: Arc::new(pool),
        };

        if config.integrity_check_on_startup {
            db.run_integrity_check()?;
        }

        {
            let conn = db.conn()?;
            schema::create_tables(&conn)?;
            migrations::run_migrations(&conn)?;
        }

        info!("database initialized successfully");
        Ok(db)
    }

    /// Get a connection from the pool.
    pub fn conn(&self) -> MochResult<PooledConn> {
        self.pool.get().map_err(|e| MochError::Pool(e.to_string()))
    }

    /// Get a reference to the underlying pool.
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Run a SQLite integrity check.
    pub fn run_integrity_check(&self) -> MochResult<()> {
        let conn = self.conn()?;
        let result: String = conn
            .query_row("PRAGMA integrity_check", [], |row| row.get(0))
            .map_err(|e| MochError::Storage(e.to_string()))?;

        if result != "ok" {
            error!("database integrity check failed: {result}");
            return Err(MochError::Storage(format!("integrity check failed: {result}")));
        }

        info!("database integrity check passed");
        Ok(())
    }

    /// Execute a function within a database transaction.
    ///
    /// The transaction commits only if `f` returns `Ok`; any error rolls it
    /// back, leaving durable state untouched.
    pub fn transaction<T, F>(&self, f: F) -> MochResult<T>
    where
        F: FnOnce(&Connection) -> MochResult<T>,
    {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)
            .map_err(|e| MochError::Storage(e.to_string()))?;

        let result = f(&tx)?;

        tx.commit()
            .map_err(|e| MochError::Storage(e.to_string()))?;

        Ok(result)
    }

    /// Run several reads against one consistent snapshot.
    ///
    /// Opens a deferred transaction, so every query inside `f` sees the same
    /// committed state even while a writer commits concurrently.
    pub fn snapshot<T, F>(&self, f: F) -> MochResult<T>
    where
        F: FnOnce(&Connection) -> MochResult<T>,
    {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction_with_behavior(rusqlite::TransactionBehavior::Deferred)
            .map_err(|e| MochError::Storage(e.to_string()))?;
        let result = f(&tx)?;
        tx.finish().map_err(|e| MochError::Storage(e.to_string()))?;
        Ok(result)
    }

    /// Get database statistics (row counts per table).
    pub fn stats(&self) -> MochResult<DatabaseStats> {
        let conn = self.conn()?;

        let count = |table: &str| -> MochResult<i64> {
            let sql = format!("SELECT COUNT(*) FROM {table}");
            conn.query_row(&sql, [], |row| row.get(0))
                .map_err(|e| MochError::Storage(e.to_string()))
        };

        Ok(DatabaseStats {
            pets: count("pets")?,
            photos: count("pet_photos")?,
            reminders: count("reminders")?,
            weight_entries: count("weight_entries")?,
            configurations: count("app_configuration")?,
        })
    }

    /// Reset the database by dropping and recreating all tables.
    pub fn reset(&self) -> MochResult<()> {
        warn!("resetting database - all data will be lost");
        let conn = self.conn()?;
        schema::drop_tables(&conn)?;
        schema::create_tables(&conn)?;
        migrations::run_migrations(&conn)?;
        info!("database reset complete");
        Ok(())
    }
}

/// Database row count statistics.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DatabaseStats {
    pub pets: i64,
    pub photos: i64,
    pub reminders: i64,
    pub weight_entries: i64,
    pub configurations: i64,
}

impl std::fmt::Display for DatabaseStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "pets={}, photos={}, reminders={}, weight_entries={}, configurations={}",
            self.pets, self.photos, self.reminders, self.weight_entries, self.configurations
        )
    }
}

/// r2d2 connection customizer that applies PRAGMA settings.
#[derive(Debug)]
struct ConnectionCustomizer {
    wal_mode: bool,
}

impl r2d2::CustomizeConnection<Connection, rusqlite::Error> for ConnectionCustomizer {
    fn on_acquire(&self, conn: &mut Connection) -> Result<(), rusqlite::Error> {
        if self.wal_mode {
            conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        }

        conn.execute_batch(
            "PRAGMA synchronous=NORMAL;
             PRAGMA temp_store=MEMORY;
             PRAGMA busy_timeout=5000;
             PRAGMA foreign_keys=ON;",
        )?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_db() -> (Database, TempDir) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.db");
        let config = DatabaseConfig::default();
        let db = Database::init(&path, &config).unwrap();
        (db, dir)
    }

    #[test]
    fn test_database_init() {
        let (db, _dir) = test_db();
        let stats = db.stats().unwrap();
        assert_eq!(stats.pets, 0);
        assert_eq!(stats.configurations, 0);
    }

    #[test]
    fn test_integrity_check() {
        let (db, _dir) = test_db();
        assert!(db.run_integrity_check().is_ok());
    }

    #[test]
    fn test_foreign_keys_enabled() {
        let (db, _dir) = test_db();
        let conn = db.conn().unwrap();
        let enabled: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(enabled, 1);
    }

    #[test]
    fn test_transaction_commits() {
        let (db, _dir) = test_db();
        let result = db.transaction(|conn| {
            conn.execute(
                "INSERT INTO pets (id, name, birthday, type) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params!["p1", "Mochi", "2020-05-01", "dog"],
            ).map_err(|e| MochError::Storage(e.to_string()))?;
            Ok(42)
        });
        assert_eq!(result.unwrap(), 42);
        assert_eq!(db.stats().unwrap().pets, 1);
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let (db, _dir) = test_db();
        let result: MochResult<()> = db.transaction(|conn| {
            conn.execute(
                "INSERT INTO pets (id, name, birthday, type) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params!["p1", "Mochi", "2020-05-01", "dog"],
            ).map_err(|e| MochError::Storage(e.to_string()))?;
            Err(MochError::Validation("abort".into()))
        });
        assert!(result.is_err());
        assert_eq!(db.stats().unwrap().pets, 0);
    }

    #[test]
    fn test_reset() {
        let (db, _dir) = test_db();
        db.transaction(|conn| {
            conn.execute(
                "INSERT INTO pets (id, name, birthday, type) VALUES ('p1', 'Mochi', '2020-05-01', 'cat')",
                [],
            ).map_err(|e| MochError::Storage(e.to_string()))?;
            Ok(())
        }).unwrap();
        db.reset().unwrap();
        assert_eq!(db.stats().unwrap().pets, 0);
    }
}
