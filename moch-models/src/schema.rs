//! Database schema definitions and table creation.
//!
//! Four entity tables plus an out-of-line photo table. Relationships are
//! one-directional: reminders and weight entries carry a `pet_id`, pets carry
//! nothing about their dependents.

use rusqlite::Connection;
use moch_core::error::{MochError, MochResult};
use tracing::info;

/// Create all database tables and indexes if they do not exist.
pub fn create_tables(conn: &Connection) -> MochResult<()> {
    conn.execute_batch(SCHEMA_SQL)
        .map_err(|e| MochError::Storage(format!("failed to create schema: {e}")))?;
    info!("database schema verified");
    Ok(())
}

/// Drop all tables (used for database reset).
pub fn drop_tables(conn: &Connection) -> MochResult<()> {
    conn.execute_batch(
        "DROP TABLE IF EXISTS weight_entries;
         DROP TABLE IF EXISTS reminders;
         DROP TABLE IF EXISTS pet_photos;
         DROP TABLE IF EXISTS pets;
         DROP TABLE IF EXISTS app_configuration;
         DROP TABLE IF EXISTS schema_version;",
    )
    .map_err(|e| MochError::Storage(format!("failed to drop tables: {e}")))?;
    Ok(())
}

/// Complete SQL schema for all tables.
///
/// Timestamps are fixed-width RFC 3339 strings (microsecond precision, `Z`
/// suffix) and dates are `YYYY-MM-DD`, so text ordering equals time ordering.
const SCHEMA_SQL: &str = r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL
);

-- Pets
CREATE TABLE IF NOT EXISTS pets (
    id              TEXT PRIMARY KEY NOT NULL,
    name            TEXT NOT NULL CHECK (length(trim(name)) > 0),
    birthday        TEXT NOT NULL,
    type            TEXT NOT NULL CHECK (type IN ('dog', 'cat'))
);

CREATE INDEX IF NOT EXISTS idx_pets_name ON pets(name, id);

-- Pet photos, stored out-of-line and addressed by the owning pet
CREATE TABLE IF NOT EXISTS pet_photos (
    pet_id          TEXT PRIMARY KEY NOT NULL REFERENCES pets(id) ON DELETE CASCADE,
    data            BLOB NOT NULL
);

-- Reminders
CREATE TABLE IF NOT EXISTS reminders (
    id              TEXT PRIMARY KEY NOT NULL,
    title           TEXT NOT NULL CHECK (length(trim(title)) > 0),
    scheduled_date  TEXT NOT NULL,
    type            TEXT NOT NULL CHECK (type IN ('vetVisit', 'vaccine', 'medication', 'grooming', 'other')),
    notes           TEXT,
    is_completed    INTEGER NOT NULL DEFAULT 0,
    created_at      TEXT NOT NULL,
    pet_id          TEXT REFERENCES pets(id) ON DELETE SET NULL
);

CREATE INDEX IF NOT EXISTS idx_reminders_scheduled ON reminders(scheduled_date);
CREATE INDEX IF NOT EXISTS idx_reminders_pet_id ON reminders(pet_id);
CREATE INDEX IF NOT EXISTS idx_reminders_completed ON reminders(is_completed, scheduled_date);

-- Weight entries
CREATE TABLE IF NOT EXISTS weight_entries (
    id              TEXT PRIMARY KEY NOT NULL,
    weight          REAL NOT NULL CHECK (weight > 0),
    recorded_at     TEXT NOT NULL,
    notes           TEXT,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL,
    pet_id          TEXT NOT NULL REFERENCES pets(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_weight_entries_pet_recorded ON weight_entries(pet_id, recorded_at);

-- App configuration (at most one row)
CREATE TABLE IF NOT EXISTS app_configuration (
    singleton                   INTEGER PRIMARY KEY NOT NULL DEFAULT 1 CHECK (singleton = 1),
    id                          TEXT NOT NULL UNIQUE,
    notifications_enabled       INTEGER NOT NULL,
    default_lead_time_hours     REAL NOT NULL CHECK (default_lead_time_hours BETWEEN 1 AND 168),
    use_24_hour_clock           INTEGER NOT NULL
);
"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn table_exists(conn: &Connection, name: &str) -> bool {
        conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [name],
            |row| row.get::<_, i64>(0),
        )
        .unwrap()
            == 1
    }

    #[test]
    fn test_create_tables_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        create_tables(&conn).unwrap();
        for table in ["pets", "pet_photos", "reminders", "weight_entries", "app_configuration"] {
            assert!(table_exists(&conn, table), "missing table {table}");
        }
    }

    #[test]
    fn test_drop_tables() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        drop_tables(&conn).unwrap();
        assert!(!table_exists(&conn, "pets"));
    }

    #[test]
    fn test_configuration_table_holds_one_row() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        conn.execute(
            "INSERT INTO app_configuration (id, notifications_enabled, default_lead_time_hours, use_24_hour_clock)
             VALUES ('a', 1, 24, 0)",
            [],
        )
        .unwrap();
        let second = conn.execute(
            "INSERT INTO app_configuration (id, notifications_enabled, default_lead_time_hours, use_24_hour_clock)
             VALUES ('b', 1, 24, 0)",
            [],
        );
        assert!(second.is_err());
    }
}
