//! App configuration entity: the user's in-app preferences.
//!
//! At most one row exists. The table enforces this with a constant primary
//! key, so concurrent "ensure" calls converge on the same row.

use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use serde::Serialize;
use uuid::Uuid;

use moch_core::constants::{
    DEFAULT_LEAD_TIME_HOURS, DEFAULT_NOTIFICATIONS_ENABLED, DEFAULT_USE_24_HOUR_CLOCK,
};
use moch_core::error::{MochError, MochResult};

use super::columns::get_id;
use super::entity::{Entity, EntityKind, EntityRef, Id, Removal};
use crate::validation;

/// Singleton preference record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfiguration {
    id: Id,
    pub notifications_enabled: bool,
    pub default_lead_time_in_hours: f64,
    pub use_24_hour_clock: bool,
}

impl Default for AppConfiguration {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            notifications_enabled: DEFAULT_NOTIFICATIONS_ENABLED,
            default_lead_time_in_hours: DEFAULT_LEAD_TIME_HOURS,
            use_24_hour_clock: DEFAULT_USE_24_HOUR_CLOCK,
        }
    }
}

impl PartialEq for AppConfiguration {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl AppConfiguration {
    pub fn id(&self) -> Id {
        self.id
    }

    /// Restore the documented defaults, keeping the identifier.
    pub fn reset(&mut self) {
        let id = self.id;
        *self = Self {
            id,
            ..Self::default()
        };
    }

    /// Whether every preference equals its default.
    pub fn is_default(&self) -> bool {
        self.notifications_enabled == DEFAULT_NOTIFICATIONS_ENABLED
            && self.default_lead_time_in_hours == DEFAULT_LEAD_TIME_HOURS
            && self.use_24_hour_clock == DEFAULT_USE_24_HOUR_CLOCK
    }

    /// Construct an AppConfiguration from a database row.
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: get_id(row, "id")?,
            notifications_enabled: row.get::<_, i32>("notifications_enabled")? != 0,
            default_lead_time_in_hours: row.get("default_lead_time_hours")?,
            use_24_hour_clock: row.get::<_, i32>("use_24_hour_clock")? != 0,
        })
    }

    /// Load the single configuration row, if any.
    pub fn load_singleton(conn: &Connection) -> MochResult<Option<Self>> {
        conn.query_row(
            "SELECT * FROM app_configuration WHERE singleton = 1",
            [],
            Self::from_row,
        )
        .optional()
        .map_err(|e| MochError::Storage(e.to_string()))
    }

    /// Insert `self` unless a configuration row already exists.
    /// Returns `true` if this call created the row.
    pub fn insert_if_absent(&self, conn: &Connection) -> MochResult<bool> {
        let changed = conn
            .execute(
                "INSERT OR IGNORE INTO app_configuration (
                    singleton, id, notifications_enabled, default_lead_time_hours, use_24_hour_clock
                ) VALUES (1, ?1, ?2, ?3, ?4)",
                params![
                    self.id.to_string(),
                    self.notifications_enabled as i32,
                    self.default_lead_time_in_hours,
                    self.use_24_hour_clock as i32,
                ],
            )
            .map_err(|e| MochError::Storage(e.to_string()))?;
        Ok(changed == 1)
    }
}

impl Entity for AppConfiguration {
    const KIND: EntityKind = EntityKind::AppConfiguration;

    fn id(&self) -> Id {
        self.id
    }

    fn related_pet_id(&self) -> Option<Id> {
        None
    }

    fn validate(&self) -> MochResult<()> {
        validation::require_lead_time(self.default_lead_time_in_hours)
    }

    fn load(conn: &Connection, id: Id) -> MochResult<Option<Self>> {
        conn.query_row(
            "SELECT * FROM app_configuration WHERE id = ?1",
            [id.to_string()],
            Self::from_row,
        )
        .optional()
        .map_err(|e| MochError::Storage(e.to_string()))
    }

    fn insert_row(&self, conn: &Connection) -> MochResult<()> {
        let result = conn.execute(
            "INSERT INTO app_configuration (
                singleton, id, notifications_enabled, default_lead_time_hours, use_24_hour_clock
            ) VALUES (1, ?1, ?2, ?3, ?4)",
            params![
                self.id.to_string(),
                self.notifications_enabled as i32,
                self.default_lead_time_in_hours,
                self.use_24_hour_clock as i32,
            ],
        );
        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                Err(MochError::Validation(
                    "an app configuration already exists".to_string(),
                ))
            }
            Err(e) => Err(MochError::Storage(e.to_string())),
        }
    }

    fn update_row(&self, conn: &Connection) -> MochResult<()> {
        conn.execute(
            "UPDATE app_configuration SET
                notifications_enabled = ?2, default_lead_time_hours = ?3, use_24_hour_clock = ?4
             WHERE id = ?1",
            params![
                self.id.to_string(),
                self.notifications_enabled as i32,
                self.default_lead_time_in_hours,
                self.use_24_hour_clock as i32,
            ],
        )
        .map_err(|e| MochError::Storage(e.to_string()))?;
        Ok(())
    }

    fn remove(conn: &Connection, id: Id) -> MochResult<Option<Removal>> {
        let changed = conn
            .execute("DELETE FROM app_configuration WHERE id = ?1", [id.to_string()])
            .map_err(|e| MochError::Storage(e.to_string()))?;
        if changed == 0 {
            return Ok(None);
        }
        Ok(Some(Removal::single(EntityRef {
            kind: EntityKind::AppConfiguration,
            id,
            related_pet_id: None,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfiguration::default();
        assert!(config.notifications_enabled);
        assert_eq!(config.default_lead_time_in_hours, 24.0);
        assert!(!config.use_24_hour_clock);
        assert!(config.is_default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_reset_keeps_identity() {
        let mut config = AppConfiguration::default();
        let id = config.id();
        config.notifications_enabled = false;
        config.default_lead_time_in_hours = 72.0;
        config.reset();
        assert_eq!(config.id(), id);
        assert!(config.is_default());
    }

    #[test]
    fn test_lead_time_out_of_range() {
        let mut config = AppConfiguration::default();
        config.default_lead_time_in_hours = 0.0;
        assert!(matches!(config.validate(), Err(MochError::Validation(_))));
        config.default_lead_time_in_hours = 200.0;
        assert!(config.validate().is_err());
    }
}
