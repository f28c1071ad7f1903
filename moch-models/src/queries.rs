//! Query builders for the read paths the presentation layer needs.
//!
//! Every function is a point-in-time snapshot over a connection: it returns the
//! current matching rows in a total order and keeps no state. Views that need
//! to stay current re-run the query when the change bus says their scope was
//! touched.

use rusqlite::{params_from_iter, Connection};
use rusqlite::types::Value;
use moch_core::error::{MochError, MochResult};
use tracing::debug;

use crate::models::entity::Id;
use crate::models::pet::Pet;
use crate::models::reminder::Reminder;
use crate::models::weight_entry::WeightEntry;

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    fn as_sql(&self) -> &str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

// ─── Pet Queries ────────────────────────────────────────────────────────────

/// All pets, ascending by name; equal names are ordered by identifier.
pub fn list_pets(conn: &Connection) -> MochResult<Vec<Pet>> {
    let mut stmt = conn
        .prepare(
            "SELECT p.*, ph.data AS photo
             FROM pets p LEFT JOIN pet_photos ph ON ph.pet_id = p.id
             ORDER BY p.name ASC, p.id ASC",
        )
        .map_err(|e| MochError::Storage(e.to_string()))?;

    let pets = stmt
        .query_map([], Pet::from_row)
        .map_err(|e| MochError::Storage(e.to_string()))?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| MochError::Storage(e.to_string()))?;

    debug!("list_pets returned {} row(s)", pets.len());
    Ok(pets)
}

// ─── Reminder Queries ───────────────────────────────────────────────────────

/// Filter for [`list_reminders`]. Unset fields do not constrain the result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReminderFilter {
    /// Only reminders assigned to this pet.
    pub pet_id: Option<Id>,
    /// `Some(false)` for upcoming, `Some(true)` for completed, `None` for both.
    pub completed: Option<bool>,
}

impl ReminderFilter {
    /// Every reminder.
    pub fn all() -> Self {
        Self::default()
    }

    /// Reminders not yet completed.
    pub fn upcoming() -> Self {
        Self {
            completed: Some(false),
            ..Self::default()
        }
    }

    /// Reminders already completed.
    pub fn completed() -> Self {
        Self {
            completed: Some(true),
            ..Self::default()
        }
    }

    /// Narrow this filter to one pet.
    pub fn for_pet(mut self, pet_id: Id) -> Self {
        self.pet_id = Some(pet_id);
        self
    }
}

/// Reminders matching `filter`, ascending by scheduled date (ties broken by
/// creation time, then identifier).
pub fn list_reminders(conn: &Connection, filter: &ReminderFilter) -> MochResult<Vec<Reminder>> {
    let mut clauses: Vec<&str> = Vec::new();
    let mut values: Vec<Value> = Vec::new();

    if let Some(pet_id) = filter.pet_id {
        values.push(Value::Text(pet_id.to_string()));
        clauses.push("pet_id = ?");
    }
    if let Some(completed) = filter.completed {
        values.push(Value::Integer(completed as i64));
        clauses.push("is_completed = ?");
    }

    let where_clause = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };

    let sql = format!(
        "SELECT * FROM reminders {where_clause}
         ORDER BY scheduled_date ASC, created_at ASC, id ASC"
    );

    let mut stmt = conn.prepare(&sql).map_err(|e| MochError::Storage(e.to_string()))?;
    let reminders = stmt
        .query_map(params_from_iter(values), Reminder::from_row)
        .map_err(|e| MochError::Storage(e.to_string()))?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| MochError::Storage(e.to_string()))?;

    debug!("list_reminders {filter:?} returned {} row(s)", reminders.len());
    Ok(reminders)
}

/// Split an ordered reminder list into (upcoming, completed), keeping order.
pub fn partition_reminders(reminders: Vec<Reminder>) -> (Vec<Reminder>, Vec<Reminder>) {
    reminders.into_iter().partition(|r| !r.is_completed)
}

// ─── Weight Queries ─────────────────────────────────────────────────────────

/// All weight entries for one pet ordered by `recorded_at` in `direction`
/// (ties broken by creation time, then identifier, in the same direction).
///
/// Filters on the denormalized `pet_id` column; no join with `pets`.
pub fn list_weight_entries(
    conn: &Connection,
    pet_id: Id,
    direction: SortDirection,
) -> MochResult<Vec<WeightEntry>> {
    let dir = direction.as_sql();
    let sql = format!(
        "SELECT * FROM weight_entries WHERE pet_id = ?1
         ORDER BY recorded_at {dir}, created_at {dir}, id {dir}"
    );

    let mut stmt = conn.prepare(&sql).map_err(|e| MochError::Storage(e.to_string()))?;
    let entries = stmt
        .query_map([pet_id.to_string()], WeightEntry::from_row)
        .map_err(|e| MochError::Storage(e.to_string()))?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| MochError::Storage(e.to_string()))?;

    debug!("list_weight_entries pet={pet_id} returned {} row(s)", entries.len());
    Ok(entries)
}

/// Most recent weight entry for a pet, if any.
pub fn latest_weight_entry(conn: &Connection, pet_id: Id) -> MochResult<Option<WeightEntry>> {
    Ok(list_weight_entries(conn, pet_id, SortDirection::Desc)?
        .into_iter()
        .next())
}
