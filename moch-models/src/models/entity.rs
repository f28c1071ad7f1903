//! The `Entity` trait: what the store needs to know about every record kind.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use moch_core::error::MochResult;

/// Stable, globally-unique identifier assigned to every entity at creation.
pub type Id = Uuid;

/// The four persisted record kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Pet,
    Reminder,
    WeightEntry,
    AppConfiguration,
}

impl EntityKind {
    /// Lower-case name used in logs and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Pet => "pet",
            EntityKind::Reminder => "reminder",
            EntityKind::WeightEntry => "weight_entry",
            EntityKind::AppConfiguration => "app_configuration",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A lightweight pointer to a stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: Id,
    /// The pet this record belongs (or belonged) to, if any.
    pub related_pet_id: Option<Id>,
}

/// Everything a delete touched, in the order it was applied.
#[derive(Debug, Clone)]
pub struct Removal {
    /// The record that was asked to be deleted.
    pub target: EntityRef,
    /// Dependents deleted along with the target.
    pub deleted: Vec<EntityRef>,
    /// Dependents whose pet reference was cleared. `related_pet_id` holds the
    /// pet they pointed at before the delete.
    pub detached: Vec<EntityRef>,
}

impl Removal {
    /// A removal with no dependents.
    pub fn single(target: EntityRef) -> Self {
        Self {
            target,
            deleted: Vec::new(),
            detached: Vec::new(),
        }
    }
}

/// A persisted record kind.
///
/// Implementations own their row mapping; the store drives the lifecycle
/// (normalize, validate, check references, write, verify) uniformly.
pub trait Entity: Clone + Send + Sync + 'static {
    /// Which kind this is.
    const KIND: EntityKind;

    /// The record's identifier.
    fn id(&self) -> Id;

    /// Pet the record belongs to, used to scope change notifications.
    fn related_pet_id(&self) -> Option<Id>;

    /// Bring fields into canonical form (trimming, precision) before validation.
    fn normalize(&mut self) {}

    /// Check the record's own invariants.
    fn validate(&self) -> MochResult<()>;

    /// Check references to other records against the current store contents.
    fn check_references(&self, _conn: &Connection) -> MochResult<()> {
        Ok(())
    }

    /// Refresh bookkeeping fields (e.g. `updated_at`) before an update is written.
    fn touch(&mut self) {}

    /// Verify that what was written is consistent. An error here is an
    /// integrity violation and aborts the surrounding transaction.
    fn verify_persisted(&self, _conn: &Connection) -> MochResult<()> {
        Ok(())
    }

    /// Load a record by id. Missing records are `Ok(None)`.
    fn load(conn: &Connection, id: Id) -> MochResult<Option<Self>>;

    /// Insert a new row.
    fn insert_row(&self, conn: &Connection) -> MochResult<()>;

    /// Overwrite the existing row with this record's fields.
    fn update_row(&self, conn: &Connection) -> MochResult<()>;

    /// Delete the row and apply relationship rules to its dependents.
    /// Returns `Ok(None)` when no such row exists.
    fn remove(conn: &Connection, id: Id) -> MochResult<Option<Removal>>;

    /// Reference to this record, for change notifications.
    fn entity_ref(&self) -> EntityRef {
        EntityRef {
            kind: Self::KIND,
            id: self.id(),
            related_pet_id: self.related_pet_id(),
        }
    }
}
