//! Weight entry entity model.
//!
//! A weight entry always belongs to exactly one pet. The owning pet is fixed at
//! construction: `pet_id` has no setter, so the denormalized column used by the
//! filtered query path cannot drift from the pet reference.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use tracing::error;
use uuid::Uuid;

use moch_core::error::{MochError, MochResult};

use super::columns::{self, encode_date, encode_timestamp, get_date, get_id, get_timestamp};
use super::entity::{Entity, EntityKind, EntityRef, Id, Removal};
use super::pet::Pet;
use crate::validation;

/// One weight measurement, in kilograms.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightEntry {
    id: Id,
    pub weight: f64,
    pub recorded_at: NaiveDate,
    pub notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    pet_id: Id,
}

impl PartialEq for WeightEntry {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl WeightEntry {
    /// Create a measurement for `pet`.
    pub fn new(pet: &Pet, weight: f64, recorded_at: NaiveDate) -> Self {
        Self::for_pet_id(pet.id(), weight, recorded_at)
    }

    /// Create a measurement when only the pet's identifier is at hand.
    /// The store rejects it if no such pet exists.
    pub fn for_pet_id(pet_id: Id, weight: f64, recorded_at: NaiveDate) -> Self {
        let now = columns::now();
        Self {
            id: Uuid::new_v4(),
            weight,
            recorded_at,
            notes: None,
            created_at: now,
            updated_at: now,
            pet_id,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn id(&self) -> Id {
        self.id
    }

    /// The owning pet. Immutable after creation.
    pub fn pet_id(&self) -> Id {
        self.pet_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Construct a WeightEntry from a database row.
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: get_id(row, "id")?,
            weight: row.get("weight")?,
            recorded_at: get_date(row, "recorded_at")?,
            notes: row.get("notes")?,
            created_at: get_timestamp(row, "created_at")?,
            updated_at: get_timestamp(row, "updated_at")?,
            pet_id: get_id(row, "pet_id")?,
        })
    }

    fn stored_pet_id(conn: &Connection, id: Id) -> MochResult<Option<Id>> {
        conn.query_row(
            "SELECT pet_id FROM weight_entries WHERE id = ?1",
            [id.to_string()],
            |row| get_id(row, "pet_id"),
        )
        .optional()
        .map_err(|e| MochError::Storage(e.to_string()))
    }
}

impl Entity for WeightEntry {
    const KIND: EntityKind = EntityKind::WeightEntry;

    fn id(&self) -> Id {
        self.id
    }

    fn related_pet_id(&self) -> Option<Id> {
        Some(self.pet_id)
    }

    fn normalize(&mut self) {
        self.notes = validation::trimmed_optional(self.notes.as_deref());
    }

    fn validate(&self) -> MochResult<()> {
        validation::require_positive_weight(self.weight)
    }

    fn check_references(&self, conn: &Connection) -> MochResult<()> {
        if !Pet::exists(conn, self.pet_id)? {
            return Err(MochError::not_found(EntityKind::Pet.as_str(), self.pet_id));
        }
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = columns::now().max(self.created_at);
    }

    fn verify_persisted(&self, conn: &Connection) -> MochResult<()> {
        match Self::stored_pet_id(conn, self.id)? {
            Some(stored) if stored == self.pet_id => Ok(()),
            Some(stored) => {
                error!(
                    "weight entry {} stored pet_id {stored} diverges from pet {}",
                    self.id, self.pet_id
                );
                Err(MochError::Integrity(format!(
                    "weight entry {} pet_id diverged from its pet reference",
                    self.id
                )))
            }
            None => Err(MochError::Integrity(format!(
                "weight entry {} missing after write",
                self.id
            ))),
        }
    }

    fn load(conn: &Connection, id: Id) -> MochResult<Option<Self>> {
        conn.query_row(
            "SELECT * FROM weight_entries WHERE id = ?1",
            [id.to_string()],
            Self::from_row,
        )
        .optional()
        .map_err(|e| MochError::Storage(e.to_string()))
    }

    fn insert_row(&self, conn: &Connection) -> MochResult<()> {
        conn.execute(
            "INSERT INTO weight_entries (
                id, weight, recorded_at, notes, created_at, updated_at, pet_id
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                self.id.to_string(),
                self.weight,
                encode_date(&self.recorded_at),
                self.notes,
                encode_timestamp(&self.created_at),
                encode_timestamp(&self.updated_at),
                self.pet_id.to_string(),
            ],
        )
        .map_err(|e| MochError::Storage(e.to_string()))?;
        Ok(())
    }

    /// The pet column is part of the row key here, never of the SET list.
    fn update_row(&self, conn: &Connection) -> MochResult<()> {
        let changed = conn
            .execute(
                "UPDATE weight_entries SET
                    weight = ?3, recorded_at = ?4, notes = ?5, updated_at = ?6
                 WHERE id = ?1 AND pet_id = ?2",
                params![
                    self.id.to_string(),
                    self.pet_id.to_string(),
                    self.weight,
                    encode_date(&self.recorded_at),
                    self.notes,
                    encode_timestamp(&self.updated_at),
                ],
            )
            .map_err(|e| MochError::Storage(e.to_string()))?;
        if changed != 1 {
            return Err(MochError::Integrity(format!(
                "weight entry {} not updated for pet {}",
                self.id, self.pet_id
            )));
        }
        Ok(())
    }

    fn remove(conn: &Connection, id: Id) -> MochResult<Option<Removal>> {
        let Some(pet_id) = Self::stored_pet_id(conn, id)? else {
            return Ok(None);
        };
        conn.execute("DELETE FROM weight_entries WHERE id = ?1", [id.to_string()])
            .map_err(|e| MochError::Storage(e.to_string()))?;
        Ok(Some(Removal::single(EntityRef {
            kind: EntityKind::WeightEntry,
            id,
            related_pet_id: Some(pet_id),
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::pet::PetType;

    fn pet() -> Pet {
        Pet::new("Mochi", NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(), PetType::Dog)
    }

    #[test]
    fn test_pet_id_follows_pet() {
        let pet = pet();
        let entry = WeightEntry::new(&pet, 5.4, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(entry.pet_id(), pet.id());
        assert_eq!(entry.related_pet_id(), Some(pet.id()));
        assert_eq!(entry.created_at(), entry.updated_at());
    }

    #[test]
    fn test_non_positive_weight_is_invalid() {
        let pet = pet();
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(WeightEntry::new(&pet, -1.0, day).validate().is_err());
        assert!(WeightEntry::new(&pet, 0.0, day).validate().is_err());
        assert!(WeightEntry::new(&pet, 0.1, day).validate().is_ok());
    }

    #[test]
    fn test_touch_advances_updated_at() {
        let pet = pet();
        let mut entry = WeightEntry::new(&pet, 5.0, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        let before = entry.updated_at();
        entry.touch();
        assert!(entry.updated_at() >= before);
        assert_eq!(entry.created_at(), before);
    }
}
