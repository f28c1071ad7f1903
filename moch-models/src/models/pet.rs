//! Pet entity model.

use std::str::FromStr;

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use uuid::Uuid;

use moch_core::error::{MochError, MochResult};

use super::columns::{encode_date, get_date, get_id, get_tag};
use super::entity::{Entity, EntityKind, EntityRef, Id, Removal};
use super::UnknownVariant;
use crate::validation;

/// Kind of animal. Only dogs and cats are tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PetType {
    Dog,
    Cat,
}

impl PetType {
    pub const ALL: [PetType; 2] = [PetType::Dog, PetType::Cat];

    /// Storage tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            PetType::Dog => "dog",
            PetType::Cat => "cat",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            PetType::Dog => "Dog",
            PetType::Cat => "Cat",
        }
    }
}

impl FromStr for PetType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dog" => Ok(PetType::Dog),
            "cat" => Ok(PetType::Cat),
            _ => Err(UnknownVariant {
                kind: "pet type",
                value: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for PetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A pet. Reminders and weight entries point at pets; pets hold no list of
/// their dependents.
#[derive(Debug, Clone, Serialize)]
pub struct Pet {
    id: Id,
    pub name: String,
    pub birthday: NaiveDate,
    #[serde(rename = "type")]
    pub pet_type: PetType,
    /// Photo bytes, persisted out-of-line in `pet_photos`.
    #[serde(skip)]
    pub photo: Option<Vec<u8>>,
}

impl PartialEq for Pet {
    /// Two handles are the same logical pet iff their identifiers match.
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Pet {}

impl Pet {
    /// Create a new, not yet persisted pet with a fresh identifier.
    pub fn new(name: impl Into<String>, birthday: NaiveDate, pet_type: PetType) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            birthday,
            pet_type,
            photo: None,
        }
    }

    /// Attach photo bytes at construction time.
    pub fn with_photo(mut self, photo: Vec<u8>) -> Self {
        self.photo = Some(photo);
        self
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn has_photo(&self) -> bool {
        self.photo.as_ref().is_some_and(|p| !p.is_empty())
    }

    /// Whole years between the birthday and `today` (0 for future birthdays).
    pub fn age_in_years(&self, today: NaiveDate) -> u32 {
        today.years_since(self.birthday).unwrap_or(0)
    }

    /// Construct a Pet from a row of `SELECT p.*, ph.data AS photo ...`.
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: get_id(row, "id")?,
            name: row.get("name")?,
            birthday: get_date(row, "birthday")?,
            pet_type: get_tag(row, "type")?,
            photo: row.get("photo")?,
        })
    }

    /// Whether a pet with this id exists.
    pub fn exists(conn: &Connection, id: Id) -> MochResult<bool> {
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM pets WHERE id = ?1)",
            [id.to_string()],
            |row| row.get(0),
        )
        .map_err(|e| MochError::Storage(e.to_string()))
    }

    fn save_photo(&self, conn: &Connection) -> MochResult<()> {
        match self.photo.as_deref().filter(|p| !p.is_empty()) {
            Some(bytes) => {
                conn.execute(
                    "INSERT INTO pet_photos (pet_id, data) VALUES (?1, ?2)
                     ON CONFLICT(pet_id) DO UPDATE SET data = excluded.data
                     WHERE pet_photos.data IS NOT excluded.data",
                    params![self.id.to_string(), bytes],
                )
                .map_err(|e| MochError::Storage(e.to_string()))?;
            }
            None => {
                conn.execute(
                    "DELETE FROM pet_photos WHERE pet_id = ?1",
                    [self.id.to_string()],
                )
                .map_err(|e| MochError::Storage(e.to_string()))?;
            }
        }
        Ok(())
    }

    fn dependent_ids(conn: &Connection, table: &str, pet_id: Id) -> MochResult<Vec<Id>> {
        let sql = format!("SELECT id FROM {table} WHERE pet_id = ?1 ORDER BY id");
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| MochError::Storage(e.to_string()))?;
        let ids = stmt
            .query_map([pet_id.to_string()], |row| get_id(row, "id"))
            .map_err(|e| MochError::Storage(e.to_string()))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| MochError::Storage(e.to_string()))?;
        Ok(ids)
    }

    fn count_dependents(conn: &Connection, table: &str, pet_id: Id) -> MochResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM {table} WHERE pet_id = ?1");
        conn.query_row(&sql, [pet_id.to_string()], |row| row.get(0))
            .map_err(|e| MochError::Storage(e.to_string()))
    }
}

impl Entity for Pet {
    const KIND: EntityKind = EntityKind::Pet;

    fn id(&self) -> Id {
        self.id
    }

    /// A pet scopes its own notifications, so a pet-scoped view also hears
    /// about renames, photo changes and deletion of the pet itself.
    fn related_pet_id(&self) -> Option<Id> {
        Some(self.id)
    }

    fn normalize(&mut self) {
        self.name = validation::trimmed(&self.name);
        if self.photo.as_ref().is_some_and(|p| p.is_empty()) {
            self.photo = None;
        }
    }

    fn validate(&self) -> MochResult<()> {
        validation::require_non_empty("pet name", &self.name)
    }

    fn load(conn: &Connection, id: Id) -> MochResult<Option<Self>> {
        conn.query_row(
            "SELECT p.*, ph.data AS photo
             FROM pets p LEFT JOIN pet_photos ph ON ph.pet_id = p.id
             WHERE p.id = ?1",
            [id.to_string()],
            Self::from_row,
        )
        .optional()
        .map_err(|e| MochError::Storage(e.to_string()))
    }

    fn insert_row(&self, conn: &Connection) -> MochResult<()> {
        conn.execute(
            "INSERT INTO pets (id, name, birthday, type) VALUES (?1, ?2, ?3, ?4)",
            params![
                self.id.to_string(),
                self.name,
                encode_date(&self.birthday),
                self.pet_type.as_str(),
            ],
        )
        .map_err(|e| MochError::Storage(e.to_string()))?;
        self.save_photo(conn)
    }

    fn update_row(&self, conn: &Connection) -> MochResult<()> {
        conn.execute(
            "UPDATE pets SET name = ?2, birthday = ?3, type = ?4 WHERE id = ?1",
            params![
                self.id.to_string(),
                self.name,
                encode_date(&self.birthday),
                self.pet_type.as_str(),
            ],
        )
        .map_err(|e| MochError::Storage(e.to_string()))?;
        self.save_photo(conn)
    }

    /// Cascade-deletes the pet's weight entries and clears the pet reference
    /// of its reminders before deleting the pet row.
    fn remove(conn: &Connection, id: Id) -> MochResult<Option<Removal>> {
        if !Self::exists(conn, id)? {
            return Ok(None);
        }

        let weight_ids = Self::dependent_ids(conn, "weight_entries", id)?;
        let reminder_ids = Self::dependent_ids(conn, "reminders", id)?;
        let key = id.to_string();

        conn.execute("DELETE FROM weight_entries WHERE pet_id = ?1", [&key])
            .map_err(|e| MochError::Storage(e.to_string()))?;
        conn.execute("UPDATE reminders SET pet_id = NULL WHERE pet_id = ?1", [&key])
            .map_err(|e| MochError::Storage(e.to_string()))?;
        conn.execute("DELETE FROM pet_photos WHERE pet_id = ?1", [&key])
            .map_err(|e| MochError::Storage(e.to_string()))?;
        conn.execute("DELETE FROM pets WHERE id = ?1", [&key])
            .map_err(|e| MochError::Storage(e.to_string()))?;

        let leftover = Self::count_dependents(conn, "weight_entries", id)?
            + Self::count_dependents(conn, "reminders", id)?;
        if leftover != 0 {
            error!("pet {id} still has {leftover} dependent row(s) after cascade");
            return Err(MochError::Integrity(format!(
                "cascade for pet {id} left {leftover} dependent row(s)"
            )));
        }

        debug!(
            "removed pet {id}: {} weight entries deleted, {} reminders detached",
            weight_ids.len(),
            reminder_ids.len()
        );

        Ok(Some(Removal {
            target: EntityRef {
                kind: EntityKind::Pet,
                id,
                related_pet_id: Some(id),
            },
            deleted: weight_ids
                .into_iter()
                .map(|wid| EntityRef {
                    kind: EntityKind::WeightEntry,
                    id: wid,
                    related_pet_id: Some(id),
                })
                .collect(),
            detached: reminder_ids
                .into_iter()
                .map(|rid| EntityRef {
                    kind: EntityKind::Reminder,
                    id: rid,
                    related_pet_id: Some(id),
                })
                .collect(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pet_type_parsing() {
        assert_eq!("dog".parse::<PetType>().unwrap(), PetType::Dog);
        assert_eq!(" Cat ".parse::<PetType>().unwrap(), PetType::Cat);
        assert!("hamster".parse::<PetType>().is_err());
        assert_eq!(PetType::Cat.to_string(), "Cat");
    }

    #[test]
    fn test_identity_equality() {
        let birthday = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let pet = Pet::new("Mochi", birthday, PetType::Dog);
        let mut renamed = pet.clone();
        renamed.name = "Mochi II".into();
        assert_eq!(pet, renamed);
        assert_ne!(pet, Pet::new("Mochi", birthday, PetType::Dog));
    }

    #[test]
    fn test_normalize_and_validate() {
        let birthday = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let mut pet = Pet::new("  Mochi  ", birthday, PetType::Cat).with_photo(Vec::new());
        pet.normalize();
        assert_eq!(pet.name, "Mochi");
        assert!(pet.photo.is_none());
        assert!(pet.validate().is_ok());

        let mut blank = Pet::new("   ", birthday, PetType::Cat);
        blank.normalize();
        assert!(matches!(blank.validate(), Err(MochError::Validation(_))));
    }

    #[test]
    fn test_age_in_years() {
        let pet = Pet::new("Mochi", NaiveDate::from_ymd_opt(2020, 6, 15).unwrap(), PetType::Dog);
        assert_eq!(pet.age_in_years(NaiveDate::from_ymd_opt(2024, 6, 14).unwrap()), 3);
        assert_eq!(pet.age_in_years(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()), 4);
        assert_eq!(pet.age_in_years(NaiveDate::from_ymd_opt(2019, 1, 1).unwrap()), 0);
    }

    #[test]
    fn test_json_uses_type_key() {
        let pet = Pet::new("Mochi", NaiveDate::from_ymd_opt(2020, 6, 15).unwrap(), PetType::Dog);
        let json = serde_json::to_value(&pet).unwrap();
        assert_eq!(json["type"], "dog");
        assert_eq!(json["birthday"], "2020-06-15");
        assert!(json.get("photo").is_none());
    }
}
