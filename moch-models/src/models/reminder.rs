//! Reminder entity model.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use moch_core::error::{MochError, MochResult};

use super::columns::{self, encode_timestamp, get_id, get_optional_id, get_tag, get_timestamp};
use super::entity::{Entity, EntityKind, EntityRef, Id, Removal};
use super::pet::Pet;
use super::UnknownVariant;
use crate::validation;

/// Category of a care reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReminderType {
    VetVisit,
    Vaccine,
    Medication,
    Grooming,
    Other,
}

impl ReminderType {
    pub const ALL: [ReminderType; 5] = [
        ReminderType::VetVisit,
        ReminderType::Vaccine,
        ReminderType::Medication,
        ReminderType::Grooming,
        ReminderType::Other,
    ];

    /// Storage tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderType::VetVisit => "vetVisit",
            ReminderType::Vaccine => "vaccine",
            ReminderType::Medication => "medication",
            ReminderType::Grooming => "grooming",
            ReminderType::Other => "other",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ReminderType::VetVisit => "Vet Visit",
            ReminderType::Vaccine => "Vaccine",
            ReminderType::Medication => "Medication",
            ReminderType::Grooming => "Grooming",
            ReminderType::Other => "Other",
        }
    }
}

impl FromStr for ReminderType {
    type Err = UnknownVariant;

    /// Accepts the storage tag case-insensitively, with `-`/`_` separators
    /// ignored, so `vet-visit` and `vetVisit` both parse.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded: String = s
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_' && *c != ' ')
            .collect::<String>()
            .to_ascii_lowercase();
        ReminderType::ALL
            .into_iter()
            .find(|t| t.as_str().to_ascii_lowercase() == folded)
            .ok_or_else(|| UnknownVariant {
                kind: "reminder type",
                value: s.to_string(),
            })
    }
}

impl std::fmt::Display for ReminderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A scheduled care task, optionally tied to one pet.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    id: Id,
    pub title: String,
    pub scheduled_date: DateTime<Utc>,
    #[serde(rename = "type")]
    pub reminder_type: ReminderType,
    pub notes: Option<String>,
    pub is_completed: bool,
    created_at: DateTime<Utc>,
    /// Pet this reminder is for; `None` when unassigned or the pet was deleted.
    pub pet_id: Option<Id>,
}

impl PartialEq for Reminder {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Reminder {}

impl Reminder {
    /// Create a new, open reminder with a fresh identifier and `created_at = now`.
    pub fn new(
        title: impl Into<String>,
        scheduled_date: DateTime<Utc>,
        reminder_type: ReminderType,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            scheduled_date: columns::stored_precision(scheduled_date),
            reminder_type,
            notes: None,
            is_completed: false,
            created_at: columns::now(),
            pet_id: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn for_pet(mut self, pet_id: Id) -> Self {
        self.pet_id = Some(pet_id);
        self
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Construct a Reminder from a database row.
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: get_id(row, "id")?,
            title: row.get("title")?,
            scheduled_date: get_timestamp(row, "scheduled_date")?,
            reminder_type: get_tag(row, "type")?,
            notes: row.get("notes")?,
            is_completed: row.get::<_, i32>("is_completed")? != 0,
            created_at: get_timestamp(row, "created_at")?,
            pet_id: get_optional_id(row, "pet_id")?,
        })
    }

    fn write_params(&self, conn: &Connection, sql: &str) -> MochResult<usize> {
        conn.execute(
            sql,
            params![
                self.id.to_string(),
                self.title,
                encode_timestamp(&self.scheduled_date),
                self.reminder_type.as_str(),
                self.notes,
                self.is_completed as i32,
                encode_timestamp(&self.created_at),
                self.pet_id.map(|p| p.to_string()),
            ],
        )
        .map_err(|e| MochError::Storage(e.to_string()))
    }
}

impl Entity for Reminder {
    const KIND: EntityKind = EntityKind::Reminder;

    fn id(&self) -> Id {
        self.id
    }

    fn related_pet_id(&self) -> Option<Id> {
        self.pet_id
    }

    fn normalize(&mut self) {
        self.title = validation::trimmed(&self.title);
        self.notes = validation::trimmed_optional(self.notes.as_deref());
        self.scheduled_date = columns::stored_precision(self.scheduled_date);
    }

    fn validate(&self) -> MochResult<()> {
        validation::require_non_empty("reminder title", &self.title)
    }

    fn check_references(&self, conn: &Connection) -> MochResult<()> {
        match self.pet_id {
            Some(pet_id) if !Pet::exists(conn, pet_id)? => {
                Err(MochError::not_found(EntityKind::Pet.as_str(), pet_id))
            }
            _ => Ok(()),
        }
    }

    fn load(conn: &Connection, id: Id) -> MochResult<Option<Self>> {
        conn.query_row(
            "SELECT * FROM reminders WHERE id = ?1",
            [id.to_string()],
            Self::from_row,
        )
        .optional()
        .map_err(|e| MochError::Storage(e.to_string()))
    }

    fn insert_row(&self, conn: &Connection) -> MochResult<()> {
        self.write_params(
            conn,
            "INSERT INTO reminders (
                id, title, scheduled_date, type, notes, is_completed, created_at, pet_id
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )?;
        Ok(())
    }

    fn update_row(&self, conn: &Connection) -> MochResult<()> {
        // created_at (?7) is bound but never rewritten.
        self.write_params(
            conn,
            "UPDATE reminders SET
                title = ?2, scheduled_date = ?3, type = ?4, notes = ?5,
                is_completed = ?6, pet_id = ?8
             WHERE id = ?1 AND created_at = ?7",
        )?;
        Ok(())
    }

    fn remove(conn: &Connection, id: Id) -> MochResult<Option<Removal>> {
        let Some(existing) = Self::load(conn, id)? else {
            return Ok(None);
        };
        conn.execute("DELETE FROM reminders WHERE id = ?1", [id.to_string()])
            .map_err(|e| MochError::Storage(e.to_string()))?;
        Ok(Some(Removal::single(EntityRef {
            kind: EntityKind::Reminder,
            id,
            related_pet_id: existing.pet_id,
        })))
    }
}
