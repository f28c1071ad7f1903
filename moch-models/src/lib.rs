//! Moch Models - Entity schema, SQLite persistence, migrations and queries.
//!
//! This crate owns all data persistence: database initialization and pooling,
//! the four entity models and their validation rules, versioned migrations,
//! and the read-only query layer.

pub mod db;
pub mod schema;
pub mod models;
pub mod queries;
pub mod migrations;
pub mod validation;

// Re-export key types
pub use db::{Database, DbPool, DatabaseStats};
pub use models::entity::{Entity, EntityKind, EntityRef, Id, Removal};
pub use models::pet::{Pet, PetType};
pub use models::reminder::{Reminder, ReminderType};
pub use models::weight_entry::WeightEntry;
pub use models::app_configuration::AppConfiguration;
pub use queries::{ReminderFilter, SortDirection};
