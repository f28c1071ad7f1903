//! Shared test utilities for integration tests.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use moch_core::config::DatabaseConfig;
use moch_models::{Database, Pet, PetType};
use moch_services::{ChangeBus, ChangeEvent, Scope, Store, Subscription};
use tempfile::TempDir;

/// Path of the test database inside `dir`.
pub fn db_path(dir: &TempDir) -> PathBuf {
    dir.path().join("test.db")
}

/// Create a temporary database with full schema and migrations applied.
/// Returns the Database and the TempDir (must be held alive for the duration of the test).
pub fn create_test_db() -> (Database, TempDir) {
    let dir = TempDir::new().expect("failed to create temp dir");
    let config = DatabaseConfig::default();
    let db = Database::init(&db_path(&dir), &config).expect("failed to init test database");
    (db, dir)
}

/// Create a store over a fresh temporary database with its own bus.
pub fn create_test_store() -> (Store, TempDir) {
    let dir = TempDir::new().expect("failed to create temp dir");
    let store = open_store(&dir);
    (store, dir)
}

/// Open a store over the database already living in `dir`.
pub fn open_store(dir: &TempDir) -> Store {
    Store::open(&db_path(dir), &DatabaseConfig::default(), ChangeBus::new())
        .expect("failed to open test store")
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("invalid test date")
}

/// Insert a pet and return it as stored.
pub fn seed_pet(store: &Store, name: &str, pet_type: PetType) -> Pet {
    let id = store
        .insert(Pet::new(name, date(2020, 4, 1), pet_type))
        .expect("failed to insert pet");
    store
        .get::<Pet>(id)
        .expect("failed to load pet")
        .expect("pet missing after insert")
}

/// Subscribe a recorder that keeps every delivered event.
pub fn record(bus: &ChangeBus, scope: Scope) -> (Subscription, Arc<Mutex<Vec<ChangeEvent>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let sub = bus.subscribe(scope, move |event| sink.lock().unwrap().push(*event));
    (sub, seen)
}
