//! Integration tests for process configuration.
//!
//! Tests TOML loading with partial sections, save/reload, and bringing a store
//! up from a configuration file the way the CLI does.

use moch_core::config::MochConfig;
use moch_services::{ChangeBus, Service, ServiceState, Store};
use tempfile::TempDir;

#[test]
fn partial_toml_fills_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[logging]\nlevel = \"debug\"\n").unwrap();

    let config = MochConfig::load_from_file(&path).unwrap();
    assert_eq!(config.logging.level, "debug");
    assert!(config.database.wal_mode);
    assert_eq!(config.database.pool_size, 4);
    assert!(config.database.path.is_empty());
}

#[test]
fn config_round_trips_through_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut config = MochConfig::default();
    config.database.path = dir.path().join("pets.db").to_string_lossy().into_owned();
    config.database.pool_size = 2;
    config.logging.json_output = true;
    config.save_to_file(&path).unwrap();

    let loaded = MochConfig::load_from_file(&path).unwrap();
    assert_eq!(loaded.database.path, config.database.path);
    assert_eq!(loaded.database.pool_size, 2);
    assert!(loaded.logging.json_output);
}

#[test]
fn malformed_toml_is_config_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[database\npath = ").unwrap();

    let err = MochConfig::load_from_file(&path).unwrap_err();
    assert!(matches!(err, moch_core::MochError::Config(_)));
}

#[test]
fn store_starts_from_configured_path() {
    let dir = TempDir::new().unwrap();
    let mut config = MochConfig::default();
    config.database.path = dir.path().join("pets.db").to_string_lossy().into_owned();

    let db_path = config.effective_db_path().unwrap();
    let mut store = Store::open(&db_path, &config.database, ChangeBus::new()).unwrap();
    assert_eq!(store.state(), ServiceState::Created);

    store.init().unwrap();
    assert!(store.is_healthy());
    assert!(db_path.exists());
    assert!(store.configuration().unwrap().is_some());

    store.shutdown().unwrap();
    assert!(!store.is_healthy());
}
