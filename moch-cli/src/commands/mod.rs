//! CLI command implementations.

pub mod pets;
pub mod reminders;
pub mod weights;
pub mod config;
pub mod db;
pub mod watch;

use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use clap::Subcommand;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, ContentArrangement, Table};
use tracing::debug;

use moch_core::config::MochConfig;
use moch_core::error::{MochError, MochResult};
use moch_models::Id;
use moch_services::{ChangeBus, Service, Store};

use crate::OutputFormat;

/// Commands that operate on the store. The interactive `watch` session
/// accepts exactly these.
#[derive(Subcommand)]
pub enum StoreCommand {
    /// List and manage pets.
    Pets {
        #[command(subcommand)]
        action: pets::PetsAction,
    },
    /// List and manage care reminders.
    Reminders {
        #[command(subcommand)]
        action: reminders::RemindersAction,
    },
    /// Record and review weight history.
    Weights {
        #[command(subcommand)]
        action: weights::WeightsAction,
    },
    /// View and change in-app preferences.
    Config {
        #[command(subcommand)]
        action: config::ConfigAction,
    },
    /// Database management commands.
    Db {
        #[command(subcommand)]
        action: db::DbAction,
    },
}

/// An opened store plus where it lives on disk.
pub struct Session {
    pub store: Store,
    pub db_path: PathBuf,
}

impl Session {
    /// Open the configured database and bring the store up.
    pub fn open(config: &MochConfig) -> MochResult<Self> {
        let db_path = config.effective_db_path()?;
        let mut store = Store::open(&db_path, &config.database, ChangeBus::new())?;
        store.init()?;
        debug!("session opened on {}", db_path.display());
        Ok(Self { store, db_path })
    }

    pub fn close(mut self) -> MochResult<()> {
        self.store.shutdown()
    }
}

/// Run one store command.
pub async fn execute(session: &Session, command: StoreCommand, format: OutputFormat) -> MochResult<()> {
    match command {
        StoreCommand::Pets { action } => pets::run(session, action, format).await,
        StoreCommand::Reminders { action } => reminders::run(session, action, format).await,
        StoreCommand::Weights { action } => weights::run(session, action, format).await,
        StoreCommand::Config { action } => config::run(session, action, format).await,
        StoreCommand::Db { action } => db::run(session, action, format).await,
    }
}

/// Parse an entity identifier given on the command line.
pub fn parse_id(value: &str) -> MochResult<Id> {
    Id::parse_str(value.trim())
        .map_err(|_| MochError::Validation(format!("'{value}' is not a valid identifier")))
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(value: &str) -> MochResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| MochError::Validation(format!("'{value}' is not a date (YYYY-MM-DD)")))
}

/// Parse a point in time: RFC 3339, `YYYY-MM-DD HH:MM` (UTC) or a bare date
/// (midnight UTC).
pub fn parse_datetime(value: &str) -> MochResult<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M") {
        return Ok(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(date.and_time(chrono::NaiveTime::MIN).and_utc());
    }
    Err(MochError::Validation(format!(
        "'{value}' is not a date/time (RFC 3339, 'YYYY-MM-DD HH:MM' or 'YYYY-MM-DD')"
    )))
}

/// Format a date-time for display, honoring the 24-hour clock preference.
pub fn format_datetime(dt: &DateTime<Utc>, use_24_hour_clock: bool) -> String {
    if use_24_hour_clock {
        dt.format("%Y-%m-%d %H:%M").to_string()
    } else {
        dt.format("%Y-%m-%d %I:%M %p").to_string()
    }
}

/// A table with the standard look.
pub fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Print a serializable value as pretty JSON.
pub fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> MochResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Format a byte count as a human-readable string.
pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// Truncate a string to a maximum number of characters, appending an
/// ellipsis if truncated.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len > 3 {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{head}...")
    } else {
        s.chars().take(max_len).collect()
    }
}
