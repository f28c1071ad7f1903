//! Application-wide constants.

/// Application name, used for data directories.
pub const APP_NAME: &str = "Moch";

/// Crate version reported by the CLI.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Current database schema version. Bump when adding a migration.
pub const DB_SCHEMA_VERSION: i32 = 1;

/// Default database file name inside the data directory.
pub const DB_FILE_NAME: &str = "moch.db";

/// Default config file name inside the config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Prefix of the rotated log files.
pub const LOG_FILE_PREFIX: &str = "moch.log";

// ─── AppConfiguration defaults and bounds ───────────────────────────────────

/// Whether reminder notifications are enabled by default.
pub const DEFAULT_NOTIFICATIONS_ENABLED: bool = true;

/// Default reminder lead time in hours.
pub const DEFAULT_LEAD_TIME_HOURS: f64 = 24.0;

/// Whether the 24-hour clock is used by default.
pub const DEFAULT_USE_24_HOUR_CLOCK: bool = false;

/// Smallest accepted lead time (one hour).
pub const MIN_LEAD_TIME_HOURS: f64 = 1.0;

/// Largest accepted lead time (one week).
pub const MAX_LEAD_TIME_HOURS: f64 = 168.0;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lead_time_bounds_contain_default() {
        assert!(MIN_LEAD_TIME_HOURS <= DEFAULT_LEAD_TIME_HOURS);
        assert!(DEFAULT_LEAD_TIME_HOURS <= MAX_LEAD_TIME_HOURS);
    }
}
