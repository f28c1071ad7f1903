//! Per-user directory locations for Moch files.

use std::path::PathBuf;

use crate::constants::APP_NAME;
use crate::error::{MochError, MochResult};

/// Directory holding the database and logs.
///
/// - Windows: `%APPDATA%/Moch`
/// - macOS: `~/Library/Application Support/Moch`
/// - Linux: `~/.local/share/Moch`
pub fn data_dir() -> MochResult<PathBuf> {
    let base = dirs::data_dir()
        .ok_or_else(|| MochError::Config("could not determine data directory".into()))?;
    Ok(base.join(APP_NAME))
}

/// Directory holding `config.toml`.
pub fn config_dir() -> MochResult<PathBuf> {
    let base = dirs::config_dir()
        .ok_or_else(|| MochError::Config("could not determine config directory".into()))?;
    Ok(base.join(APP_NAME))
}
