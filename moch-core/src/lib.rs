//! Moch Core - Foundation types, error handling, configuration, and logging.
//!
//! This crate provides the shared foundation used by all other Moch crates:
//! - Process configuration (database location, logging)
//! - The error taxonomy shared by the store, queries and the CLI
//! - Structured logging with tracing
//! - Per-user data and config directories
//! - Common constants

pub mod config;
pub mod error;
pub mod logging;
pub mod platform;
pub mod constants;

// Re-export commonly used items at the crate root
pub use config::MochConfig;
pub use error::{MochError, MochResult};
pub use logging::init_logging;
