//! Error types for the Moch data layer.
//!
//! Every failure the store, the query layer or the CLI can report is a
//! variant of `MochError`. Validation and not-found errors are returned to the
//! caller so the presentation layer can keep the record unsaved; storage
//! failures are reported without touching committed state.

use thiserror::Error;

/// Convenience type alias for Results using MochError.
pub type MochResult<T> = Result<T, MochError>;

/// Unified error type for the Moch workspace.
#[derive(Error, Debug)]
pub enum MochError {
    // -- Input errors --
    /// Input failed an entity invariant (empty name, non-positive weight, ...).
    #[error("validation error: {0}")]
    Validation(String),

    /// An operation referenced an identifier absent from the store.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Entity kind name (e.g. "pet").
        kind: &'static str,
        /// The identifier that was looked up.
        id: String,
    },

    // -- Store errors --
    /// A cascade or denormalized field was found inconsistent.
    ///
    /// Never expected in correct operation; the surrounding transaction is
    /// rolled back.
    #[error("integrity violation: {0}")]
    Integrity(String),

    /// A store mutation was issued from inside a change handler.
    #[error("store mutation attempted from inside a change handler")]
    Reentrant,

    // -- Storage errors --
    /// SQLite or file-level persistence failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// Database migration failed.
    #[error("migration error: {0}")]
    Migration(String),

    /// Database connection pool error.
    #[error("connection pool error: {0}")]
    Pool(String),

    // -- External collaborators --
    /// Loading an external binary asset (e.g. a pet photo) failed.
    #[error("asset load failed: {0}")]
    AssetLoad(String),

    // -- Configuration errors --
    /// Failed to load or parse process configuration.
    #[error("configuration error: {0}")]
    Config(String),

    // -- File/IO errors --
    /// File system operation failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl MochError {
    /// Build a `NotFound` error for the given kind and identifier.
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        MochError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Whether this error should be shown to the user as a rejected input.
    pub fn is_user_facing(&self) -> bool {
        matches!(self, MochError::Validation(_) | MochError::NotFound { .. })
    }
}

impl From<serde_json::Error> for MochError {
    fn from(e: serde_json::Error) -> Self {
        MochError::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for MochError {
    fn from(e: toml::de::Error) -> Self {
        MochError::Config(e.to_string())
    }
}
