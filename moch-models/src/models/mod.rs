//! Entity model definitions.

pub mod entity;
pub mod columns;
pub mod pet;
pub mod reminder;
pub mod weight_entry;
pub mod app_configuration;

use thiserror::Error;

/// A stored or user-supplied enum tag matched no known variant.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown {kind}: {value:?}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl From<UnknownVariant> for moch_core::MochError {
    fn from(e: UnknownVariant) -> Self {
        moch_core::MochError::Validation(e.to_string())
    }
}
