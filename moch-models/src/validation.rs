//! Validation predicates shared by the entity models.
//!
//! The presentation layer trims and checks input before submitting it, but the
//! store re-runs these checks itself and never trusts the caller.

use moch_core::constants::{MAX_LEAD_TIME_HOURS, MIN_LEAD_TIME_HOURS};
use moch_core::error::{MochError, MochResult};

/// Trim leading and trailing whitespace.
pub fn trimmed(value: &str) -> String {
    value.trim().to_string()
}

/// Trim optional free text; blank text becomes `None`.
pub fn trimmed_optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Reject a string that is empty after trimming.
pub fn require_non_empty(field: &str, value: &str) -> MochResult<()> {
    if value.trim().is_empty() {
        return Err(MochError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}

/// Reject a weight that is not a finite, strictly positive number of kilograms.
pub fn require_positive_weight(weight: f64) -> MochResult<()> {
    if !weight.is_finite() || weight <= 0.0 {
        return Err(MochError::Validation(format!(
            "weight must be greater than zero (got {weight})"
        )));
    }
    Ok(())
}

/// Reject a reminder lead time outside `[1, 168]` hours.
pub fn require_lead_time(hours: f64) -> MochResult<()> {
    if !hours.is_finite() || !(MIN_LEAD_TIME_HOURS..=MAX_LEAD_TIME_HOURS).contains(&hours) {
        return Err(MochError::Validation(format!(
            "default lead time must be between {MIN_LEAD_TIME_HOURS} and {MAX_LEAD_TIME_HOURS} hours (got {hours})"
        )));
    }
    Ok(())
}
