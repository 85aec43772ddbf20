//! Domain error types.

use thiserror::Error;

/// Caller input that is missing or malformed.
///
/// Always raised before any store call, so it never needs compensation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// A required field was absent or blank.
    #[error("{0} is required")]
    Missing(&'static str),

    /// Several required fields were absent; reported together.
    #[error("{0}")]
    MissingFields(&'static str),

    /// A rental was submitted without a property payload.
    #[error("Property data is required")]
    MissingProperty,

    /// A rental was submitted with an empty unit list.
    #[error("At least one unit is required for a property")]
    NoUnits,

    /// A required unit field was absent or blank.
    #[error("Unit {index}: {field} is required")]
    MissingUnitField { index: usize, field: &'static str },

    /// A numeric unit field could not be read as a number.
    #[error("Unit {index}: {field} must be a number, got {value}")]
    NotANumber {
        index: usize,
        field: &'static str,
        value: String,
    },

    /// An integer unit field held a fractional or out-of-range number.
    #[error("Unit {index}: {field} must be a whole number, got {value}")]
    NotAnInteger {
        index: usize,
        field: &'static str,
        value: String,
    },

    /// A role name outside the fixed set.
    #[error("Unknown role '{0}'")]
    UnknownRole(String),
}
