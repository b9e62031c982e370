//! Domain error types.

use thiserror::Error;

use crate::validation::ValidationErrors;

/// Errors raised by domain rules.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Input failed field-level validation.
    #[error("One or more validation errors occurred")]
    Validation(ValidationErrors),

    /// Requested load does not fit the assigned vehicle.
    #[error(
        "Vehicle (ID: {vehicle_id}) cannot carry {requested} {unit}. Max {measure} capacity: {limit} {unit}"
    )]
    CapacityExceeded {
        vehicle_id: String,
        measure: &'static str,
        unit: &'static str,
        requested: f64,
        limit: f64,
    },

    /// A stored integer code has no enum variant.
    #[error("Unknown {kind} code: {code}")]
    UnknownCode { kind: &'static str, code: i16 },

    /// A name has no enum variant.
    #[error("Unknown {kind}: {name}")]
    UnknownName { kind: &'static str, name: String },
}

impl From<ValidationErrors> for DomainError {
    fn from(errors: ValidationErrors) -> Self {
        DomainError::Validation(errors)
    }
}
