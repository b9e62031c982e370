//! Service error types.

use domain::{DomainError, ValidationErrors};
use store::StoreError;
use thiserror::Error;

use crate::identity::IdentityError;

/// Errors that can occur in order and driver use cases.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A referenced entity does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The request is well-formed but breaks a business rule.
    #[error("{0}")]
    BadRequest(String),

    /// Field-level validation failed before any business rule ran.
    #[error("One or more validation errors occurred")]
    Validation(ValidationErrors),

    /// A uniqueness rule or state guard blocked the operation.
    #[error("{0}")]
    Conflict(String),

    /// Storage failed.
    #[error("Store error: {0}")]
    Store(StoreError),

    /// The identity provider failed.
    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),
}

impl ServiceError {
    pub fn not_found(kind: &str, id: impl std::fmt::Display) -> Self {
        ServiceError::NotFound(format!("{kind} with ID {id} not found."))
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation { constraint } => match conflict_message(&constraint) {
                Some(message) => ServiceError::Conflict(message.to_string()),
                None => ServiceError::Store(StoreError::UniqueViolation { constraint }),
            },
            other => ServiceError::Store(other),
        }
    }
}

/// User-facing message for a unique constraint a caller can trip.
fn conflict_message(constraint: &str) -> Option<&'static str> {
    match constraint {
        "drivers_license_number_key" => Some("A driver with this license number already exists."),
        "drivers_user_id_key" => Some("This user is already linked to another driver."),
        "vehicles_license_plate_key" => Some("A vehicle with this license plate already exists."),
        _ => None,
    }
}

impl From<DomainError> for ServiceError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(errors) => ServiceError::Validation(errors),
            other => ServiceError::BadRequest(other.to_string()),
        }
    }
}

impl From<ValidationErrors> for ServiceError {
    fn from(errors: ValidationErrors) -> Self {
        ServiceError::Validation(errors)
    }
}

/// Convenience type alias for service results.
pub type Result<T> = std::result::Result<T, ServiceError>;
