use thiserror::Error;
use uuid::Uuid;

use crate::EntityKind;

/// Errors that can occur when reading from or writing to a store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique constraint (primary key, license number, plate, user link)
    /// would be violated by the commit.
    #[error("Unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },

    /// A record references a row that does not exist.
    #[error("Foreign key constraint violated: {constraint}")]
    ForeignKeyViolation { constraint: String },

    /// An update or delete targeted a row that does not exist.
    #[error("{kind} {id} does not exist")]
    RecordNotFound { kind: EntityKind, id: Uuid },

    /// A single-row lookup matched more than one row.
    #[error("More than one {0} matched")]
    MultipleRecords(EntityKind),

    /// A stored row could not be turned back into an entity.
    #[error("Invalid stored data: {0}")]
    InvalidData(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl From<domain::DomainError> for StoreError {
    fn from(err: domain::DomainError) -> Self {
        StoreError::InvalidData(err.to_string())
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
