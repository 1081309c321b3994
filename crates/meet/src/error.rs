use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

use crate::models::ChestNumber;

/// Failures of the storage collaborator.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Write conflict: {0}")]
    Conflict(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Storage call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

impl StorageError {
    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            StorageError::Database(sqlx::Error::Database(e))
                if e.code().as_deref() == Some("23505")
        )
    }

    /// Serialization failures and deadlocks are safe to retry.
    pub fn is_serialization_failure(&self) -> bool {
        match self {
            StorageError::Conflict(_) => true,
            StorageError::Database(sqlx::Error::Database(e)) => {
                matches!(e.code().as_deref(), Some("40001") | Some("40P01"))
            }
            _ => false,
        }
    }
}

/// Errors surfaced by the meet core to its callers.
#[derive(Debug, Error)]
pub enum MeetError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Registration code '{registration_code}' is already used by participant {participant_id} (chest {chest_number})")]
    DuplicateRegistration {
        registration_code: String,
        participant_id: Uuid,
        chest_number: ChestNumber,
    },

    #[error("Chest number allocation gave up after {attempts} contended attempts")]
    ResourceContention { attempts: u32 },

    #[error("Invalid participant {id}: {reason}")]
    InvalidParticipant { id: Uuid, reason: String },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Persistence error: {0}")]
    Persistence(#[from] StorageError),
}

pub type Result<T> = std::result::Result<T, MeetError>;

impl MeetError {
    pub(crate) fn invalid_participant(id: Uuid, reason: impl Into<String>) -> Self {
        Self::InvalidParticipant {
            id,
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }
}

impl From<validator::ValidationErrors> for MeetError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_storage_errors() {
        assert!(StorageError::Conflict("stale".into()).is_serialization_failure());
        assert!(!StorageError::Conflict("stale".into()).is_unique_violation());
        assert!(!StorageError::Timeout(Duration::from_secs(1)).is_serialization_failure());
        assert!(!StorageError::ConstraintViolation("x".into()).is_unique_violation());
    }
}
