//! Error types for the upkeep core.
//!
//! Every core operation returns one of these as a typed result. The
//! transport layer maps them to its own status codes.

use std::fmt;

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum UpkeepError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    /// Tenant mismatch and insufficient role are deliberately
    /// indistinguishable here.
    #[error("Access denied")]
    AccessDenied,

    #[error("Conflict: {0}")]
    Conflict(ConflictReason),

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Cryptography error: {0}")]
    Crypto(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl UpkeepError {
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

impl From<ConflictReason> for UpkeepError {
    fn from(reason: ConflictReason) -> Self {
        Self::Conflict(reason)
    }
}

/// Why a write was refused with [`UpkeepError::Conflict`].
///
/// A conflict never leaves partial state behind; the caller re-fetches
/// and resubmits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictReason {
    /// The caller's `expected_version` no longer matches the stored row.
    StaleVersion {
        entity: String,
        id: Uuid,
        expected: u64,
        actual: u64,
    },
    /// A unique index within the tenant rejected the write.
    Duplicate { entity: String },
    /// Live dependents still reference the row being deleted.
    Dependents {
        entity: String,
        id: Uuid,
        count: u64,
        dependent: String,
    },
    /// The target location has no free slot.
    Capacity { location: Uuid, current: u64, max: u64 },
    /// The store aborted a racing transaction.
    Concurrent { detail: String },
    /// The row has reached a state where the field is frozen.
    Finalized { entity: String, id: Uuid },
}

impl fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StaleVersion {
                entity,
                id,
                expected,
                actual,
            } => write!(
                f,
                "{entity} {id} was modified concurrently (expected version {expected}, found {actual})"
            ),
            Self::Duplicate { entity } => write!(f, "{entity} already exists"),
            Self::Dependents {
                entity,
                id,
                count,
                dependent,
            } => write!(
                f,
                "cannot delete {entity} {id}: {count} {dependent} still assigned"
            ),
            Self::Capacity {
                location,
                current,
                max,
            } => write!(f, "location {location} is at capacity ({current}/{max})"),
            Self::Concurrent { detail } => write!(f, "concurrent write aborted: {detail}"),
            Self::Finalized { entity, id } => {
                write!(f, "{entity} {id} is finalized and can no longer be changed")
            }
        }
    }
}

pub type UpkeepResult<T> = Result<T, UpkeepError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_conflict_cites_occupancy() {
        let err = UpkeepError::from(ConflictReason::Capacity {
            location: Uuid::nil(),
            current: 5,
            max: 5,
        });
        assert!(err.is_conflict());
        assert!(err.to_string().contains("(5/5)"));
    }

    #[test]
    fn dependents_conflict_names_count_and_kind() {
        let err = UpkeepError::from(ConflictReason::Dependents {
            entity: "department".into(),
            id: Uuid::nil(),
            count: 3,
            dependent: "employee(s)".into(),
        });
        assert!(err.to_string().contains("3 employee(s)"));
    }

    #[test]
    fn access_denied_carries_no_detail() {
        assert_eq!(UpkeepError::AccessDenied.to_string(), "Access denied");
    }
}
