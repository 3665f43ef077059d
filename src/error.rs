use uuid::Uuid;

use crate::versioning::EntityKind;

// ============================================================================
// Procurement Errors
// ============================================================================
//
// One error type for the whole core. The boundary layer maps `ErrorKind`
// onto transport status codes; the core never collapses two kinds into one.
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ProcurementError {
    #[error("Actor not found: {0}")]
    ActorNotFound(String),

    #[error("{kind} not found: {id}")]
    EntityNotFound { kind: EntityKind, id: Uuid },

    #[error("Actor {actor} is not allowed to act on {kind} {id}")]
    Forbidden {
        actor: String,
        kind: EntityKind,
        id: Uuid,
    },

    #[error("Invalid {field} value: {value:?}")]
    InvalidEnumValue { field: &'static str, value: String },

    #[error("Invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("Version conflict on {kind} {id}: expected version {expected}, found {actual:?}")]
    Conflict {
        kind: EntityKind,
        id: Uuid,
        expected: i64,
        actual: Option<i64>,
    },

    #[error("Employee {0} already belongs to an organization")]
    MembershipExists(Uuid),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Flat classification of [`ProcurementError`] for the boundary layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ActorNotFound,
    EntityNotFound,
    Forbidden,
    InvalidEnumValue,
    Validation,
    Conflict,
    MembershipExists,
    Internal,
}

impl ProcurementError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ActorNotFound(_) => ErrorKind::ActorNotFound,
            Self::EntityNotFound { .. } => ErrorKind::EntityNotFound,
            Self::Forbidden { .. } => ErrorKind::Forbidden,
            Self::InvalidEnumValue { .. } => ErrorKind::InvalidEnumValue,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::MembershipExists(_) => ErrorKind::MembershipExists,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn not_found(kind: EntityKind, id: Uuid) -> Self {
        Self::EntityNotFound { kind, id }
    }

    pub fn forbidden(actor: impl Into<String>, kind: EntityKind, id: Uuid) -> Self {
        Self::Forbidden {
            actor: actor.into(),
            kind,
            id,
        }
    }

    pub fn invalid_enum(field: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidEnumValue {
            field,
            value: value.into(),
        }
    }
}

impl From<sqlx::Error> for ProcurementError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!(error = %err, "Store operation failed");
        Self::Internal(err.to_string())
    }
}

pub type Result<T, E = ProcurementError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_stay_distinct() {
        let id = Uuid::new_v4();
        let errors = [
            ProcurementError::ActorNotFound("ghost".to_string()),
            ProcurementError::not_found(EntityKind::Tender, id),
            ProcurementError::forbidden("alice", EntityKind::Bid, id),
        ];

        let kinds: Vec<ErrorKind> = errors.iter().map(|e| e.kind()).collect();
        assert_eq!(
            kinds,
            vec![ErrorKind::ActorNotFound, ErrorKind::EntityNotFound, ErrorKind::Forbidden]
        );
    }

    #[test]
    fn test_error_messages() {
        let id = Uuid::nil();
        let err = ProcurementError::not_found(EntityKind::Bid, id);
        assert_eq!(err.to_string(), format!("Bid not found: {}", id));

        let err = ProcurementError::invalid_enum("status", "Archived");
        assert_eq!(err.to_string(), "Invalid status value: \"Archived\"");
    }

    #[test]
    fn test_sqlx_errors_become_internal() {
        let err: ProcurementError = sqlx::Error::RowNotFound.into();
        assert_eq!(err.kind(), ErrorKind::Internal);
    }
}
