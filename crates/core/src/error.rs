//! Domain error model.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Coarse classification of a [`DomainError`], suitable for callers that
/// branch on the failure category (e.g. mapping to a response code).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    InvalidState,
    Validation,
    Eligibility,
    InvariantViolation,
    InvalidId,
    Conflict,
}

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// invariants, illegal transitions). Infrastructure concerns belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation, optionally attributed to a single field.
    #[error("validation failed: {message}")]
    Validation {
        field: Option<String>,
        message: String,
    },

    /// The operation is not allowed in the entity's current status.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A referenced entity could not be resolved.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A job cannot be attached to an invoice.
    #[error("not eligible for invoicing: {0}")]
    Eligibility(String),

    /// A domain invariant was violated.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A conflict occurred (e.g. stale version / optimistic concurrency).
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            field: None,
            message: msg.into(),
        }
    }

    pub fn field_validation(field: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Validation {
            field: Some(field.into()),
            message: msg.into(),
        }
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn eligibility(msg: impl Into<String>) -> Self {
        Self::Eligibility(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::Validation { .. } => ErrorKind::Validation,
            DomainError::InvalidState(_) => ErrorKind::InvalidState,
            DomainError::NotFound { .. } => ErrorKind::NotFound,
            DomainError::Eligibility(_) => ErrorKind::Eligibility,
            DomainError::InvariantViolation(_) => ErrorKind::InvariantViolation,
            DomainError::InvalidId(_) => ErrorKind::InvalidId,
            DomainError::Conflict(_) => ErrorKind::Conflict,
        }
    }

    /// The offending field, for field-level validation failures.
    pub fn field(&self) -> Option<&str> {
        match self {
            DomainError::Validation { field, .. } => field.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_validation_carries_field_and_kind() {
        let err = DomainError::field_validation("price", "price must be positive");
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.field(), Some("price"));
        assert_eq!(err.to_string(), "validation failed: price must be positive");
    }

    #[test]
    fn not_found_message_names_entity_and_id() {
        let err = DomainError::not_found("invoice", "abc");
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.field(), None);
        assert_eq!(err.to_string(), "invoice not found: abc");
    }
}
