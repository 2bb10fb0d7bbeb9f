//! Domain Layer - Core Entity Trait
//!
//! This trait defines the basic contract for all domain entities.
//! All entities must have a unique ID and be thread-safe.

use serde::{Deserialize, Serialize};

/// Core trait for all domain entities
pub trait Entity: Sized + Send + Sync + Clone {
    /// The type of the entity's unique identifier
    type Id: Copy + Eq + std::hash::Hash + Send + Sync;

    /// Returns the entity's unique identifier
    fn id(&self) -> Self::Id;
}

/// Common result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level errors
///
/// Callers recover by re-reading the patient's plans; no variant implies a
/// partially applied write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DomainError {
    /// Unknown entity id
    NotFound(String),
    /// Rejected before any write (bad tooth selection, bad phase id, ...)
    Validation(String),
    /// Storage failure; the write was rolled back
    Persistence(String),
}

impl DomainError {
    pub fn is_validation(&self) -> bool {
        matches!(self, DomainError::Validation(_))
    }
}

impl std::fmt::Display for DomainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DomainError::NotFound(msg) => write!(f, "Not found: {}", msg),
            DomainError::Validation(msg) => write!(f, "Invalid input: {}", msg),
            DomainError::Persistence(msg) => write!(f, "Persistence error: {}", msg),
        }
    }
}

impl std::error::Error for DomainError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DomainError::Validation("empty selection".to_string());
        assert_eq!(err.to_string(), "Invalid input: empty selection");
        assert!(err.is_validation());
        assert!(!DomainError::NotFound("x".to_string()).is_validation());
    }
}
