//! Failure taxonomy for catalog operations.
//!
//! Three classes, used for control decisions only (presentation wording is
//! the host application's concern):
//! - `Validation`: locally detectable, such as a missing selection or a
//!   duplicate enrollment caught before the write.
//! - `Dependency`: the server rejected the operation because a referenced
//!   record changed underneath us (e.g. the group was removed concurrently).
//! - `Transient`: network or server error the gateway's own retry policy
//!   did not absorb.

use thiserror::Error;

/// Classified failure from the catalog gateway or the coordinator's own
/// pre-flight checks.
///
/// `Clone + PartialEq` so a failure can be stored in published query state
/// and asserted on directly in tests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// Locally detectable invalid input or state.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Server-reported conflict with a concurrently changed record.
    #[error("dependency conflict: {0}")]
    Dependency(String),

    /// Network or server failure that may succeed on a later attempt.
    #[error("transient failure: {0}")]
    Transient(String),
}

impl CatalogError {
    /// Whether a fresh attempt of the same operation could succeed without
    /// any input changing. Only `Transient` failures qualify.
    pub fn is_transient(&self) -> bool {
        matches!(self, CatalogError::Transient(_))
    }
}

/// Result type for catalog operations.
pub type CatalogResult<T> = std::result::Result<T, CatalogError>;
