//! Catalog error model.

use thiserror::Error;

/// Result type used across the catalog.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Catalog-level error.
///
/// Validation, lookup, placement and uniqueness failures are caller errors and
/// are returned unmodified. `Internal` signals broken referential integrity in
/// storage; `Storage` wraps backend failures that carry no domain meaning.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// A value failed validation (e.g. an empty name).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A referenced name or id does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A product was attached to a class that has children.
    #[error("invalid placement: {0}")]
    InvalidPlacement(String),

    /// A uniqueness rule was violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Stored rows are inconsistent (e.g. an orphan parent reference).
    #[error("internal consistency error: {0}")]
    Internal(String),

    /// The storage backend failed.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl CatalogError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn invalid_placement(msg: impl Into<String>) -> Self {
        Self::InvalidPlacement(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }
}

/// Reject empty or whitespace-only names.
pub fn ensure_name(kind: &str, name: &str) -> CatalogResult<()> {
    if name.trim().is_empty() {
        return Err(CatalogError::validation(format!("{kind} name cannot be empty")));
    }
    Ok(())
}
