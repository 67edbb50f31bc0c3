//! Error types for the shadow manager.

use shadow_merge::MergeError;
use shadow_model::ModelError;
use shadow_persistence::{ErrorKind, PersistenceError};
use shadow_types::EntityKey;
use thiserror::Error;

/// Result type for manager operations.
pub type ShadowResult<T> = Result<T, ShadowError>;

/// Per-entry failure reported by the manager.
///
/// Errors are values in result slots, so one persistence failure may be
/// cloned into every entry it affects.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShadowError {
    /// The incoming and stored documents disagree on shape.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// The registry has no shape for the entity.
    #[error("type resolution failed for {0}")]
    TypeResolutionFailed(EntityKey),

    /// The request itself is malformed.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The addressed document does not exist.
    #[error("not found: {0}")]
    NotFound(PersistenceError),

    /// A conditional write or read lost against a newer version.
    /// The caller should re-read and resubmit.
    #[error("version conflict: {0}")]
    VersionConflict(PersistenceError),

    /// Opaque backend failure.
    #[error("storage error: {0}")]
    Storage(PersistenceError),

    /// The context was cancelled or its deadline passed.
    #[error("operation cancelled")]
    Cancelled,
}

impl ShadowError {
    /// Returns true if resubmitting after a fresh read may succeed.
    pub fn is_conflict(&self) -> bool {
        matches!(self, ShadowError::VersionConflict(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ShadowError::NotFound(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ShadowError::Cancelled)
    }
}

impl From<PersistenceError> for ShadowError {
    fn from(e: PersistenceError) -> Self {
        match e.kind {
            ErrorKind::BadRequest => ShadowError::InvalidInput(e.to_string()),
            ErrorKind::NotFound => ShadowError::NotFound(e),
            ErrorKind::Conflict => ShadowError::VersionConflict(e),
            ErrorKind::Cancelled => ShadowError::Cancelled,
            ErrorKind::Internal => ShadowError::Storage(e),
        }
    }
}

impl From<MergeError> for ShadowError {
    fn from(e: MergeError) -> Self {
        ShadowError::ShapeMismatch(e.to_string())
    }
}

impl From<ModelError> for ShadowError {
    fn from(e: ModelError) -> Self {
        ShadowError::ShapeMismatch(e.to_string())
    }
}
