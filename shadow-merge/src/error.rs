//! Error types for the merge layer.

use thiserror::Error;

/// Result type for merge operations.
pub type MergeResult<T> = Result<T, MergeError>;

/// Errors that can occur while merging or acknowledging.
///
/// Merging never fails on value content; only a structural disagreement
/// between the two documents is an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeError {
    /// The two documents do not describe the same shape.
    #[error("shape mismatch at '{path}': expected {expected}, found {found}")]
    ShapeMismatch {
        path: String,
        expected: String,
        found: String,
    },
}
