//! Core type definitions for the device shadow engine.
//!
//! This crate defines the small, shape-agnostic types shared by every layer:
//! - Entity keys and persistence identifiers
//! - Hybrid timestamps carried by managed leaves
//! - Client tokens echoed back on batch results
//!
//! Document shapes themselves live with the caller; the engine only sees
//! them through `shadow-merge` and `shadow-model`.

mod ids;
mod timestamp;

pub use ids::{ClientToken, EntityKey, ModelKind, PersistenceId, Version};
pub use timestamp::Timestamp;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid model kind: {0}")]
    InvalidModelKind(String),

    #[error("invalid persistence id: {0}")]
    InvalidPersistenceId(String),
}
