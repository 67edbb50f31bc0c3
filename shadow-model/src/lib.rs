//! Shadow document model.
//!
//! Defines the types the manager and persistence layers exchange without
//! knowing the concrete document shape:
//! - [`Model`]: a type-erased, immutable shadow document
//! - [`ModelShape`] / [`Shape`]: builds, decodes and recognizes documents of one shape
//! - [`TypeRegistry`]: resolves a shape from an entity id/name pair
//!
//! Concrete shapes are ordinary Rust types implementing
//! [`Mergeable`](shadow_merge::Mergeable), or runtime-described
//! [`Node`](shadow_merge::Node) templates.

mod model;
mod registry;
mod shape;

pub use model::{Model, ShadowModel};
pub use registry::{ShapeRegistry, TypeRegistry};
pub use shape::{DescribedShape, ModelShape, Shape, TypedShape};

/// Errors produced while decoding or encoding documents.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),
}

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;
