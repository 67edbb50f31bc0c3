//! Persistence layer for the device shadow engine.
//!
//! The manager never talks to a database directly. It speaks the batched,
//! optimistically versioned [`Persistence`] contract defined here:
//!
//! - `read` returns the latest document, or fails with `Conflict` when a
//!   positive expected version does not match
//! - `write` creates or overwrites unconditionally at version `0`, and
//!   otherwise only when the stored version matches
//! - `delete` follows the same version rule
//! - `list` pages through stored ids in a stable order
//!
//! Every batch call returns exactly one result per op, in op order, and
//! takes the caller's [`Context`]. A backend that finds the context done
//! fails the affected ops with [`ErrorKind::Cancelled`].
//!
//! [`MemoryPersistence`] is a complete in-process backend used by tests and
//! by embedders that do not need durability.

mod context;
mod error;
mod memory;
mod ops;

pub use context::Context;
pub use error::{ErrorKind, PersistenceError, PersistenceResult};
pub use memory::MemoryPersistence;
pub use ops::{
    DeleteOp, ListEntry, ListOptions, ListPage, ReadOp, ReadResult, StoredModel, WriteOp,
    WriteResult,
};

use async_trait::async_trait;

/// Batched document storage with optimistic concurrency.
#[async_trait]
pub trait Persistence: Send + Sync {
    /// Reads documents. One result per op, in op order.
    async fn read(&self, ctx: &Context, ops: Vec<ReadOp>) -> Vec<ReadResult>;

    /// Writes documents. One result per op, in op order.
    ///
    /// Each op is applied atomically on its own; ops in the same batch may
    /// succeed or fail independently.
    async fn write(&self, ctx: &Context, ops: Vec<WriteOp>) -> Vec<WriteResult>;

    /// Deletes documents. One result per op, in op order.
    async fn delete(&self, ctx: &Context, ops: Vec<DeleteOp>) -> Vec<WriteResult>;

    /// Lists stored documents.
    async fn list(&self, ctx: &Context, options: ListOptions) -> PersistenceResult<ListPage>;
}
