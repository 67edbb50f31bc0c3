//! Timestamp-ordered deep merge for device shadow documents.
//!
//! This crate provides the two pure algorithms at the heart of the engine:
//!
//! - [`merge`]: recursively merges an old and a new instance of the same
//!   shape, classifying every leaf as add/update/remove/no-change
//! - [`acknowledge`]: walks a desired document against a merged reported
//!   document and clears every desired value the device has confirmed
//!
//! Shapes opt in by implementing [`Mergeable`]. Implementations are
//! provided for:
//!
//! - [`Managed<T>`]: a leaf carrying its own [`Timestamp`](shadow_types::Timestamp)
//! - primitives, `String` and `Vec<T>`: plain leaves compared by value
//! - `Option<T>`: optional references
//! - `BTreeMap<K, V>` / `HashMap<K, V>`: keyed collections
//! - [`Node`]: a dynamically described document
//!
//! and [`mergeable_record!`] generates the field-by-field walk for structs.
//!
//! Both algorithms are synchronous, hold no shared state and never mutate
//! their inputs.

mod context;
mod engine;
mod error;
mod managed;
mod mergeable;
mod node;
mod observer;
mod operation;

pub use context::MergeContext;
pub use engine::{acknowledge, acknowledge_logged, merge, merge_logged, Merged};
pub use error::{MergeError, MergeResult};
pub use managed::Managed;
pub use mergeable::Mergeable;
pub use node::Node;
pub use observer::{LogEntry, ManagedChange, MergeObserver, NoopObserver, OperationLog, PlainChange};
pub use operation::{MergeMode, Operation};
