//! Device shadow manager.
//!
//! Keeps two documents per entity, the state a device last *reported* and
//! the state a controller *desires*, and reconciles them over a
//! [`Persistence`](shadow_persistence::Persistence) backend:
//!
//! - [`ShadowManager::report`] merges incoming reported state and clears
//!   desired values the device has confirmed
//! - [`ShadowManager::desire`] merges requested state into the desired
//!   document
//! - [`ShadowManager::read`], [`ShadowManager::delete`] and
//!   [`ShadowManager::list`] pass through to persistence
//!
//! Each batch call follows the same pipeline: validate and resolve shapes,
//! group entries by entity, then for each chunk of entities issue one
//! batched read, compute merges, and issue one batched write of only the
//! documents that changed. Chunks run concurrently up to
//! [`ManagerConfig::max_concurrency`]. Optimistic versioning is the only
//! coordination; conflicts are returned to the caller, never retried.
//!
//! # Example
//!
//! ```
//! use serde::{Deserialize, Serialize};
//! use shadow_manager::{Context, ManagerConfig, ReportEntry, ShadowManager};
//! use shadow_merge::{mergeable_record, Managed};
//! use shadow_model::{Model, ShapeRegistry, TypedShape};
//! use shadow_persistence::MemoryPersistence;
//! use shadow_types::EntityKey;
//! use std::sync::Arc;
//!
//! #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
//! struct Lamp {
//!     on: Managed<bool>,
//! }
//! mergeable_record!(Lamp { on });
//!
//! # tokio_test::block_on(async {
//! let mut registry = ShapeRegistry::new();
//! registry.register(TypedShape::<Lamp>::shared("lamp"));
//! let manager = ShadowManager::new(
//!     ManagerConfig::default(),
//!     Arc::new(MemoryPersistence::new()),
//!     Arc::new(registry),
//! );
//!
//! let lamp = Lamp { on: Managed::now(true) };
//! let results = manager
//!     .report(&Context::new(), vec![ReportEntry::new(EntityKey::new("hall", "lamp"), Model::new(lamp))])
//!     .await;
//! assert!(results[0].is_ok());
//! assert_eq!(results[0].reported_version, 1);
//! # });
//! ```

mod config;
mod delete;
mod desire;
mod entry;
mod error;
mod events;
mod group;
mod manager;
mod observer;
mod pipeline;
mod read;
mod report;

pub use config::{ManagerConfig, StorageLayout};
pub use entry::{
    DeleteEntry, DeleteResult, DesireEntry, DesireResult, ListResults, ReadEntry, ReadResult,
    ReportEntry, ReportResult,
};
pub use error::{ShadowError, ShadowResult};
pub use events::ShadowEvent;
pub use manager::ShadowManager;
pub use observer::{ObserverFactory, TracingObserver, TracingObserverFactory};
pub use shadow_persistence::{Context, ListOptions};
pub use tokio_util::sync::CancellationToken;
