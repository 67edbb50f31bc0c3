//! Manager configuration.

use serde::{Deserialize, Serialize};
use shadow_merge::MergeMode;

/// How reported and desired documents are laid out in storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageLayout {
    /// One document per entity holding both parts under one version.
    Combined,
    /// Two independently versioned documents per entity.
    #[default]
    Separate,
}

/// Configuration for the shadow manager.
///
/// Fixed at construction; the manager never mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Storage layout.
    pub layout: StorageLayout,
    /// Maximum entities per persistence call.
    pub max_batch_size: usize,
    /// Maximum persistence calls in flight per batch.
    pub max_concurrency: usize,
    /// Merge mode for report entries that do not specify one.
    pub default_mode: MergeMode,
    /// Plain-leaf changes alone do not trigger a write.
    pub ignore_plain: bool,
    /// Capacity of the change notification channel.
    pub event_capacity: usize,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            layout: StorageLayout::Separate,
            max_batch_size: 100,
            max_concurrency: 4,
            default_mode: MergeMode::ServerIsMaster,
            ignore_plain: false,
            event_capacity: 256,
        }
    }
}

impl ManagerConfig {
    /// Returns a config with the given layout and defaults elsewhere.
    pub fn with_layout(layout: StorageLayout) -> Self {
        Self {
            layout,
            ..Self::default()
        }
    }

    /// Clamps zero sizes to one.
    pub(crate) fn normalized(mut self) -> Self {
        self.max_batch_size = self.max_batch_size.max(1);
        self.max_concurrency = self.max_concurrency.max(1);
        self.event_capacity = self.event_capacity.max(1);
        self
    }
}
