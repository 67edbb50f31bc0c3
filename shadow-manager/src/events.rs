//! Change notifications.

use serde::{Deserialize, Serialize};
use shadow_types::{EntityKey, ModelKind, Version};

/// Emitted after a write or delete has been applied by persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ShadowEvent {
    /// A report changed the stored reported document.
    ReportedUpdated { key: EntityKey, version: Version },
    /// A desire changed the stored desired document.
    DesiredUpdated { key: EntityKey, version: Version },
    /// A report confirmed and cleared desired leaves.
    DesiredAcknowledged { key: EntityKey, paths: Vec<String> },
    /// A document was deleted. `Combined` means both parts.
    Deleted { key: EntityKey, kind: ModelKind },
}

impl ShadowEvent {
    /// Returns the entity the event is about.
    pub fn key(&self) -> &EntityKey {
        match self {
            ShadowEvent::ReportedUpdated { key, .. }
            | ShadowEvent::DesiredUpdated { key, .. }
            | ShadowEvent::DesiredAcknowledged { key, .. }
            | ShadowEvent::Deleted { key, .. } => key,
        }
    }
}
