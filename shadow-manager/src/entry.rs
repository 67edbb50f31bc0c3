//! Batch entries and their per-entry results.

use crate::ShadowError;
use shadow_merge::MergeMode;
use shadow_model::Model;
use shadow_persistence::ListEntry;
use shadow_types::{ClientToken, EntityKey, ModelKind, Version};

// ── Report ───────────────────────────────────────────────────────

/// A device reporting its state.
#[derive(Debug, Clone)]
pub struct ReportEntry {
    pub key: EntityKey,
    /// Must be present; use delete to remove a shadow.
    pub model: Option<Model>,
    pub client_token: ClientToken,
    /// Overrides the configured default merge mode.
    pub mode: Option<MergeMode>,
}

impl ReportEntry {
    pub fn new(key: EntityKey, model: Model) -> Self {
        Self {
            key,
            model: Some(model),
            client_token: ClientToken::default(),
            mode: None,
        }
    }

    #[must_use]
    pub fn with_token(mut self, token: impl Into<ClientToken>) -> Self {
        self.client_token = token.into();
        self
    }

    #[must_use]
    pub fn with_mode(mut self, mode: MergeMode) -> Self {
        self.mode = Some(mode);
        self
    }
}

/// Outcome of one [`ReportEntry`].
///
/// Entries addressing the same entity in one batch share the outcome of
/// that entity.
#[derive(Debug, Clone)]
pub struct ReportResult {
    pub key: EntityKey,
    pub client_token: ClientToken,
    /// Reported document after the merge.
    pub reported: Option<Model>,
    /// Desired document after acknowledgment, if one is stored.
    pub desired: Option<Model>,
    pub reported_version: Version,
    pub desired_version: Version,
    /// The merge changed the reported document.
    pub reported_dirty: bool,
    /// The acknowledgment cleared desired leaves.
    pub desired_dirty: bool,
    /// The reported part was stored or needed no write.
    pub reported_processed: bool,
    /// The desired part was stored or needed no write.
    pub desired_processed: bool,
    pub error: Option<ShadowError>,
}

impl ReportResult {
    pub(crate) fn new(key: EntityKey, client_token: ClientToken) -> Self {
        Self {
            key,
            client_token,
            reported: None,
            desired: None,
            reported_version: 0,
            desired_version: 0,
            reported_dirty: false,
            desired_dirty: false,
            reported_processed: false,
            desired_processed: false,
            error: None,
        }
    }

    pub(crate) fn failed(mut self, error: ShadowError) -> Self {
        self.error = Some(error);
        self
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

// ── Desire ───────────────────────────────────────────────────────

/// A controller requesting a target state.
#[derive(Debug, Clone)]
pub struct DesireEntry {
    pub key: EntityKey,
    /// Must be present; use delete to remove a shadow.
    pub model: Option<Model>,
    pub client_token: ClientToken,
}

impl DesireEntry {
    pub fn new(key: EntityKey, model: Model) -> Self {
        Self {
            key,
            model: Some(model),
            client_token: ClientToken::default(),
        }
    }

    #[must_use]
    pub fn with_token(mut self, token: impl Into<ClientToken>) -> Self {
        self.client_token = token.into();
        self
    }
}

/// Outcome of one [`DesireEntry`].
#[derive(Debug, Clone)]
pub struct DesireResult {
    pub key: EntityKey,
    pub client_token: ClientToken,
    /// Desired document after the merge.
    pub desired: Option<Model>,
    pub version: Version,
    pub dirty: bool,
    pub processed: bool,
    pub error: Option<ShadowError>,
}

impl DesireResult {
    pub(crate) fn new(key: EntityKey, client_token: ClientToken) -> Self {
        Self {
            key,
            client_token,
            desired: None,
            version: 0,
            dirty: false,
            processed: false,
            error: None,
        }
    }

    pub(crate) fn failed(mut self, error: ShadowError) -> Self {
        self.error = Some(error);
        self
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

// ── Read ─────────────────────────────────────────────────────────

/// Reads one part of a shadow. `kind` must be `Reported` or `Desired`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadEntry {
    pub key: EntityKey,
    pub kind: ModelKind,
    /// `0` reads the latest version.
    pub version: Version,
}

impl ReadEntry {
    pub fn new(key: EntityKey, kind: ModelKind) -> Self {
        Self {
            key,
            kind,
            version: 0,
        }
    }

    #[must_use]
    pub fn at_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }
}

/// Outcome of one [`ReadEntry`].
#[derive(Debug, Clone)]
pub struct ReadResult {
    pub key: EntityKey,
    pub kind: ModelKind,
    pub model: Option<Model>,
    pub version: Version,
    pub error: Option<ShadowError>,
}

impl ReadResult {
    pub(crate) fn new(entry: &ReadEntry) -> Self {
        Self {
            key: entry.key.clone(),
            kind: entry.kind,
            model: None,
            version: 0,
            error: None,
        }
    }

    pub(crate) fn failed(mut self, error: ShadowError) -> Self {
        self.error = Some(error);
        self
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

// ── Delete ───────────────────────────────────────────────────────

/// Deletes one part of a shadow, or both when `kind` is `Combined`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteEntry {
    pub key: EntityKey,
    pub kind: ModelKind,
    /// `0` deletes regardless of version.
    pub version: Version,
}

impl DeleteEntry {
    /// Deletes both parts.
    pub fn new(key: EntityKey) -> Self {
        Self {
            key,
            kind: ModelKind::Combined,
            version: 0,
        }
    }

    /// Deletes only the `kind` part.
    pub fn part(key: EntityKey, kind: ModelKind) -> Self {
        Self {
            key,
            kind,
            version: 0,
        }
    }

    #[must_use]
    pub fn at_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }
}

/// Outcome of one [`DeleteEntry`].
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteResult {
    pub key: EntityKey,
    pub kind: ModelKind,
    /// Version that was deleted, or the version written by a partial
    /// delete in the combined layout.
    pub version: Version,
    pub error: Option<ShadowError>,
}

impl DeleteResult {
    pub(crate) fn new(entry: &DeleteEntry) -> Self {
        Self {
            key: entry.key.clone(),
            kind: entry.kind,
            version: 0,
            error: None,
        }
    }

    pub(crate) fn failed(mut self, error: ShadowError) -> Self {
        self.error = Some(error);
        self
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

// ── List ─────────────────────────────────────────────────────────

/// One page of stored documents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListResults {
    pub entries: Vec<ListEntry>,
    /// Pass back in `ListOptions::page_token` to continue.
    pub next_page_token: Option<String>,
}

impl ListResults {
    /// Returns the distinct entity keys on this page, in order.
    pub fn keys(&self) -> Vec<EntityKey> {
        let mut keys: Vec<EntityKey> = Vec::new();
        for entry in &self.entries {
            if keys.last() != Some(&entry.id.key) {
                keys.push(entry.id.key.clone());
            }
        }
        keys
    }
}
