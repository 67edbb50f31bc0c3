//! Batch op and result types exchanged with a [`Persistence`](crate::Persistence) backend.

use crate::{PersistenceError, PersistenceResult};
use serde::{Deserialize, Serialize};
use shadow_model::{Model, Shape};
use shadow_types::{ModelKind, PersistenceId, Timestamp, Version};

/// A stored document, or the reported/desired pair of a combined unit.
///
/// A combined unit is always written whole, but either part may be absent:
/// a part that was never written (or was deleted) reads as not found, the
/// same as a missing document in the separate layout.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredModel {
    Single(Model),
    Combined {
        reported: Option<Model>,
        desired: Option<Model>,
    },
}

impl StoredModel {
    /// Returns true if this variant may be stored under `kind`.
    pub fn fits(&self, kind: ModelKind) -> bool {
        matches!(
            (self, kind),
            (StoredModel::Combined { .. }, ModelKind::Combined)
                | (StoredModel::Single(_), ModelKind::Reported | ModelKind::Desired)
        )
    }

    /// Returns the part of the document addressed by `kind`.
    ///
    /// A single document answers for whichever kind it was stored under;
    /// a combined unit only for `Reported` and `Desired`, and only when
    /// that part is present.
    pub fn part(&self, kind: ModelKind) -> Option<&Model> {
        match (self, kind) {
            (StoredModel::Single(model), _) => Some(model),
            (StoredModel::Combined { reported, .. }, ModelKind::Reported) => reported.as_ref(),
            (StoredModel::Combined { desired, .. }, ModelKind::Desired) => desired.as_ref(),
            (StoredModel::Combined { .. }, ModelKind::Combined) => None,
        }
    }

    /// Encodes the document as JSON.
    pub fn to_json(&self) -> PersistenceResult<serde_json::Value> {
        Ok(match self {
            StoredModel::Single(model) => model.to_json()?,
            StoredModel::Combined { reported, desired } => serde_json::json!({
                "reported": reported.as_ref().map(Model::to_json).transpose()?,
                "desired": desired.as_ref().map(Model::to_json).transpose()?,
            }),
        })
    }

    /// Decodes a document stored under `kind` with `shape`.
    pub fn from_json(
        kind: ModelKind,
        shape: &Shape,
        mut value: serde_json::Value,
    ) -> PersistenceResult<Self> {
        let decode = |value: serde_json::Value| {
            shape.decode(value).map_err(|e| {
                PersistenceError::internal(format!("decoding {}: {e}", shape.name()))
                    .with_sub_code("decode")
            })
        };
        match kind {
            ModelKind::Combined => {
                // A missing or null part is absent.
                let mut part = |name: &str| match value.get_mut(name).map(serde_json::Value::take) {
                    None | Some(serde_json::Value::Null) => Ok(None),
                    Some(part) => decode(part).map(Some),
                };
                let reported = part("reported")?;
                let desired = part("desired")?;
                Ok(StoredModel::Combined { reported, desired })
            }
            ModelKind::Reported | ModelKind::Desired => Ok(StoredModel::Single(decode(value)?)),
        }
    }
}

/// Reads one document.
#[derive(Debug, Clone)]
pub struct ReadOp {
    pub id: PersistenceId,
    /// `0` reads the latest version.
    pub version: Version,
    /// Shape used to decode the stored bytes.
    pub shape: Shape,
}

impl ReadOp {
    /// Reads the latest version of `id`.
    pub fn new(id: PersistenceId, shape: Shape) -> Self {
        Self {
            id,
            version: 0,
            shape,
        }
    }

    /// Requires the stored version to be `version`.
    #[must_use]
    pub fn at_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }
}

/// Outcome of a [`ReadOp`].
#[derive(Debug, Clone)]
pub struct ReadResult {
    pub id: PersistenceId,
    pub model: Option<StoredModel>,
    pub version: Version,
    pub error: Option<PersistenceError>,
}

impl ReadResult {
    /// A successful read.
    pub fn found(id: PersistenceId, model: StoredModel, version: Version) -> Self {
        Self {
            id,
            model: Some(model),
            version,
            error: None,
        }
    }

    /// A failed read.
    pub fn failed(id: PersistenceId, error: PersistenceError) -> Self {
        Self {
            id,
            model: None,
            version: 0,
            error: Some(error),
        }
    }

    /// Returns true if the read failed with `NotFound`.
    pub fn is_not_found(&self) -> bool {
        self.error.as_ref().is_some_and(PersistenceError::is_not_found)
    }
}

/// Writes one document.
#[derive(Debug, Clone)]
pub struct WriteOp {
    pub id: PersistenceId,
    pub model: StoredModel,
    /// `0` writes unconditionally.
    pub version: Version,
}

impl WriteOp {
    /// Creates a write of `model` under `id`, conditional on `version`.
    pub fn new(id: PersistenceId, model: StoredModel, version: Version) -> Self {
        Self { id, model, version }
    }
}

/// Deletes one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteOp {
    pub id: PersistenceId,
    /// `0` deletes regardless of version.
    pub version: Version,
}

impl DeleteOp {
    pub fn new(id: PersistenceId, version: Version) -> Self {
        Self { id, version }
    }
}

/// Outcome of a [`WriteOp`] or [`DeleteOp`].
#[derive(Debug, Clone, PartialEq)]
pub struct WriteResult {
    pub id: PersistenceId,
    /// Version after the write, or the deleted version.
    pub version: Version,
    /// When the backend applied the op.
    pub timestamp: Timestamp,
    pub error: Option<PersistenceError>,
}

impl WriteResult {
    pub fn applied(id: PersistenceId, version: Version, timestamp: Timestamp) -> Self {
        Self {
            id,
            version,
            timestamp,
            error: None,
        }
    }

    pub fn failed(id: PersistenceId, error: PersistenceError) -> Self {
        Self {
            id,
            version: 0,
            timestamp: Timestamp::ZERO,
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Options for [`Persistence::list`](crate::Persistence::list).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListOptions {
    /// Only ids whose entity id starts with this prefix.
    pub entity_prefix: Option<String>,
    /// Token from a previous page.
    pub page_token: Option<String>,
    /// Maximum entries per page. `None` returns everything.
    pub page_size: Option<usize>,
}

/// One stored document as seen by `list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListEntry {
    pub id: PersistenceId,
    pub version: Version,
    pub updated: Timestamp,
}

/// One page of `list` output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListPage {
    pub entries: Vec<ListEntry>,
    /// Present when more entries follow.
    pub next_page_token: Option<String>,
}
