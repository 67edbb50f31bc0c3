//! Identifier types used throughout the shadow engine.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Per-document version owned by the persistence layer.
///
/// `0` on read means "latest", on write "create or overwrite unconditionally".
pub type Version = u64;

/// Identifies one logical shadow: a device (`id`) and the shadow's `name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityKey {
    pub id: String,
    pub name: String,
}

impl EntityKey {
    /// Creates a key from its two parts.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// Returns the persistence id of one document under this key.
    pub fn with_kind(&self, kind: ModelKind) -> PersistenceId {
        PersistenceId {
            key: self.clone(),
            kind,
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.id, self.name)
    }
}

/// Which document under an [`EntityKey`] an operation addresses.
///
/// `Combined` is the zero value: on delete it means "both parts", in storage
/// it names the single document that multiplexes reported and desired.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    #[default]
    Combined,
    Reported,
    Desired,
}

impl ModelKind {
    /// Returns the lowercase name used in logs and ids.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Combined => "combined",
            ModelKind::Reported => "reported",
            ModelKind::Desired => "desired",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "combined" => Ok(ModelKind::Combined),
            "reported" => Ok(ModelKind::Reported),
            "desired" => Ok(ModelKind::Desired),
            other => Err(Error::InvalidModelKind(other.to_string())),
        }
    }
}

/// An [`EntityKey`] plus the document kind stored under it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PersistenceId {
    pub key: EntityKey,
    pub kind: ModelKind,
}

impl PersistenceId {
    /// Creates a persistence id.
    pub fn new(key: EntityKey, kind: ModelKind) -> Self {
        Self { key, kind }
    }

    /// Encodes the id as an opaque token (used for list pagination).
    pub fn to_token(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decodes an id produced by [`PersistenceId::to_token`].
    pub fn from_token(token: &str) -> crate::Result<Self> {
        serde_json::from_str(token).map_err(|e| Error::InvalidPersistenceId(e.to_string()))
    }
}

impl fmt::Display for PersistenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.key, self.kind)
    }
}

/// Caller-supplied correlation token echoed on every batch result.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientToken(String);

impl ClientToken {
    /// Wraps an existing token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Generates a fresh, time-ordered token.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Returns the token text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if no token was supplied.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ClientToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClientToken {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ClientToken {
    fn from(s: String) -> Self {
        Self(s)
    }
}
