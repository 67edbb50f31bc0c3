use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a single leaf after merging two documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Add,
    Update,
    Remove,
    NotChanged,
}

impl Operation {
    /// Returns true for anything other than [`Operation::NotChanged`].
    pub const fn is_change(&self) -> bool {
        !matches!(self, Operation::NotChanged)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operation::Add => "add",
            Operation::Update => "update",
            Operation::Remove => "remove",
            Operation::NotChanged => "not_changed",
        };
        f.write_str(s)
    }
}

/// Governs what happens to values present in the old document but absent
/// from the new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeMode {
    /// Upsert only: absent values in the new document are left untouched.
    #[default]
    ServerIsMaster,
    /// The new document is authoritative: absent keys and emptied managed
    /// leaves are removed.
    ClientIsMaster,
}
