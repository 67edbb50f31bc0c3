//! Observers receive one callback per visited leaf.
//!
//! Observers are passed into each call explicitly; there is no global
//! logger registry.

use crate::Operation;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shadow_types::Timestamp;

/// A managed leaf visited by the merge walk.
#[derive(Debug, Clone, Copy)]
pub struct ManagedChange<'a> {
    pub path: &'a str,
    pub operation: Operation,
    pub old_value: &'a Value,
    pub new_value: &'a Value,
    pub old_timestamp: Timestamp,
    pub new_timestamp: Timestamp,
}

/// A plain leaf visited by the merge walk.
#[derive(Debug, Clone, Copy)]
pub struct PlainChange<'a> {
    pub path: &'a str,
    pub operation: Operation,
    pub old_value: &'a Value,
    pub new_value: &'a Value,
}

/// Receives leaf-level notifications from [`merge`](crate::merge) and
/// [`acknowledge`](crate::acknowledge).
///
/// Every method has a no-op default so observers implement only what they
/// care about.
pub trait MergeObserver {
    /// Called for every managed leaf, including unchanged ones.
    fn managed(&mut self, change: &ManagedChange<'_>) {
        let _ = change;
    }

    /// Called for every plain leaf, including unchanged ones.
    fn plain(&mut self, change: &PlainChange<'_>) {
        let _ = change;
    }

    /// Called when a desired leaf is cleared because the reported state
    /// confirmed it.
    fn acknowledge(&mut self, path: &str, value: &Value) {
        let _ = (path, value);
    }

    /// When true, plain-leaf changes do not make the result dirty.
    fn ignore_plain(&self) -> bool {
        false
    }
}

impl<O: MergeObserver + ?Sized> MergeObserver for &mut O {
    fn managed(&mut self, change: &ManagedChange<'_>) {
        (**self).managed(change);
    }

    fn plain(&mut self, change: &PlainChange<'_>) {
        (**self).plain(change);
    }

    fn acknowledge(&mut self, path: &str, value: &Value) {
        (**self).acknowledge(path, value);
    }

    fn ignore_plain(&self) -> bool {
        (**self).ignore_plain()
    }
}

impl<O: MergeObserver + ?Sized> MergeObserver for Box<O> {
    fn managed(&mut self, change: &ManagedChange<'_>) {
        (**self).managed(change);
    }

    fn plain(&mut self, change: &PlainChange<'_>) {
        (**self).plain(change);
    }

    fn acknowledge(&mut self, path: &str, value: &Value) {
        (**self).acknowledge(path, value);
    }

    fn ignore_plain(&self) -> bool {
        (**self).ignore_plain()
    }
}

/// Observer that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl MergeObserver for NoopObserver {}

/// One recorded observer callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "leaf", rename_all = "snake_case")]
pub enum LogEntry {
    Managed {
        path: String,
        operation: Operation,
        old_value: Value,
        new_value: Value,
        old_timestamp: Timestamp,
        new_timestamp: Timestamp,
    },
    Plain {
        path: String,
        operation: Operation,
        old_value: Value,
        new_value: Value,
    },
    Acknowledge {
        path: String,
        value: Value,
    },
}

impl LogEntry {
    /// Returns the dotted path of the leaf.
    pub fn path(&self) -> &str {
        match self {
            LogEntry::Managed { path, .. }
            | LogEntry::Plain { path, .. }
            | LogEntry::Acknowledge { path, .. } => path,
        }
    }

    /// Returns the merge classification, or `None` for acknowledgments.
    pub fn operation(&self) -> Option<Operation> {
        match self {
            LogEntry::Managed { operation, .. } | LogEntry::Plain { operation, .. } => {
                Some(*operation)
            }
            LogEntry::Acknowledge { .. } => None,
        }
    }
}

/// Observer that records every callback in order.
#[derive(Debug, Clone, Default)]
pub struct OperationLog {
    entries: Vec<LogEntry>,
    ignore_plain: bool,
}

impl OperationLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty log that also suppresses plain-leaf dirtiness.
    pub fn ignoring_plain() -> Self {
        Self {
            entries: Vec::new(),
            ignore_plain: true,
        }
    }

    /// Returns all recorded entries.
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Returns entries whose operation is a change (acknowledgments included).
    pub fn changes(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries
            .iter()
            .filter(|e| e.operation().is_none_or(|op| op.is_change()))
    }

    /// Returns the entry recorded for `path`, if any.
    pub fn find(&self, path: &str) -> Option<&LogEntry> {
        self.entries.iter().find(|e| e.path() == path)
    }

    /// Returns the paths of all acknowledged leaves.
    pub fn acknowledged_paths(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter_map(|e| match e {
                LogEntry::Acknowledge { path, .. } => Some(path.clone()),
                _ => None,
            })
            .collect()
    }

    /// Returns true if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl MergeObserver for OperationLog {
    fn managed(&mut self, change: &ManagedChange<'_>) {
        self.entries.push(LogEntry::Managed {
            path: change.path.to_string(),
            operation: change.operation,
            old_value: change.old_value.clone(),
            new_value: change.new_value.clone(),
            old_timestamp: change.old_timestamp,
            new_timestamp: change.new_timestamp,
        });
    }

    fn plain(&mut self, change: &PlainChange<'_>) {
        self.entries.push(LogEntry::Plain {
            path: change.path.to_string(),
            operation: change.operation,
            old_value: change.old_value.clone(),
            new_value: change.new_value.clone(),
        });
    }

    fn acknowledge(&mut self, path: &str, value: &Value) {
        self.entries.push(LogEntry::Acknowledge {
            path: path.to_string(),
            value: value.clone(),
        });
    }

    fn ignore_plain(&self) -> bool {
        self.ignore_plain
    }
}
