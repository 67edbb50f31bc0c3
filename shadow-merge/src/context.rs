//! Traversal state shared by every [`Mergeable`](crate::Mergeable) impl.

use crate::observer::{ManagedChange, MergeObserver, PlainChange};
use crate::{MergeError, MergeMode, Operation};
use serde::Serialize;
use serde_json::Value;
use shadow_types::Timestamp;
use std::fmt;

/// Carries the merge mode, the current leaf path, the observer and the
/// running dirty flag through one merge or acknowledge walk.
pub struct MergeContext<'a> {
    mode: MergeMode,
    path: String,
    observer: &'a mut dyn MergeObserver,
    ignore_plain: bool,
    dirty: bool,
}

impl<'a> MergeContext<'a> {
    /// Creates a context rooted at the empty path.
    pub fn new(mode: MergeMode, observer: &'a mut dyn MergeObserver) -> Self {
        let ignore_plain = observer.ignore_plain();
        Self {
            mode,
            path: String::new(),
            observer,
            ignore_plain,
            dirty: false,
        }
    }

    /// Returns the merge mode of this walk.
    pub fn mode(&self) -> MergeMode {
        self.mode
    }

    /// Returns the dotted path of the value currently being visited.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns true once any leaf has counted as a change.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Marks the walk dirty for a structural change (map key added/removed).
    pub fn touch(&mut self) {
        self.dirty = true;
    }

    /// Runs `f` with `name` appended to the path as a record field.
    pub fn field<R>(&mut self, name: &str, f: impl FnOnce(&mut Self) -> R) -> R {
        let len = self.path.len();
        if !self.path.is_empty() {
            self.path.push('.');
        }
        self.path.push_str(name);
        let out = f(self);
        self.path.truncate(len);
        out
    }

    /// Runs `f` with `key` appended to the path as a collection key.
    pub fn key<R>(&mut self, key: &dyn fmt::Display, f: impl FnOnce(&mut Self) -> R) -> R {
        use std::fmt::Write;

        let len = self.path.len();
        // Writing into a String cannot fail.
        let _ = write!(self.path, "[{key}]");
        let out = f(self);
        self.path.truncate(len);
        out
    }

    /// Reports a managed leaf and folds its operation into the dirty flag.
    pub fn managed<T: Serialize>(
        &mut self,
        operation: Operation,
        old: (&T, Timestamp),
        new: (&T, Timestamp),
    ) {
        if operation.is_change() {
            self.dirty = true;
        }
        let old_value = to_value(old.0);
        let new_value = to_value(new.0);
        self.observer.managed(&ManagedChange {
            path: &self.path,
            operation,
            old_value: &old_value,
            new_value: &new_value,
            old_timestamp: old.1,
            new_timestamp: new.1,
        });
    }

    /// Reports a plain leaf; its change counts as dirty unless plain leaves
    /// are ignored.
    pub fn plain<T: Serialize>(&mut self, operation: Operation, old: &T, new: &T) {
        if operation.is_change() && !self.ignore_plain {
            self.dirty = true;
        }
        let old_value = to_value(old);
        let new_value = to_value(new);
        self.observer.plain(&PlainChange {
            path: &self.path,
            operation,
            old_value: &old_value,
            new_value: &new_value,
        });
    }

    /// Reports a cleared desired leaf.
    pub fn acknowledged<T: Serialize>(&mut self, value: &T) {
        self.dirty = true;
        let value = to_value(value);
        self.observer.acknowledge(&self.path, &value);
    }

    /// Builds a shape-mismatch error at the current path.
    pub fn shape_mismatch(&self, expected: impl Into<String>, found: impl Into<String>) -> MergeError {
        MergeError::ShapeMismatch {
            path: self.path.clone(),
            expected: expected.into(),
            found: found.into(),
        }
    }
}

fn to_value<T: Serialize>(v: &T) -> Value {
    serde_json::to_value(v).unwrap_or(Value::Null)
}
