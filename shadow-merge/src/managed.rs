//! Managed leaf: a value that carries its own last-modified timestamp.
//!
//! Conflicts between two managed leaves resolve independently of the rest
//! of the document: the later timestamp wins. Value identity is the
//! value's own equality; the timestamp never takes part in it.

use crate::mergeable::same_value;
use crate::{MergeContext, MergeMode, MergeResult, Mergeable, Operation};
use serde::{Deserialize, Serialize};
use shadow_types::Timestamp;
use std::cmp::Ordering;

/// A value paired with the timestamp of its last write.
///
/// The default (`T::default()` at [`Timestamp::ZERO`]) is the empty leaf:
/// never written, or cleared by acknowledgment.
///
/// A newer timestamp always wins a merge, even when the value is the same.
/// Such a timestamp-only advance is classified [`Operation::Update`] and
/// makes the document dirty, so the stored leaf keeps the latest timestamp
/// for acknowledgment to compare against.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Managed<T> {
    /// The current value.
    value: T,
    /// Timestamp of the last write.
    #[serde(default)]
    timestamp: Timestamp,
}

impl<T> Managed<T> {
    /// Creates a leaf with an explicit timestamp.
    #[must_use]
    pub fn new(value: T, timestamp: Timestamp) -> Self {
        Self { value, timestamp }
    }

    /// Creates a leaf stamped with the current time.
    #[must_use]
    pub fn now(value: T) -> Self {
        Self {
            value,
            timestamp: Timestamp::now(),
        }
    }

    /// Returns a reference to the current value.
    #[must_use]
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Returns the timestamp of the last write.
    #[must_use]
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// Consumes the leaf, returning its value.
    pub fn into_value(self) -> T {
        self.value
    }
}

impl<T: Default + PartialEq> Managed<T> {
    /// Returns true if the leaf carries neither a timestamp nor a value.
    pub fn is_empty(&self) -> bool {
        self.timestamp.is_zero() && self.value == T::default()
    }
}

impl<T> Mergeable for Managed<T>
where
    T: Clone + Default + PartialEq + Serialize,
{
    fn merge(old: &Self, new: &Self, cx: &mut MergeContext<'_>) -> MergeResult<Self> {
        let (operation, merged) = if new.is_empty() {
            if !old.is_empty() && cx.mode() == MergeMode::ClientIsMaster {
                (Operation::Remove, Self::default())
            } else {
                (Operation::NotChanged, old.clone())
            }
        } else if old.is_empty() {
            (Operation::Add, new.clone())
        } else {
            match new.timestamp.cmp(&old.timestamp) {
                Ordering::Greater => (Operation::Update, new.clone()),
                Ordering::Equal if !same_value(&new.value, &old.value) => {
                    (Operation::Update, new.clone())
                }
                _ => (Operation::NotChanged, old.clone()),
            }
        };

        cx.managed(
            operation,
            (&old.value, old.timestamp),
            (&new.value, new.timestamp),
        );
        Ok(merged)
    }

    fn acknowledge(desired: &Self, reported: &Self, cx: &mut MergeContext<'_>) -> MergeResult<Self> {
        let confirmed = !desired.is_empty()
            && !reported.is_empty()
            && reported.timestamp >= desired.timestamp
            && same_value(&reported.value, &desired.value);

        if confirmed {
            cx.acknowledged(&desired.value);
            Ok(Self::default())
        } else {
            Ok(desired.clone())
        }
    }

    fn added(&self, cx: &mut MergeContext<'_>) {
        cx.managed(
            Operation::Add,
            (&T::default(), Timestamp::ZERO),
            (&self.value, self.timestamp),
        );
    }

    fn removed(&self, cx: &mut MergeContext<'_>) {
        cx.managed(
            Operation::Remove,
            (&self.value, self.timestamp),
            (&T::default(), Timestamp::ZERO),
        );
    }
}
