//! The [`Mergeable`] capability and its structural implementations.

use crate::{MergeContext, MergeMode, MergeResult, Operation};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::Hash;

/// A shape that can be deep-merged and acknowledged.
///
/// Implementations walk their children through the [`MergeContext`], which
/// tracks the leaf path, the merge mode and the dirty flag. Both documents
/// must describe the same shape; statically typed shapes get that for free,
/// dynamic ones ([`Node`](crate::Node)) return
/// [`MergeError::ShapeMismatch`](crate::MergeError::ShapeMismatch).
pub trait Mergeable: Clone {
    /// Merges `new` into `old`, returning a fresh value.
    fn merge(old: &Self, new: &Self, cx: &mut MergeContext<'_>) -> MergeResult<Self>;

    /// Clears every managed leaf of `desired` that `reported` confirms.
    fn acknowledge(desired: &Self, reported: &Self, cx: &mut MergeContext<'_>) -> MergeResult<Self>;

    /// Reports every leaf of a value inserted verbatim as [`Operation::Add`].
    fn added(&self, cx: &mut MergeContext<'_>);

    /// Reports every leaf of a value dropped wholesale as [`Operation::Remove`].
    fn removed(&self, cx: &mut MergeContext<'_>);
}

// ── Plain leaves ─────────────────────────────────────────────────

/// Leaf value equality.
///
/// Values that are not equal to themselves (a float NaN, or anything
/// holding one) compare by their serialized form, so an unchanged NaN leaf
/// stays unchanged.
#[allow(clippy::eq_op)]
pub(crate) fn same_value<T: PartialEq + Serialize>(a: &T, b: &T) -> bool {
    if a == b {
        return true;
    }
    a != a && b != b && serde_json::to_value(a).ok() == serde_json::to_value(b).ok()
}

/// Shared plain-leaf rule: a zero `new` keeps `old`, anything else replaces it.
pub(crate) fn merge_plain<T>(
    old: &T,
    new: &T,
    is_zero: impl Fn(&T) -> bool,
    cx: &mut MergeContext<'_>,
) -> T
where
    T: Clone + PartialEq + Serialize,
{
    let (operation, merged) = if is_zero(new) {
        (Operation::NotChanged, old)
    } else if is_zero(old) {
        (Operation::Add, new)
    } else if !same_value(old, new) {
        (Operation::Update, new)
    } else {
        (Operation::NotChanged, old)
    };
    cx.plain(operation, old, new);
    merged.clone()
}

macro_rules! plain_leaf {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl Mergeable for $ty {
                fn merge(old: &Self, new: &Self, cx: &mut MergeContext<'_>) -> MergeResult<Self> {
                    Ok(merge_plain(old, new, |v| *v == <$ty>::default(), cx))
                }

                fn acknowledge(
                    desired: &Self,
                    _reported: &Self,
                    _cx: &mut MergeContext<'_>,
                ) -> MergeResult<Self> {
                    Ok(desired.clone())
                }

                fn added(&self, cx: &mut MergeContext<'_>) {
                    cx.plain(Operation::Add, &<$ty>::default(), self);
                }

                fn removed(&self, cx: &mut MergeContext<'_>) {
                    cx.plain(Operation::Remove, self, &<$ty>::default());
                }
            }
        )+
    };
}

plain_leaf!(
    bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, String,
);

/// Ordered collections are opaque plain leaves: an empty list is the zero
/// value, anything else replaces the old list wholesale.
impl<T> Mergeable for Vec<T>
where
    T: Clone + PartialEq + Serialize,
{
    fn merge(old: &Self, new: &Self, cx: &mut MergeContext<'_>) -> MergeResult<Self> {
        Ok(merge_plain(old, new, |v| v.is_empty(), cx))
    }

    fn acknowledge(desired: &Self, _reported: &Self, _cx: &mut MergeContext<'_>) -> MergeResult<Self> {
        Ok(desired.clone())
    }

    fn added(&self, cx: &mut MergeContext<'_>) {
        cx.plain(Operation::Add, &Vec::<T>::new(), self);
    }

    fn removed(&self, cx: &mut MergeContext<'_>) {
        cx.plain(Operation::Remove, self, &Vec::<T>::new());
    }
}

// ── Optional references ──────────────────────────────────────────

impl<T: Mergeable> Mergeable for Option<T> {
    fn merge(old: &Self, new: &Self, cx: &mut MergeContext<'_>) -> MergeResult<Self> {
        match (old, new) {
            (Some(o), Some(n)) => T::merge(o, n, cx).map(Some),
            (None, Some(n)) => {
                n.added(cx);
                Ok(Some(n.clone()))
            }
            (_, None) => Ok(old.clone()),
        }
    }

    fn acknowledge(desired: &Self, reported: &Self, cx: &mut MergeContext<'_>) -> MergeResult<Self> {
        match (desired, reported) {
            (Some(d), Some(r)) => T::acknowledge(d, r, cx).map(Some),
            _ => Ok(desired.clone()),
        }
    }

    fn added(&self, cx: &mut MergeContext<'_>) {
        if let Some(v) = self {
            v.added(cx);
        }
    }

    fn removed(&self, cx: &mut MergeContext<'_>) {
        if let Some(v) = self {
            v.removed(cx);
        }
    }
}

impl<T: Mergeable> Mergeable for Box<T> {
    fn merge(old: &Self, new: &Self, cx: &mut MergeContext<'_>) -> MergeResult<Self> {
        T::merge(old, new, cx).map(Box::new)
    }

    fn acknowledge(desired: &Self, reported: &Self, cx: &mut MergeContext<'_>) -> MergeResult<Self> {
        T::acknowledge(desired, reported, cx).map(Box::new)
    }

    fn added(&self, cx: &mut MergeContext<'_>) {
        (**self).added(cx);
    }

    fn removed(&self, cx: &mut MergeContext<'_>) {
        (**self).removed(cx);
    }
}

// ── Keyed collections ────────────────────────────────────────────

macro_rules! keyed_collection {
    ($map:ident, $($key_bound:path),+) => {
        impl<K, V> Mergeable for $map<K, V>
        where
            K: Clone + fmt::Display $(+ $key_bound)+,
            V: Mergeable,
        {
            fn merge(old: &Self, new: &Self, cx: &mut MergeContext<'_>) -> MergeResult<Self> {
                let mut merged = old.clone();

                for (key, new_value) in new {
                    let value = cx.key(key, |cx| match old.get(key) {
                        Some(old_value) => V::merge(old_value, new_value, cx),
                        None => {
                            new_value.added(cx);
                            cx.touch();
                            Ok(new_value.clone())
                        }
                    })?;
                    merged.insert(key.clone(), value);
                }

                if cx.mode() == MergeMode::ClientIsMaster {
                    for (key, old_value) in old {
                        if !new.contains_key(key) {
                            cx.key(key, |cx| {
                                old_value.removed(cx);
                                cx.touch();
                            });
                            merged.remove(key);
                        }
                    }
                }

                Ok(merged)
            }

            fn acknowledge(
                desired: &Self,
                reported: &Self,
                cx: &mut MergeContext<'_>,
            ) -> MergeResult<Self> {
                let mut out = desired.clone();
                for (key, desired_value) in desired {
                    if let Some(reported_value) = reported.get(key) {
                        let value =
                            cx.key(key, |cx| V::acknowledge(desired_value, reported_value, cx))?;
                        out.insert(key.clone(), value);
                    }
                }
                Ok(out)
            }

            fn added(&self, cx: &mut MergeContext<'_>) {
                for (key, value) in self {
                    cx.key(key, |cx| value.added(cx));
                }
            }

            fn removed(&self, cx: &mut MergeContext<'_>) {
                for (key, value) in self {
                    cx.key(key, |cx| value.removed(cx));
                }
            }
        }
    };
}

keyed_collection!(BTreeMap, Ord);
keyed_collection!(HashMap, Eq, Hash);

// ── Records ──────────────────────────────────────────────────────

/// Implements [`Mergeable`] for a struct by walking the listed fields.
///
/// Fields left out of the list are internal: they are carried over from
/// the old (or desired) document untouched.
///
/// ```
/// use shadow_merge::{mergeable_record, Managed};
///
/// #[derive(Debug, Clone, Default, PartialEq)]
/// struct Thermostat {
///     set_point: Managed<f64>,
///     label: String,
/// }
///
/// mergeable_record!(Thermostat { set_point, label });
/// ```
#[macro_export]
macro_rules! mergeable_record {
    ($ty:ty { $($field:ident),+ $(,)? }) => {
        impl $crate::Mergeable for $ty {
            #[allow(clippy::needless_update)]
            fn merge(
                old: &Self,
                new: &Self,
                cx: &mut $crate::MergeContext<'_>,
            ) -> $crate::MergeResult<Self> {
                Ok(Self {
                    $(
                        $field: cx.field(stringify!($field), |cx| {
                            $crate::Mergeable::merge(&old.$field, &new.$field, cx)
                        })?,
                    )+
                    ..::core::clone::Clone::clone(old)
                })
            }

            #[allow(clippy::needless_update)]
            fn acknowledge(
                desired: &Self,
                reported: &Self,
                cx: &mut $crate::MergeContext<'_>,
            ) -> $crate::MergeResult<Self> {
                Ok(Self {
                    $(
                        $field: cx.field(stringify!($field), |cx| {
                            $crate::Mergeable::acknowledge(&desired.$field, &reported.$field, cx)
                        })?,
                    )+
                    ..::core::clone::Clone::clone(desired)
                })
            }

            fn added(&self, cx: &mut $crate::MergeContext<'_>) {
                $(
                    cx.field(stringify!($field), |cx| $crate::Mergeable::added(&self.$field, cx));
                )+
            }

            fn removed(&self, cx: &mut $crate::MergeContext<'_>) {
                $(
                    cx.field(stringify!($field), |cx| $crate::Mergeable::removed(&self.$field, cx));
                )+
            }
        }
    };
}
