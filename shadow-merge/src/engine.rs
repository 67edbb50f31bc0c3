//! Entry points for the merge and acknowledgment walks.

use crate::{MergeContext, MergeMode, MergeObserver, MergeResult, Mergeable, OperationLog};

/// The outcome of a merge or acknowledgment walk.
#[derive(Debug, Clone, PartialEq)]
pub struct Merged<T> {
    /// The freshly built document.
    pub value: T,
    /// True iff at least one leaf changed (subject to `ignore_plain`).
    pub dirty: bool,
}

/// Merges `new` into `old` under `mode`.
///
/// Neither input is modified. Fails only when the two documents disagree
/// on shape.
pub fn merge<T: Mergeable>(
    old: &T,
    new: &T,
    mode: MergeMode,
    observer: &mut dyn MergeObserver,
) -> MergeResult<Merged<T>> {
    let mut cx = MergeContext::new(mode, observer);
    let value = T::merge(old, new, &mut cx)?;
    Ok(Merged {
        value,
        dirty: cx.is_dirty(),
    })
}

/// Clears every managed leaf of `desired` that `reported` confirms: the
/// reported leaf has an equal value and a timestamp at least as recent.
///
/// Plain leaves are never acknowledged. The result is dirty iff at least
/// one leaf was cleared.
pub fn acknowledge<T: Mergeable>(
    reported: &T,
    desired: &T,
    observer: &mut dyn MergeObserver,
) -> MergeResult<Merged<T>> {
    let mut cx = MergeContext::new(MergeMode::ServerIsMaster, observer);
    let value = T::acknowledge(desired, reported, &mut cx)?;
    Ok(Merged {
        value,
        dirty: cx.is_dirty(),
    })
}

/// [`merge`] with a fresh [`OperationLog`] as observer.
pub fn merge_logged<T: Mergeable>(
    old: &T,
    new: &T,
    mode: MergeMode,
) -> MergeResult<(Merged<T>, OperationLog)> {
    let mut log = OperationLog::new();
    let merged = merge(old, new, mode, &mut log)?;
    Ok((merged, log))
}

/// [`acknowledge`] with a fresh [`OperationLog`] as observer.
pub fn acknowledge_logged<T: Mergeable>(
    reported: &T,
    desired: &T,
) -> MergeResult<(Merged<T>, OperationLog)> {
    let mut log = OperationLog::new();
    let merged = acknowledge(reported, desired, &mut log)?;
    Ok((merged, log))
}
