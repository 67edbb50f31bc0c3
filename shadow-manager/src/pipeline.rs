//! Chunked fan-out and the batched read/write steps shared by operations.

use crate::group::{GroupedOperation, Part};
use crate::{Context, ShadowError, ShadowResult, StorageLayout};
use futures::stream::{self, StreamExt};
use shadow_persistence::{Persistence, PersistenceError, ReadOp, WriteOp};
use std::future::Future;
use tracing::warn;

/// Fails with [`ShadowError::Cancelled`] once `ctx` is done.
pub(crate) fn checkpoint(ctx: &Context) -> ShadowResult<()> {
    ctx.check().map_err(ShadowError::from)
}

/// Awaits one persistence batch of `sent` ops, giving up when `ctx` is
/// done. An abandoned batch may still have been applied in part.
pub(crate) async fn bounded<T>(
    ctx: &Context,
    sent: usize,
    call: impl Future<Output = Vec<T>>,
) -> ShadowResult<Vec<T>> {
    let results = ctx.run(call).await.map_err(|e| {
        warn!("Abandoned persistence batch of {} ops: {}", sent, e);
        ShadowError::from(e)
    })?;
    if results.len() != sent {
        return Err(short_batch(sent, results.len()));
    }
    Ok(results)
}

/// Splits `items` into chunks of at most `chunk_size`, runs `f` on up to
/// `concurrency` chunks at once and joins the outputs.
///
/// Output order follows chunk completion; callers address results by the
/// indices carried in each item.
pub(crate) async fn fan_out<T, F, Fut>(
    items: Vec<T>,
    chunk_size: usize,
    concurrency: usize,
    f: F,
) -> Vec<T>
where
    F: FnMut(Vec<T>) -> Fut,
    Fut: Future<Output = Vec<T>>,
{
    let mut chunks = Vec::new();
    let mut items = items.into_iter().peekable();
    while items.peek().is_some() {
        chunks.push(items.by_ref().take(chunk_size).collect::<Vec<_>>());
    }
    stream::iter(chunks)
        .map(f)
        .buffer_unordered(concurrency)
        .collect::<Vec<Vec<T>>>()
        .await
        .into_iter()
        .flatten()
        .collect()
}

/// Fails every group that is not already failed.
pub(crate) fn fail_all(groups: &mut [GroupedOperation], error: &ShadowError) {
    for group in groups {
        group.fail(error.clone());
    }
}

fn short_batch(sent: usize, received: usize) -> ShadowError {
    warn!("Persistence returned {} results for {} ops", received, sent);
    ShadowError::Storage(
        PersistenceError::internal(format!(
            "persistence returned {received} results for {sent} ops"
        ))
        .with_sub_code("short_batch"),
    )
}

/// Issues one batched read for every live group and routes each result
/// back to its group.
pub(crate) async fn read_groups(
    ctx: &Context,
    persistence: &dyn Persistence,
    groups: &mut [GroupedOperation],
    layout: StorageLayout,
    parts: &[Part],
) {
    let (owners, ops): (Vec<usize>, Vec<ReadOp>) = groups
        .iter()
        .enumerate()
        .filter(|(_, group)| !group.is_failed())
        .flat_map(|(i, group)| group.read_ops(layout, parts).into_iter().map(move |op| (i, op)))
        .unzip();
    if ops.is_empty() {
        return;
    }
    let results = match bounded(ctx, ops.len(), persistence.read(ctx, ops)).await {
        Ok(results) => results,
        Err(error) => {
            for owner in owners {
                groups[owner].fail(error.clone());
            }
            return;
        }
    };
    for (owner, result) in owners.into_iter().zip(results) {
        groups[owner].apply_read(result);
    }
}

/// Issues one batched write for every dirty group and routes each result
/// back to its group.
pub(crate) async fn write_groups(
    ctx: &Context,
    persistence: &dyn Persistence,
    groups: &mut [GroupedOperation],
    layout: StorageLayout,
) {
    let (owners, ops): (Vec<usize>, Vec<WriteOp>) = groups
        .iter()
        .enumerate()
        .flat_map(|(i, group)| group.write_ops(layout).into_iter().map(move |op| (i, op)))
        .unzip();
    if ops.is_empty() {
        return;
    }
    let results = match bounded(ctx, ops.len(), persistence.write(ctx, ops)).await {
        Ok(results) => results,
        Err(error) => {
            for owner in owners {
                groups[owner].fail(error.clone());
            }
            return;
        }
    };
    for (owner, result) in owners.into_iter().zip(results) {
        if let Some(error) = &result.error {
            warn!("Write of {} failed: {}", result.id, error);
        }
        groups[owner].apply_write(result);
    }
}
