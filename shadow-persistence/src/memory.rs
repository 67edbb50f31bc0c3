//! In-memory [`Persistence`] backend.
//!
//! Documents are held as encoded JSON so that every read decodes a fresh
//! copy, exactly as a remote store would.

use crate::{
    Context, DeleteOp, ListEntry, ListOptions, ListPage, Persistence, PersistenceError, PersistenceResult,
    ReadOp, ReadResult, StoredModel, WriteOp, WriteResult,
};
use async_trait::async_trait;
use shadow_types::{ModelKind, PersistenceId, Timestamp, Version};
use std::collections::BTreeMap;
use std::ops::Bound;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Clone)]
struct Record {
    bytes: Vec<u8>,
    version: Version,
    updated: Timestamp,
}

/// Thread-safe in-memory document store with optimistic versioning.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    records: RwLock<BTreeMap<PersistenceId, Record>>,
}

impl MemoryPersistence {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored documents.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Returns true if nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Returns the stored version of `id`, if present.
    pub async fn version_of(&self, id: &PersistenceId) -> Option<Version> {
        self.records.read().await.get(id).map(|r| r.version)
    }

    /// Returns the stored JSON of `id`, if present.
    pub async fn raw(&self, id: &PersistenceId) -> Option<serde_json::Value> {
        let records = self.records.read().await;
        let record = records.get(id)?;
        serde_json::from_slice(&record.bytes).ok()
    }

    fn read_one(records: &BTreeMap<PersistenceId, Record>, op: &ReadOp) -> PersistenceResult<ReadResult> {
        let record = records
            .get(&op.id)
            .ok_or_else(|| PersistenceError::not_found(format!("{} does not exist", op.id)))?;
        check_version(&op.id, op.version, record.version)?;
        let value: serde_json::Value = serde_json::from_slice(&record.bytes)?;
        let model = StoredModel::from_json(op.id.kind, &op.shape, value)?;
        Ok(ReadResult::found(op.id.clone(), model, record.version))
    }

    fn write_one(
        records: &mut BTreeMap<PersistenceId, Record>,
        op: &WriteOp,
        now: Timestamp,
    ) -> PersistenceResult<WriteResult> {
        if !op.model.fits(op.id.kind) {
            return Err(PersistenceError::bad_request(format!(
                "{} must be written as a {} document",
                op.id,
                if op.id.kind == ModelKind::Combined {
                    "combined"
                } else {
                    "single"
                }
            ))
            .with_sub_code("kind_mismatch"));
        }
        let current = records.get(&op.id).map(|r| r.version).unwrap_or(0);
        check_version(&op.id, op.version, current)?;

        let bytes = serde_json::to_vec(&op.model.to_json()?)?;
        let version = current + 1;
        records.insert(
            op.id.clone(),
            Record {
                bytes,
                version,
                updated: now,
            },
        );
        Ok(WriteResult::applied(op.id.clone(), version, now))
    }

    fn delete_one(
        records: &mut BTreeMap<PersistenceId, Record>,
        op: &DeleteOp,
        now: Timestamp,
    ) -> PersistenceResult<WriteResult> {
        let record = records
            .get(&op.id)
            .ok_or_else(|| PersistenceError::not_found(format!("{} does not exist", op.id)))?;
        check_version(&op.id, op.version, record.version)?;
        let version = record.version;
        records.remove(&op.id);
        Ok(WriteResult::applied(op.id.clone(), version, now))
    }
}

fn check_version(id: &PersistenceId, expected: Version, stored: Version) -> PersistenceResult<()> {
    if expected == 0 || expected == stored {
        Ok(())
    } else {
        Err(PersistenceError::conflict(format!(
            "{id}: expected version {expected}, stored version {stored}"
        ))
        .with_sub_code("version_mismatch"))
    }
}

/// Fails every op of a batch with the same error.
fn fail_each<R>(
    ids: impl Iterator<Item = PersistenceId>,
    error: PersistenceError,
    failed: impl Fn(PersistenceId, PersistenceError) -> R,
) -> Vec<R> {
    debug!("Memory batch rejected: {}", error);
    ids.map(|id| failed(id, error.clone())).collect()
}

#[async_trait]
impl Persistence for MemoryPersistence {
    async fn read(&self, ctx: &Context, ops: Vec<ReadOp>) -> Vec<ReadResult> {
        let records = match ctx.run(self.records.read()).await {
            Ok(records) => records,
            Err(e) => return fail_each(ops.into_iter().map(|op| op.id), e, ReadResult::failed),
        };
        ops.iter()
            .map(|op| {
                Self::read_one(&records, op)
                    .unwrap_or_else(|e| ReadResult::failed(op.id.clone(), e))
            })
            .collect()
    }

    async fn write(&self, ctx: &Context, ops: Vec<WriteOp>) -> Vec<WriteResult> {
        let mut records = match ctx.run(self.records.write()).await {
            Ok(records) => records,
            Err(e) => return fail_each(ops.into_iter().map(|op| op.id), e, WriteResult::failed),
        };
        let mut clock = Timestamp::now();
        ops.iter()
            .map(|op| {
                clock = clock.tick();
                let result = Self::write_one(&mut records, op, clock)
                    .unwrap_or_else(|e| WriteResult::failed(op.id.clone(), e));
                debug!(id = %op.id, version = result.version, ok = result.is_ok(), "memory write");
                result
            })
            .collect()
    }

    async fn delete(&self, ctx: &Context, ops: Vec<DeleteOp>) -> Vec<WriteResult> {
        let mut records = match ctx.run(self.records.write()).await {
            Ok(records) => records,
            Err(e) => return fail_each(ops.into_iter().map(|op| op.id), e, WriteResult::failed),
        };
        let now = Timestamp::now();
        ops.iter()
            .map(|op| {
                Self::delete_one(&mut records, op, now)
                    .unwrap_or_else(|e| WriteResult::failed(op.id.clone(), e))
            })
            .collect()
    }

    async fn list(&self, ctx: &Context, options: ListOptions) -> PersistenceResult<ListPage> {
        ctx.check()?;
        let start = match &options.page_token {
            Some(token) => Bound::Excluded(PersistenceId::from_token(token).map_err(|e| {
                PersistenceError::bad_request(e.to_string()).with_sub_code("page_token")
            })?),
            None => Bound::Unbounded,
        };
        let prefix = options.entity_prefix.as_deref().unwrap_or("");
        let limit = options.page_size.unwrap_or(usize::MAX).max(1);

        let records = ctx.run(self.records.read()).await?;
        let mut matching = records
            .range((start, Bound::Unbounded))
            .filter(|(id, _)| id.key.id.starts_with(prefix));

        let entries: Vec<ListEntry> = matching
            .by_ref()
            .take(limit)
            .map(|(id, record)| ListEntry {
                id: id.clone(),
                version: record.version,
                updated: record.updated,
            })
            .collect();

        let next_page_token = match (matching.next(), entries.last()) {
            (Some(_), Some(last)) => Some(last.id.to_token().map_err(|e| {
                PersistenceError::internal(e.to_string()).with_sub_code("page_token")
            })?),
            _ => None,
        };

        Ok(ListPage {
            entries,
            next_page_token,
        })
    }
}
