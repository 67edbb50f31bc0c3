//! Shared fixtures for manager integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shadow_manager::{ManagerConfig, ShadowManager, StorageLayout};
use shadow_merge::{mergeable_record, Managed};
use shadow_model::{Model, ShapeRegistry, TypedShape};
use shadow_persistence::{
    Context, DeleteOp, ListOptions, ListPage, MemoryPersistence, Persistence, PersistenceError,
    PersistenceResult, ReadOp, ReadResult, WriteOp, WriteResult,
};
use shadow_types::{EntityKey, PersistenceId, Timestamp};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

// ── Documents ────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Thermostat {
    pub indoor_temp_sp: Managed<f64>,
    pub fan: Managed<String>,
    pub firmware: String,
    pub zones: BTreeMap<String, Managed<f64>>,
}

mergeable_record!(Thermostat {
    indoor_temp_sp,
    fan,
    firmware,
    zones,
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Lamp {
    pub on: Managed<bool>,
}

mergeable_record!(Lamp { on });

pub fn ts(ms: u64) -> Timestamp {
    Timestamp::from_millis(ms)
}

pub fn key(id: &str) -> EntityKey {
    EntityKey::new(id, "thermostat")
}

pub fn set_point(value: f64, at: u64) -> Thermostat {
    Thermostat {
        indoor_temp_sp: Managed::new(value, ts(at)),
        ..Default::default()
    }
}

pub fn model(doc: Thermostat) -> Model {
    Model::new(doc)
}

pub fn doc(model: &Option<Model>) -> Thermostat {
    model
        .as_ref()
        .and_then(|m| m.downcast_ref::<Thermostat>())
        .cloned()
        .expect("thermostat document")
}

pub fn registry() -> ShapeRegistry {
    let mut registry = ShapeRegistry::new();
    registry
        .register(TypedShape::<Thermostat>::shared("thermostat"))
        .register(TypedShape::<Lamp>::shared("lamp"));
    registry
}

// ── Counting / fault-injecting persistence ───────────────────────

/// Wraps [`MemoryPersistence`], counting calls and injecting failures.
#[derive(Default)]
pub struct CountingPersistence {
    pub inner: MemoryPersistence,
    pub read_calls: AtomicUsize,
    pub write_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
    pub written_ops: AtomicUsize,
    read_failures: Mutex<HashMap<PersistenceId, PersistenceError>>,
    write_failures: Mutex<HashMap<PersistenceId, PersistenceError>>,
    cancel_after_read: Mutex<Option<CancellationToken>>,
}

impl CountingPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_read(&self, id: PersistenceId, error: PersistenceError) {
        self.read_failures.lock().unwrap().insert(id, error);
    }

    pub fn fail_write(&self, id: PersistenceId, error: PersistenceError) {
        self.write_failures.lock().unwrap().insert(id, error);
    }

    /// Cancels `token` once the next read batch returns.
    pub fn cancel_after_read(&self, token: CancellationToken) {
        *self.cancel_after_read.lock().unwrap() = Some(token);
    }

    pub fn reads(&self) -> usize {
        self.read_calls.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.write_calls.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    pub fn reset_counters(&self) {
        self.read_calls.store(0, Ordering::SeqCst);
        self.write_calls.store(0, Ordering::SeqCst);
        self.delete_calls.store(0, Ordering::SeqCst);
        self.written_ops.store(0, Ordering::SeqCst);
    }
}

#[async_trait]
impl Persistence for CountingPersistence {
    async fn read(&self, ctx: &Context, ops: Vec<ReadOp>) -> Vec<ReadResult> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        let failures = self.read_failures.lock().unwrap().clone();
        let mut results = self.inner.read(ctx, ops).await;
        for result in &mut results {
            if let Some(error) = failures.get(&result.id) {
                *result = ReadResult::failed(result.id.clone(), error.clone());
            }
        }
        if let Some(token) = self.cancel_after_read.lock().unwrap().take() {
            token.cancel();
        }
        results
    }

    async fn write(&self, ctx: &Context, ops: Vec<WriteOp>) -> Vec<WriteResult> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        self.written_ops.fetch_add(ops.len(), Ordering::SeqCst);
        let failures = self.write_failures.lock().unwrap().clone();
        let (failed, passed): (Vec<_>, Vec<_>) = ops
            .into_iter()
            .enumerate()
            .partition(|(_, op)| failures.contains_key(&op.id));
        let mut results: Vec<Option<WriteResult>> = vec![None; failed.len() + passed.len()];
        for (i, op) in &failed {
            results[*i] = Some(WriteResult::failed(op.id.clone(), failures[&op.id].clone()));
        }
        let (positions, ops): (Vec<usize>, Vec<WriteOp>) = passed.into_iter().unzip();
        for (i, result) in positions.into_iter().zip(self.inner.write(ctx, ops).await) {
            results[i] = Some(result);
        }
        results.into_iter().map(|r| r.unwrap()).collect()
    }

    async fn delete(&self, ctx: &Context, ops: Vec<DeleteOp>) -> Vec<WriteResult> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.delete(ctx, ops).await
    }

    async fn list(&self, ctx: &Context, options: ListOptions) -> PersistenceResult<ListPage> {
        self.inner.list(ctx, options).await
    }
}

/// A backend stuck in I/O: every call sleeps for `delay` before reaching
/// the in-memory store, and never looks at the context while it waits.
pub struct SlowPersistence {
    pub inner: MemoryPersistence,
    pub delay: Duration,
}

impl SlowPersistence {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: MemoryPersistence::new(),
            delay,
        }
    }
}

#[async_trait]
impl Persistence for SlowPersistence {
    async fn read(&self, _ctx: &Context, ops: Vec<ReadOp>) -> Vec<ReadResult> {
        tokio::time::sleep(self.delay).await;
        self.inner.read(&Context::new(), ops).await
    }

    async fn write(&self, _ctx: &Context, ops: Vec<WriteOp>) -> Vec<WriteResult> {
        tokio::time::sleep(self.delay).await;
        self.inner.write(&Context::new(), ops).await
    }

    async fn delete(&self, _ctx: &Context, ops: Vec<DeleteOp>) -> Vec<WriteResult> {
        tokio::time::sleep(self.delay).await;
        self.inner.delete(&Context::new(), ops).await
    }

    async fn list(&self, _ctx: &Context, options: ListOptions) -> PersistenceResult<ListPage> {
        tokio::time::sleep(self.delay).await;
        self.inner.list(&Context::new(), options).await
    }
}

// ── Manager ──────────────────────────────────────────────────────

/// Routes manager logs to the test writer. Set `RUST_LOG=debug` to see them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn manager_with(config: ManagerConfig) -> (ShadowManager, Arc<CountingPersistence>) {
    let persistence = Arc::new(CountingPersistence::new());
    let manager = ShadowManager::new(config, persistence.clone(), Arc::new(registry()));
    (manager, persistence)
}

pub fn manager(layout: StorageLayout) -> (ShadowManager, Arc<CountingPersistence>) {
    manager_with(ManagerConfig::with_layout(layout))
}
