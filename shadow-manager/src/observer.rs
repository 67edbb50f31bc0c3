//! Merge observers handed out per entity.

use serde_json::Value;
use shadow_merge::{ManagedChange, MergeObserver, Operation, PlainChange};
use shadow_types::{EntityKey, ModelKind};
use tracing::debug;

/// Builds the observer for one merge or acknowledgment walk.
pub trait ObserverFactory: Send + Sync {
    /// Returns an observer for the `kind` document of `key`.
    fn observer(&self, key: &EntityKey, kind: ModelKind) -> Box<dyn MergeObserver + Send>;
}

/// Default factory: logs changes through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserverFactory;

impl ObserverFactory for TracingObserverFactory {
    fn observer(&self, key: &EntityKey, kind: ModelKind) -> Box<dyn MergeObserver + Send> {
        Box::new(TracingObserver::new(key.clone(), kind))
    }
}

/// Logs every changed leaf and every acknowledgment at debug level.
#[derive(Debug, Clone)]
pub struct TracingObserver {
    key: EntityKey,
    kind: ModelKind,
}

impl TracingObserver {
    pub fn new(key: EntityKey, kind: ModelKind) -> Self {
        Self { key, kind }
    }
}

impl MergeObserver for TracingObserver {
    fn managed(&mut self, change: &ManagedChange<'_>) {
        if change.operation != Operation::NotChanged {
            debug!(
                "{} {} {}: {} {} -> {} ({} -> {})",
                self.key,
                self.kind,
                change.path,
                change.operation,
                change.old_value,
                change.new_value,
                change.old_timestamp,
                change.new_timestamp
            );
        }
    }

    fn plain(&mut self, change: &PlainChange<'_>) {
        if change.operation != Operation::NotChanged {
            debug!(
                "{} {} {}: {} {} -> {}",
                self.key, self.kind, change.path, change.operation, change.old_value, change.new_value
            );
        }
    }

    fn acknowledge(&mut self, path: &str, value: &Value) {
        debug!("{} {} {}: acknowledged {}", self.key, self.kind, path, value);
    }
}

/// Wraps a factory observer for one walk: applies the manager's
/// `ignore_plain` setting and records acknowledged paths.
pub(crate) struct ScopedObserver {
    inner: Box<dyn MergeObserver + Send>,
    ignore_plain: bool,
    acknowledged: Vec<String>,
}

impl ScopedObserver {
    pub(crate) fn new(inner: Box<dyn MergeObserver + Send>, ignore_plain: bool) -> Self {
        Self {
            inner,
            ignore_plain,
            acknowledged: Vec::new(),
        }
    }

    pub(crate) fn into_acknowledged(self) -> Vec<String> {
        self.acknowledged
    }
}

impl MergeObserver for ScopedObserver {
    fn managed(&mut self, change: &ManagedChange<'_>) {
        self.inner.managed(change);
    }

    fn plain(&mut self, change: &PlainChange<'_>) {
        self.inner.plain(change);
    }

    fn acknowledge(&mut self, path: &str, value: &Value) {
        self.acknowledged.push(path.to_string());
        self.inner.acknowledge(path, value);
    }

    fn ignore_plain(&self) -> bool {
        self.ignore_plain || self.inner.ignore_plain()
    }
}
