//! The shadow manager.

use crate::observer::{ObserverFactory, TracingObserverFactory};
use crate::{Context, ListResults, ManagerConfig, ShadowError, ShadowEvent, ShadowResult, StorageLayout};
use shadow_model::{Model, Shape, TypeRegistry};
use shadow_persistence::{ListOptions, Persistence};
use shadow_types::EntityKey;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

/// Reconciles reported and desired shadow documents over a persistence
/// backend.
///
/// Every batch call returns one result per input entry, in input order.
/// Failures are captured per entry and never abort the rest of the batch.
pub struct ShadowManager {
    pub(crate) config: ManagerConfig,
    pub(crate) persistence: Arc<dyn Persistence>,
    registry: Arc<dyn TypeRegistry>,
    pub(crate) observers: Arc<dyn ObserverFactory>,
    events: broadcast::Sender<ShadowEvent>,
}

impl ShadowManager {
    /// Creates a manager that logs merge changes through `tracing`.
    pub fn new(
        config: ManagerConfig,
        persistence: Arc<dyn Persistence>,
        registry: Arc<dyn TypeRegistry>,
    ) -> Self {
        Self::with_observers(config, persistence, registry, Arc::new(TracingObserverFactory))
    }

    /// Creates a manager with a custom observer factory.
    pub fn with_observers(
        config: ManagerConfig,
        persistence: Arc<dyn Persistence>,
        registry: Arc<dyn TypeRegistry>,
        observers: Arc<dyn ObserverFactory>,
    ) -> Self {
        let config = config.normalized();
        let (events, _) = broadcast::channel(config.event_capacity);
        Self {
            config,
            persistence,
            registry,
            observers,
            events,
        }
    }

    /// Returns the configuration, with zero sizes clamped to one.
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn layout(&self) -> StorageLayout {
        self.config.layout
    }

    /// Subscribes to change notifications.
    ///
    /// Events are emitted only after persistence applied the change. Slow
    /// receivers lose the oldest events.
    pub fn subscribe(&self) -> broadcast::Receiver<ShadowEvent> {
        self.events.subscribe()
    }

    /// Lists stored documents, one page at a time.
    pub async fn list(&self, ctx: &Context, options: ListOptions) -> ShadowResult<ListResults> {
        let page = ctx.run(self.persistence.list(ctx, options)).await??;
        debug!("Listed {} documents", page.entries.len());
        Ok(ListResults {
            entries: page.entries,
            next_page_token: page.next_page_token,
        })
    }

    pub(crate) fn emit(&self, event: ShadowEvent) {
        // No receivers is not an error.
        let _ = self.events.send(event);
    }

    pub(crate) fn resolve(&self, key: &EntityKey) -> ShadowResult<Shape> {
        self.registry
            .resolve_by_id(&key.id, &key.name)
            .ok_or_else(|| ShadowError::TypeResolutionFailed(key.clone()))
    }

    /// Checks an incoming report or desire document.
    pub(crate) fn validate(&self, key: &EntityKey, model: Option<Model>) -> ShadowResult<(Shape, Model)> {
        let model = model.ok_or_else(|| {
            ShadowError::InvalidInput(format!("{key}: no model given, use delete to remove a shadow"))
        })?;
        let shape = self.resolve(key)?;
        if !shape.accepts(&model) {
            return Err(ShadowError::ShapeMismatch(format!(
                "{key}: {} is not a {} document",
                model.type_name(),
                shape.name()
            )));
        }
        Ok((shape, model))
    }
}
