//! Read: pass-through to persistence with layout-aware addressing.

use crate::pipeline::{bounded, checkpoint, fan_out};
use crate::{Context, ReadEntry, ReadResult, ShadowError, ShadowManager, StorageLayout};
use shadow_model::Shape;
use shadow_persistence::{PersistenceError, ReadOp, StoredModel};
use shadow_types::{EntityKey, ModelKind, PersistenceId, Version};
use std::collections::HashMap;
use tracing::{debug, warn};

/// One persistence read serving one or more entries.
struct ReadUnit {
    id: PersistenceId,
    version: Version,
    shape: Shape,
    /// Input positions and the part each one asked for.
    members: Vec<(usize, ModelKind)>,
    model: Option<StoredModel>,
    stored_version: Version,
    error: Option<ShadowError>,
}

impl ReadUnit {
    fn new(id: PersistenceId, version: Version, shape: Shape) -> Self {
        Self {
            id,
            version,
            shape,
            members: Vec::new(),
            model: None,
            stored_version: 0,
            error: None,
        }
    }
}

impl ShadowManager {
    /// Reads shadow documents.
    ///
    /// `kind` must name one part. In the combined layout, entries for the
    /// same entity and version share one read, and a failure of that read
    /// is reported on each of them.
    pub async fn read(&self, ctx: &Context, entries: Vec<ReadEntry>) -> Vec<ReadResult> {
        let mut results: Vec<ReadResult> = entries.iter().map(ReadResult::new).collect();
        if entries.is_empty() {
            return results;
        }
        if let Err(error) = checkpoint(ctx) {
            return results.into_iter().map(|r| r.failed(error.clone())).collect();
        }

        let layout = self.config.layout;
        let mut units: Vec<ReadUnit> = Vec::new();
        let mut shared: HashMap<(EntityKey, Version), usize> = HashMap::new();
        for (index, entry) in entries.iter().enumerate() {
            if entry.kind == ModelKind::Combined {
                results[index].error = Some(ShadowError::InvalidInput(format!(
                    "{}: read needs an explicit reported or desired kind",
                    entry.key
                )));
                continue;
            }
            let shape = match self.resolve(&entry.key) {
                Ok(shape) => shape,
                Err(error) => {
                    results[index].error = Some(error);
                    continue;
                }
            };
            let position = match layout {
                StorageLayout::Separate => {
                    units.push(ReadUnit::new(entry.key.with_kind(entry.kind), entry.version, shape));
                    units.len() - 1
                }
                StorageLayout::Combined => *shared
                    .entry((entry.key.clone(), entry.version))
                    .or_insert_with(|| {
                        units.push(ReadUnit::new(
                            entry.key.with_kind(ModelKind::Combined),
                            entry.version,
                            shape,
                        ));
                        units.len() - 1
                    }),
            };
            units[position].members.push((index, entry.kind));
        }

        let units = fan_out(
            units,
            self.config.max_batch_size,
            self.config.max_concurrency,
            |chunk| self.read_chunk(ctx, chunk),
        )
        .await;

        for unit in units {
            for &(index, kind) in &unit.members {
                let result = &mut results[index];
                if let Some(error) = &unit.error {
                    result.error = Some(error.clone());
                    continue;
                }
                // An absent part of a combined unit reads like a missing
                // document in the separate layout.
                match unit.model.as_ref().and_then(|m| m.part(kind)) {
                    Some(model) => {
                        result.model = Some(model.clone());
                        result.version = unit.stored_version;
                    }
                    None => {
                        result.error = Some(ShadowError::NotFound(PersistenceError::not_found(
                            format!("{} does not exist", result.key.with_kind(kind)),
                        )));
                    }
                }
            }
        }
        results
    }

    async fn read_chunk(&self, ctx: &Context, mut units: Vec<ReadUnit>) -> Vec<ReadUnit> {
        if let Err(error) = checkpoint(ctx) {
            for unit in &mut units {
                unit.error = Some(error.clone());
            }
            return units;
        }
        let ops: Vec<ReadOp> = units
            .iter()
            .map(|u| ReadOp::new(u.id.clone(), u.shape.clone()).at_version(u.version))
            .collect();
        let results = match bounded(ctx, ops.len(), self.persistence.read(ctx, ops)).await {
            Ok(results) => results,
            Err(error) => {
                for unit in &mut units {
                    unit.error = Some(error.clone());
                }
                return units;
            }
        };
        for (unit, result) in units.iter_mut().zip(results) {
            match result.error {
                Some(error) => {
                    if !error.is_not_found() {
                        warn!("Read of {} failed: {}", unit.id, error);
                    }
                    unit.error = Some(error.into());
                }
                None => {
                    debug!("Read {} at version {}", unit.id, result.version);
                    unit.model = result.model;
                    unit.stored_version = result.version;
                }
            }
        }
        units
    }
}
