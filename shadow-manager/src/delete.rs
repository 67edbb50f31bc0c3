//! Delete: remove one or both parts of a shadow.

use crate::pipeline::{bounded, checkpoint, fan_out};
use crate::{
    Context, DeleteEntry, DeleteResult, ShadowError, ShadowEvent, ShadowManager, StorageLayout,
};
use shadow_model::Shape;
use shadow_persistence::{DeleteOp, PersistenceError, ReadOp, StoredModel, WriteOp, WriteResult};
use shadow_types::{EntityKey, ModelKind, PersistenceId, Version};
use tracing::{debug, warn};

/// How one delete entry reaches storage.
enum Plan {
    /// Delete these documents.
    Remove(Vec<PersistenceId>),
    /// Rewrite a combined unit without one of its parts.
    Reset { part: ModelKind, shape: Shape },
}

struct DeleteUnit {
    index: usize,
    key: EntityKey,
    kind: ModelKind,
    version: Version,
    plan: Plan,
    /// Version deleted or written.
    outcome: Version,
    error: Option<ShadowError>,
}

impl DeleteUnit {
    fn combined_id(&self) -> PersistenceId {
        self.key.with_kind(ModelKind::Combined)
    }
}

impl ShadowManager {
    /// Deletes shadow documents.
    ///
    /// `ModelKind::Combined` deletes both parts together. In the combined
    /// layout, deleting a single part rewrites the stored unit without that
    /// part, conditional on the stored version; deleting the only part
    /// present removes the unit. A part that is absent is not found, as in
    /// the separate layout.
    pub async fn delete(&self, ctx: &Context, entries: Vec<DeleteEntry>) -> Vec<DeleteResult> {
        let mut results: Vec<DeleteResult> = entries.iter().map(DeleteResult::new).collect();
        if entries.is_empty() {
            return results;
        }
        if let Err(error) = checkpoint(ctx) {
            return results.into_iter().map(|r| r.failed(error.clone())).collect();
        }

        let mut units = Vec::with_capacity(entries.len());
        for (index, entry) in entries.into_iter().enumerate() {
            match self.plan_delete(&entry) {
                Ok(plan) => units.push(DeleteUnit {
                    index,
                    key: entry.key,
                    kind: entry.kind,
                    version: entry.version,
                    plan,
                    outcome: 0,
                    error: None,
                }),
                Err(error) => {
                    warn!("Rejected delete for {}: {}", entry.key, error);
                    results[index].error = Some(error);
                }
            }
        }

        let units = fan_out(
            units,
            self.config.max_batch_size,
            self.config.max_concurrency,
            |chunk| self.delete_chunk(ctx, chunk),
        )
        .await;

        for unit in units {
            let result = &mut results[unit.index];
            result.version = unit.outcome;
            result.error = unit.error;
        }
        results
    }

    fn plan_delete(&self, entry: &DeleteEntry) -> Result<Plan, ShadowError> {
        match (self.config.layout, entry.kind) {
            (StorageLayout::Separate, ModelKind::Combined) => {
                if entry.version != 0 {
                    return Err(ShadowError::InvalidInput(format!(
                        "{}: a versioned delete needs an explicit kind in the separate layout",
                        entry.key
                    )));
                }
                Ok(Plan::Remove(vec![
                    entry.key.with_kind(ModelKind::Reported),
                    entry.key.with_kind(ModelKind::Desired),
                ]))
            }
            (StorageLayout::Separate, kind) | (StorageLayout::Combined, kind @ ModelKind::Combined) => {
                Ok(Plan::Remove(vec![entry.key.with_kind(kind)]))
            }
            (StorageLayout::Combined, part) => Ok(Plan::Reset {
                part,
                shape: self.resolve(&entry.key)?,
            }),
        }
    }

    async fn delete_chunk(&self, ctx: &Context, mut units: Vec<DeleteUnit>) -> Vec<DeleteUnit> {
        if let Err(error) = checkpoint(ctx) {
            fail_units(&mut units, &error);
            return units;
        }

        // Partial deletes read the combined unit first.
        let resets: Vec<usize> = units
            .iter()
            .enumerate()
            .filter(|(_, u)| matches!(u.plan, Plan::Reset { .. }))
            .map(|(i, _)| i)
            .collect();
        let mut rewrites: Vec<(usize, WriteOp)> = Vec::new();
        if !resets.is_empty() {
            let ops: Vec<ReadOp> = resets
                .iter()
                .filter_map(|&i| match &units[i].plan {
                    Plan::Reset { shape, .. } => {
                        Some(ReadOp::new(units[i].combined_id(), shape.clone()).at_version(units[i].version))
                    }
                    Plan::Remove(_) => None,
                })
                .collect();
            match bounded(ctx, ops.len(), self.persistence.read(ctx, ops)).await {
                Ok(reads) => {
                    for (&i, read) in resets.iter().zip(reads) {
                        let unit = &mut units[i];
                        let part = match &unit.plan {
                            Plan::Reset { part, .. } => *part,
                            Plan::Remove(_) => continue,
                        };
                        match (read.error, read.model) {
                            (Some(error), _) => unit.error = Some(error.into()),
                            (None, Some(StoredModel::Combined { reported, desired })) => {
                                let (target, other) = if part == ModelKind::Reported {
                                    (&reported, &desired)
                                } else {
                                    (&desired, &reported)
                                };
                                if target.is_none() {
                                    unit.error = Some(ShadowError::NotFound(PersistenceError::not_found(
                                        format!("{} does not exist", unit.key.with_kind(part)),
                                    )));
                                } else if other.is_none() {
                                    // Nothing would be left: remove the unit at the version read.
                                    unit.plan = Plan::Remove(vec![unit.combined_id()]);
                                    unit.version = read.version;
                                } else {
                                    let model = if part == ModelKind::Reported {
                                        StoredModel::Combined {
                                            reported: None,
                                            desired,
                                        }
                                    } else {
                                        StoredModel::Combined {
                                            reported,
                                            desired: None,
                                        }
                                    };
                                    rewrites.push((i, WriteOp::new(unit.combined_id(), model, read.version)));
                                }
                            }
                            _ => {
                                unit.error = Some(ShadowError::Storage(PersistenceError::internal(
                                    format!("{} did not return a combined document", unit.combined_id()),
                                )));
                            }
                        }
                    }
                }
                Err(error) => {
                    for &i in &resets {
                        units[i].error = Some(error.clone());
                    }
                }
            }
        }

        if let Err(error) = checkpoint(ctx) {
            fail_units(&mut units, &error);
            return units;
        }

        let (owners, ops): (Vec<usize>, Vec<DeleteOp>) = units
            .iter()
            .enumerate()
            .filter(|(_, u)| u.error.is_none())
            .flat_map(|(i, u)| {
                let ids = match &u.plan {
                    Plan::Remove(ids) => ids.clone(),
                    Plan::Reset { .. } => Vec::new(),
                };
                ids.into_iter().map(move |id| (i, DeleteOp::new(id, u.version)))
            })
            .unzip();
        if !ops.is_empty() {
            match bounded(ctx, ops.len(), self.persistence.delete(ctx, ops)).await {
                Err(error) => {
                    for &i in &owners {
                        units[i].error = Some(error.clone());
                    }
                }
                Ok(deleted) => {
                    let mut per_unit: Vec<Vec<WriteResult>> = vec![Vec::new(); units.len()];
                    for (owner, result) in owners.into_iter().zip(deleted) {
                        per_unit[owner].push(result);
                    }
                    for (unit, outcomes) in units.iter_mut().zip(per_unit) {
                        if !outcomes.is_empty() {
                            settle_removal(unit, outcomes);
                        }
                    }
                }
            }
        }

        if !rewrites.is_empty() {
            let (owners, ops): (Vec<usize>, Vec<WriteOp>) = rewrites.into_iter().unzip();
            match bounded(ctx, ops.len(), self.persistence.write(ctx, ops)).await {
                Err(error) => {
                    for &i in &owners {
                        units[i].error = Some(error.clone());
                    }
                }
                Ok(written) => {
                    for (owner, result) in owners.into_iter().zip(written) {
                        let unit = &mut units[owner];
                        match result.error {
                            Some(error) => unit.error = Some(error.into()),
                            None => unit.outcome = result.version,
                        }
                    }
                }
            }
        }

        for unit in units.iter().filter(|u| u.error.is_none()) {
            debug!("Deleted {} {} at version {}", unit.key, unit.kind, unit.outcome);
            self.emit(ShadowEvent::Deleted {
                key: unit.key.clone(),
                kind: unit.kind,
            });
        }
        units
    }
}

fn fail_units(units: &mut [DeleteUnit], error: &ShadowError) {
    for unit in units {
        if unit.error.is_none() {
            unit.error = Some(error.clone());
        }
    }
}

/// A removal succeeds if any document was deleted and nothing failed other
/// than a missing part.
fn settle_removal(unit: &mut DeleteUnit, outcomes: Vec<WriteResult>) {
    let mut deleted = false;
    let mut missing = None;
    for outcome in outcomes {
        match outcome.error {
            None => {
                deleted = true;
                unit.outcome = unit.outcome.max(outcome.version);
            }
            Some(error) if error.is_not_found() => {
                missing.get_or_insert(error);
            }
            Some(error) => {
                warn!("Delete of {} failed: {}", outcome.id, error);
                unit.error.get_or_insert(error.into());
            }
        }
    }
    if unit.error.is_none() && !deleted {
        if let Some(error) = missing {
            unit.error = Some(error.into());
        }
    }
}
