//! Desire: merge a requested target state into the stored desired document.

use crate::group::{group_members, GroupedOperation, Member, Part};
use crate::observer::ScopedObserver;
use crate::pipeline::{checkpoint, fail_all, fan_out, read_groups, write_groups};
use crate::{Context, DesireEntry, DesireResult, ShadowEvent, ShadowManager, ShadowResult};
use shadow_merge::MergeMode;
use shadow_types::ModelKind;
use tracing::{debug, info, warn};

impl ShadowManager {
    /// Merges requested states into the stored desired documents.
    ///
    /// Desired documents are always merged upsert-only. In the combined
    /// layout the stored reported part is read too and written back
    /// unchanged alongside the new desired part.
    pub async fn desire(&self, ctx: &Context, entries: Vec<DesireEntry>) -> Vec<DesireResult> {
        let mut results: Vec<DesireResult> = entries
            .iter()
            .map(|e| DesireResult::new(e.key.clone(), e.client_token.clone()))
            .collect();
        if entries.is_empty() {
            return results;
        }
        if let Err(error) = checkpoint(ctx) {
            return results.into_iter().map(|r| r.failed(error.clone())).collect();
        }

        let mut items = Vec::with_capacity(entries.len());
        for (index, entry) in entries.into_iter().enumerate() {
            match self.validate(&entry.key, entry.model) {
                Ok((shape, model)) => items.push((
                    entry.key,
                    shape,
                    Member {
                        index,
                        model,
                        mode: MergeMode::ServerIsMaster,
                    },
                )),
                Err(error) => {
                    warn!("Rejected desire for {}: {}", entry.key, error);
                    results[index].error = Some(error);
                }
            }
        }

        let groups = fan_out(
            group_members(items),
            self.config.max_batch_size,
            self.config.max_concurrency,
            |chunk| self.desire_chunk(ctx, chunk),
        )
        .await;

        let mut written = 0;
        for group in &groups {
            written += usize::from(group.desired.written);
            for member in &group.members {
                let result = &mut results[member.index];
                result.error = group.first_error();
                result.dirty = group.desired.dirty;
                result.processed = group.processed(Part::Desired);
                if result.processed {
                    result.desired = group.desired.model.clone();
                    result.version = group.desired.version;
                }
            }
        }
        info!("Desire of {} entries wrote {} entities", results.len(), written);
        results
    }

    async fn desire_chunk(&self, ctx: &Context, mut groups: Vec<GroupedOperation>) -> Vec<GroupedOperation> {
        let layout = self.config.layout;
        if let Err(error) = checkpoint(ctx) {
            fail_all(&mut groups, &error);
            return groups;
        }
        read_groups(ctx, self.persistence.as_ref(), &mut groups, layout, &[Part::Desired]).await;

        for group in groups.iter_mut().filter(|g| !g.is_failed()) {
            if let Err(error) = self.compute_desire(group) {
                warn!("Desire merge failed for {}: {}", group.key, error);
                group.fail(error);
            }
        }

        if let Err(error) = checkpoint(ctx) {
            fail_all(&mut groups, &error);
            return groups;
        }
        write_groups(ctx, self.persistence.as_ref(), &mut groups, layout).await;

        for group in groups.iter().filter(|g| g.desired.written) {
            self.emit(ShadowEvent::DesiredUpdated {
                key: group.key.clone(),
                version: group.desired.version,
            });
        }
        groups
    }

    fn compute_desire(&self, group: &mut GroupedOperation) -> ShadowResult<()> {
        let mut observer = ScopedObserver::new(
            self.observers.observer(&group.key, ModelKind::Desired),
            self.config.ignore_plain,
        );
        let mut desired = group.model_or_zero(Part::Desired);
        let mut dirty = false;
        for member in &group.members {
            let merged = desired.merge(&member.model, member.mode, &mut observer)?;
            dirty |= merged.dirty;
            desired = merged.value;
        }
        debug!("Desire for {}: dirty={}", group.key, dirty);
        group.desired.model = Some(desired);
        group.desired.dirty = dirty;
        Ok(())
    }
}
