//! Report: merge an incoming reported state and acknowledge desired values.

use crate::group::{group_members, GroupedOperation, Member, Part};
use crate::observer::ScopedObserver;
use crate::pipeline::{checkpoint, fail_all, fan_out, read_groups, write_groups};
use crate::{Context, ReportEntry, ReportResult, ShadowEvent, ShadowManager, ShadowResult};
use shadow_types::ModelKind;
use tracing::{debug, info, warn};

impl ShadowManager {
    /// Merges reported states into storage.
    ///
    /// For each entity the stored reported document (or the zero document)
    /// is merged with every entry in input order. The stored desired
    /// document, if any, is then acknowledged against the merged result.
    /// Only changed parts are written.
    pub async fn report(&self, ctx: &Context, entries: Vec<ReportEntry>) -> Vec<ReportResult> {
        let mut results: Vec<ReportResult> = entries
            .iter()
            .map(|e| ReportResult::new(e.key.clone(), e.client_token.clone()))
            .collect();
        if entries.is_empty() {
            return results;
        }
        if let Err(error) = checkpoint(ctx) {
            return results.into_iter().map(|r| r.failed(error.clone())).collect();
        }

        let mut items = Vec::with_capacity(entries.len());
        for (index, entry) in entries.into_iter().enumerate() {
            let mode = entry.mode.unwrap_or(self.config.default_mode);
            match self.validate(&entry.key, entry.model) {
                Ok((shape, model)) => items.push((entry.key, shape, Member { index, model, mode })),
                Err(error) => {
                    warn!("Rejected report for {}: {}", entry.key, error);
                    results[index].error = Some(error);
                }
            }
        }

        let groups = fan_out(
            group_members(items),
            self.config.max_batch_size,
            self.config.max_concurrency,
            |chunk| self.report_chunk(ctx, chunk),
        )
        .await;

        let mut written = 0;
        for group in &groups {
            written += usize::from(group.reported.written || group.desired.written);
            for member in &group.members {
                fill_report(&mut results[member.index], group);
            }
        }
        info!("Report of {} entries wrote {} entities", results.len(), written);
        results
    }

    async fn report_chunk(&self, ctx: &Context, mut groups: Vec<GroupedOperation>) -> Vec<GroupedOperation> {
        let layout = self.config.layout;
        if let Err(error) = checkpoint(ctx) {
            fail_all(&mut groups, &error);
            return groups;
        }
        read_groups(ctx, self.persistence.as_ref(), &mut groups, layout, &Part::BOTH).await;

        for group in groups.iter_mut().filter(|g| !g.is_failed()) {
            if let Err(error) = self.compute_report(group) {
                warn!("Report merge failed for {}: {}", group.key, error);
                group.fail(error);
            }
        }

        if let Err(error) = checkpoint(ctx) {
            fail_all(&mut groups, &error);
            return groups;
        }
        write_groups(ctx, self.persistence.as_ref(), &mut groups, layout).await;

        for group in &groups {
            if group.reported.written {
                self.emit(ShadowEvent::ReportedUpdated {
                    key: group.key.clone(),
                    version: group.reported.version,
                });
            }
            if group.desired.written && !group.acknowledged.is_empty() {
                self.emit(ShadowEvent::DesiredAcknowledged {
                    key: group.key.clone(),
                    paths: group.acknowledged.clone(),
                });
            }
        }
        groups
    }

    fn compute_report(&self, group: &mut GroupedOperation) -> ShadowResult<()> {
        let mut observer = ScopedObserver::new(
            self.observers.observer(&group.key, ModelKind::Reported),
            self.config.ignore_plain,
        );
        let mut reported = group.model_or_zero(Part::Reported);
        let mut dirty = false;
        for member in &group.members {
            let merged = reported.merge(&member.model, member.mode, &mut observer)?;
            dirty |= merged.dirty;
            reported = merged.value;
        }

        let acked = match &group.desired.model {
            Some(desired) => {
                let mut observer = ScopedObserver::new(
                    self.observers.observer(&group.key, ModelKind::Desired),
                    self.config.ignore_plain,
                );
                let acked = desired.acknowledge(&reported, &mut observer)?;
                Some((acked, observer.into_acknowledged()))
            }
            None => None,
        };

        debug!(
            "Report for {}: reported dirty={}, acknowledged={}",
            group.key,
            dirty,
            acked.as_ref().map_or(0, |(_, paths)| paths.len())
        );
        group.reported.model = Some(reported);
        group.reported.dirty = dirty;
        if let Some((acked, paths)) = acked {
            group.desired.model = Some(acked.value);
            group.desired.dirty = acked.dirty;
            group.acknowledged = paths;
        }
        Ok(())
    }
}

fn fill_report(result: &mut ReportResult, group: &GroupedOperation) {
    result.error = group.first_error();
    result.reported_dirty = group.reported.dirty;
    result.desired_dirty = group.desired.dirty;
    result.reported_processed = group.processed(Part::Reported);
    result.desired_processed = group.processed(Part::Desired);
    if result.reported_processed {
        result.reported = group.reported.model.clone();
        result.reported_version = group.reported.version;
    }
    if result.desired_processed {
        result.desired = group.desired.model.clone();
        result.desired_version = group.desired.version;
    }
}
