//! Per-entity batching unit shared by report and desire.
//!
//! Entries for the same [`EntityKey`] collapse into one
//! [`GroupedOperation`]. It carries the reported and desired write
//! candidates together so the combined layout can write them as one unit.

use crate::{ShadowError, StorageLayout};
use shadow_merge::MergeMode;
use shadow_model::{Model, Shape};
use shadow_persistence::{ReadOp, ReadResult, StoredModel, WriteOp, WriteResult};
use shadow_types::{EntityKey, ModelKind, Version};
use std::collections::HashMap;

/// One incoming entry, remembered by its input position.
#[derive(Debug, Clone)]
pub(crate) struct Member {
    pub index: usize,
    pub model: Model,
    pub mode: MergeMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Part {
    Reported,
    Desired,
}

impl Part {
    pub(crate) const BOTH: [Part; 2] = [Part::Reported, Part::Desired];

    pub(crate) fn kind(self) -> ModelKind {
        match self {
            Part::Reported => ModelKind::Reported,
            Part::Desired => ModelKind::Desired,
        }
    }
}

/// State of one part across read, compute and write.
#[derive(Debug, Clone, Default)]
pub(crate) struct Candidate {
    /// Stored document after the read, computed document after compute.
    pub model: Option<Model>,
    /// Read version, then written version.
    pub version: Version,
    /// Needs a write.
    pub dirty: bool,
    /// A write of this part was applied.
    pub written: bool,
    pub error: Option<ShadowError>,
}

#[derive(Debug, Clone)]
pub(crate) struct GroupedOperation {
    pub key: EntityKey,
    pub shape: Shape,
    pub members: Vec<Member>,
    pub reported: Candidate,
    pub desired: Candidate,
    /// Desired paths cleared by acknowledgment.
    pub acknowledged: Vec<String>,
    /// Failure affecting the whole entity.
    pub error: Option<ShadowError>,
}

impl GroupedOperation {
    pub(crate) fn new(key: EntityKey, shape: Shape) -> Self {
        Self {
            key,
            shape,
            members: Vec::new(),
            reported: Candidate::default(),
            desired: Candidate::default(),
            acknowledged: Vec::new(),
            error: None,
        }
    }

    pub(crate) fn part(&self, part: Part) -> &Candidate {
        match part {
            Part::Reported => &self.reported,
            Part::Desired => &self.desired,
        }
    }

    fn part_mut(&mut self, part: Part) -> &mut Candidate {
        match part {
            Part::Reported => &mut self.reported,
            Part::Desired => &mut self.desired,
        }
    }

    /// Records an entity-level failure. The first one sticks.
    pub(crate) fn fail(&mut self, error: ShadowError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    pub(crate) fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    /// Returns the part's document, or the shape's zero document.
    pub(crate) fn model_or_zero(&self, part: Part) -> Model {
        self.part(part)
            .model
            .clone()
            .unwrap_or_else(|| self.shape.zero())
    }

    /// True if the part was stored or needed no write.
    pub(crate) fn processed(&self, part: Part) -> bool {
        self.error.is_none() && self.part(part).error.is_none()
    }

    /// The entity error, else the first part error.
    pub(crate) fn first_error(&self) -> Option<ShadowError> {
        self.error
            .as_ref()
            .or(self.reported.error.as_ref())
            .or(self.desired.error.as_ref())
            .cloned()
    }

    pub(crate) fn read_ops(&self, layout: StorageLayout, parts: &[Part]) -> Vec<ReadOp> {
        match layout {
            StorageLayout::Separate => parts
                .iter()
                .map(|part| ReadOp::new(self.key.with_kind(part.kind()), self.shape.clone()))
                .collect(),
            StorageLayout::Combined => vec![ReadOp::new(
                self.key.with_kind(ModelKind::Combined),
                self.shape.clone(),
            )],
        }
    }

    /// Applies one read result. Not-found leaves the part empty.
    pub(crate) fn apply_read(&mut self, result: ReadResult) {
        if let Some(error) = result.error {
            if !error.is_not_found() {
                self.fail(error.into());
            }
            return;
        }
        let Some(stored) = result.model else { return };
        match result.id.kind {
            ModelKind::Combined => {
                for part in Part::BOTH {
                    let model = stored.part(part.kind()).cloned();
                    let candidate = self.part_mut(part);
                    candidate.model = model;
                    candidate.version = result.version;
                }
            }
            kind => {
                let part = if kind == ModelKind::Reported {
                    Part::Reported
                } else {
                    Part::Desired
                };
                let model = stored.part(kind).cloned();
                let candidate = self.part_mut(part);
                candidate.model = model;
                candidate.version = result.version;
            }
        }
    }

    /// Write ops for every dirty part. The combined layout writes both
    /// parts together whenever either is dirty; a part that was never
    /// stored or computed stays absent.
    pub(crate) fn write_ops(&self, layout: StorageLayout) -> Vec<WriteOp> {
        if self.is_failed() {
            return Vec::new();
        }
        match layout {
            StorageLayout::Separate => Part::BOTH
                .into_iter()
                .filter(|part| self.part(*part).dirty)
                .map(|part| {
                    WriteOp::new(
                        self.key.with_kind(part.kind()),
                        StoredModel::Single(self.model_or_zero(part)),
                        self.part(part).version,
                    )
                })
                .collect(),
            StorageLayout::Combined => {
                if !(self.reported.dirty || self.desired.dirty) {
                    return Vec::new();
                }
                vec![WriteOp::new(
                    self.key.with_kind(ModelKind::Combined),
                    StoredModel::Combined {
                        reported: self.reported.model.clone(),
                        desired: self.desired.model.clone(),
                    },
                    self.reported.version,
                )]
            }
        }
    }

    /// Applies one write result to the part(s) it covered.
    pub(crate) fn apply_write(&mut self, result: WriteResult) {
        let parts: &[Part] = match result.id.kind {
            ModelKind::Combined => &Part::BOTH,
            ModelKind::Reported => &[Part::Reported],
            ModelKind::Desired => &[Part::Desired],
        };
        for &part in parts {
            let candidate = self.part_mut(part);
            match &result.error {
                Some(error) => candidate.error = Some(error.clone().into()),
                None => {
                    candidate.version = result.version;
                    candidate.written = candidate.dirty;
                }
            }
        }
    }
}

/// Groups members by entity key in first-seen order.
pub(crate) fn group_members(items: Vec<(EntityKey, Shape, Member)>) -> Vec<GroupedOperation> {
    let mut groups: Vec<GroupedOperation> = Vec::new();
    let mut positions: HashMap<EntityKey, usize> = HashMap::new();
    for (key, shape, member) in items {
        let position = *positions.entry(key.clone()).or_insert_with(|| {
            groups.push(GroupedOperation::new(key, shape));
            groups.len() - 1
        });
        groups[position].members.push(member);
    }
    groups
}
