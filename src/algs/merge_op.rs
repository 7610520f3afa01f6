//! Reversible merge operations.
//!
//! A [`MergeOperation`] bundles three effects: vertex tag edits (marker
//! resolution and attributes carried from donor vertices), deletion of the
//! donor line, and replacement of the kept line's geometry. Every field it touches is snapshotted before mutation, and
//! [`undo`](ReversibleOperation::undo) restores the snapshots in reverse order.
//! The host's undo ledger stacks these operations; the engine never keeps a
//! ledger of its own.

use crate::algs::correspondence::CorrespondenceSet;
use crate::algs::markers::plan_tag_edits;
use crate::conflate_error::ConflateError;
use crate::data::store::LineStore;
use crate::data::tags::Tags;
use crate::debug_invariants::DebugInvariants;
use crate::topology::orientation::Direction;
use crate::topology::point::{EntityId, LineId, VertexId};

/// Entities touched by an operation, for the host's change notifications.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AffectedEntities {
    pub modified: Vec<EntityId>,
    pub deleted: Vec<EntityId>,
    pub added: Vec<EntityId>,
}

impl AffectedEntities {
    pub fn is_empty(&self) -> bool {
        self.modified.is_empty() && self.deleted.is_empty() && self.added.is_empty()
    }

    /// Append `other`, skipping entities already listed.
    pub fn extend(&mut self, other: AffectedEntities) {
        fn merge(into: &mut Vec<EntityId>, from: Vec<EntityId>) {
            for id in from {
                if !into.contains(&id) {
                    into.push(id);
                }
            }
        }
        merge(&mut self.modified, other.modified);
        merge(&mut self.deleted, other.deleted);
        merge(&mut self.added, other.added);
    }
}

/// Contract between the engine and the host's undo ledger.
pub trait ReversibleOperation {
    /// Apply the operation. `Ok(false)` if it is already applied.
    fn execute(&mut self, store: &mut LineStore) -> Result<bool, ConflateError>;
    /// Revert the operation. A no-op unless it is currently applied.
    fn undo(&mut self, store: &mut LineStore) -> Result<(), ConflateError>;
    /// Human-readable summary.
    fn describe(&self) -> String;
    /// Entities touched by the last execution.
    fn affected_entities(&self) -> AffectedEntities;
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum OpState {
    Pending,
    Executed,
    Undone,
}

/// Merge of a donor line into a kept line.
#[derive(Clone, Debug)]
pub struct MergeOperation {
    kept: LineId,
    donor: LineId,
    direction: Direction,
    correspondence: CorrespondenceSet,
    before: Vec<VertexId>,
    after: Vec<VertexId>,
    /// Donor geometry `after` was planned from.
    donor_before: Vec<VertexId>,
    donor_was_deleted: bool,
    /// Vertex tags as they were before the last execution.
    tag_snapshots: Vec<(VertexId, Tags)>,
    stripped: Vec<(VertexId, String)>,
    state: OpState,
}

impl MergeOperation {
    /// Prepare a merge of `donor` into `kept` producing `merged` geometry.
    ///
    /// The current sequences of both lines are captured; execution fails as
    /// stale if either has changed by then.
    pub fn build(
        store: &LineStore,
        kept: LineId,
        donor: LineId,
        direction: Direction,
        correspondence: CorrespondenceSet,
        merged: Vec<VertexId>,
    ) -> Result<Self, ConflateError> {
        if kept == donor {
            return Err(ConflateError::SelfMerge(kept));
        }
        let donor_before = store.try_line(donor)?.vertices().to_vec();
        let before = store.try_line(kept)?.vertices().to_vec();
        Ok(Self {
            kept,
            donor,
            direction,
            correspondence,
            before,
            after: merged,
            donor_before,
            donor_was_deleted: false,
            tag_snapshots: Vec::new(),
            stripped: Vec::new(),
            state: OpState::Pending,
        })
    }

    #[inline]
    pub fn kept(&self) -> LineId {
        self.kept
    }

    #[inline]
    pub fn donor(&self) -> LineId {
        self.donor
    }

    #[inline]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn correspondence(&self) -> &CorrespondenceSet {
        &self.correspondence
    }

    /// Kept-line geometry before the merge.
    pub fn before(&self) -> &[VertexId] {
        &self.before
    }

    /// Kept-line geometry after the merge.
    pub fn after(&self) -> &[VertexId] {
        &self.after
    }

    /// `(vertex, key)` markers removed by the last execution.
    pub fn stripped_keys(&self) -> &[(VertexId, String)] {
        &self.stripped
    }

    pub fn is_executed(&self) -> bool {
        self.state == OpState::Executed
    }

    /// Everything that must hold before any mutation, so a failed execution
    /// leaves the store untouched. Either line changed or deleted since
    /// planning makes the operation stale.
    fn check_preconditions(&self, store: &LineStore) -> Result<(), ConflateError> {
        let kept = store.try_line(self.kept)?;
        let donor = store.try_line(self.donor)?;
        if kept.deleted
            || donor.deleted
            || kept.vertices() != self.before.as_slice()
            || donor.vertices() != self.donor_before.as_slice()
        {
            return Err(ConflateError::StaleOperation {
                kept: self.kept,
                donor: self.donor,
            });
        }
        for &v in &self.after {
            if store.try_vertex(v)?.deleted {
                return Err(ConflateError::DeletedVertexInMatch {
                    line: self.donor,
                    vertex: v,
                });
            }
        }
        Ok(())
    }
}

impl ReversibleOperation for MergeOperation {
    fn execute(&mut self, store: &mut LineStore) -> Result<bool, ConflateError> {
        if self.state == OpState::Executed {
            return Ok(false);
        }
        self.check_preconditions(store)?;

        let edits = plan_tag_edits(store, self.kept, self.donor, &self.correspondence);
        self.tag_snapshots.clear();
        self.stripped.clear();
        for edit in edits {
            let previous = store.replace_vertex_tags(edit.vertex, edit.tags)?;
            self.tag_snapshots.push((edit.vertex, previous));
            self.stripped
                .extend(edit.stripped.into_iter().map(|key| (edit.vertex, key)));
        }
        self.donor_was_deleted = store.set_line_deleted(self.donor, true)?;
        store.set_line_vertices(self.kept, self.after.clone())?;

        self.state = OpState::Executed;
        store.debug_assert_invariants();
        log::debug!(
            "merged line {} into {} ({:?}, {} matched vertices)",
            self.donor,
            self.kept,
            self.direction,
            self.correspondence.len()
        );
        Ok(true)
    }

    fn undo(&mut self, store: &mut LineStore) -> Result<(), ConflateError> {
        if self.state != OpState::Executed {
            return Ok(());
        }
        store.set_line_vertices(self.kept, self.before.clone())?;
        store.set_line_deleted(self.donor, self.donor_was_deleted)?;
        for (vertex, tags) in self.tag_snapshots.iter().rev() {
            store.replace_vertex_tags(*vertex, tags.clone())?;
        }
        self.state = OpState::Undone;
        store.debug_assert_invariants();
        Ok(())
    }

    fn describe(&self) -> String {
        format!("Merge line {} into line {}", self.donor, self.kept)
    }

    fn affected_entities(&self) -> AffectedEntities {
        let mut modified = vec![EntityId::Line(self.kept)];
        modified.extend(self.tag_snapshots.iter().map(|(v, _)| EntityId::Vertex(*v)));
        AffectedEntities {
            modified,
            deleted: vec![EntityId::Line(self.donor)],
            added: Vec::new(),
        }
    }
}

/// Several merges committed together, reverted as one.
#[derive(Clone, Debug, Default)]
pub struct ConflationBatch {
    operations: Vec<MergeOperation>,
}

impl ConflationBatch {
    pub fn new(operations: Vec<MergeOperation>) -> Self {
        Self { operations }
    }

    pub fn operations(&self) -> &[MergeOperation] {
        &self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn push(&mut self, op: MergeOperation) {
        self.operations.push(op);
    }
}

impl ReversibleOperation for ConflationBatch {
    /// Re-applies every operation in order. On failure, the operations applied
    /// by this call are reverted and the original error is returned; a failed
    /// revert is logged and the remaining reverts still run.
    fn execute(&mut self, store: &mut LineStore) -> Result<bool, ConflateError> {
        let mut applied = Vec::new();
        for i in 0..self.operations.len() {
            match self.operations[i].execute(store) {
                Ok(true) => applied.push(i),
                Ok(false) => {}
                Err(e) => {
                    for &j in applied.iter().rev() {
                        if let Err(undo_err) = self.operations[j].undo(store) {
                            log::error!(
                                "rollback of `{}` failed after `{e}`: {undo_err}",
                                self.operations[j].describe()
                            );
                        }
                    }
                    return Err(e);
                }
            }
        }
        Ok(!applied.is_empty())
    }

    fn undo(&mut self, store: &mut LineStore) -> Result<(), ConflateError> {
        for op in self.operations.iter_mut().rev() {
            op.undo(store)?;
        }
        Ok(())
    }

    fn describe(&self) -> String {
        match self.operations.as_slice() {
            [only] => only.describe(),
            ops => format!("Merge lines ({} merges)", ops.len()),
        }
    }

    fn affected_entities(&self) -> AffectedEntities {
        let mut all = AffectedEntities::default();
        for op in &self.operations {
            all.extend(op.affected_entities());
        }
        all
    }
}
