//! Conflation sweep across a whole collection.
//!
//! Lines are visited in insertion order. Each live line is the *kept* line
//! for its neighbourhood: the spatial index yields the other lines whose
//! envelope intersects its own, padded by the merge tolerance, and each
//! candidate *donor* goes through
//!
//! ```text
//! Candidate → Rejected
//!           → Accepted(direction) → Spliced → Committed
//! ```
//!
//! A committed donor is deleted, so it is never visited again, and the
//! neighbourhood of the extended kept line is scanned afresh. A line only
//! changes while it is the kept line, so once the sweep finishes no pair of
//! live lines is left that a second sweep would merge. Planning (finder, validator,
//! splicer) only reads the store and runs in parallel across candidates with
//! the `rayon` feature; commits are sequential, one write lock each.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::algs::finder::find_correspondences;
use crate::algs::merge_op::{ConflationBatch, MergeOperation, ReversibleOperation};
use crate::algs::splicer::splice;
use crate::algs::validator::{RejectReason, Validation, validate};
use crate::config::ConflateConfig;
use crate::conflate_error::ConflateError;
use crate::data::shared::SharedStore;
use crate::data::store::LineStore;
use crate::geometry::BBox;
use crate::geometry::coord::EARTH_RADIUS_M;
use crate::spatial::SpatialIndex;
use crate::topology::point::LineId;

/// Commits retried after a concurrent edit invalidated the plan.
const MAX_STALE_RETRIES: usize = 3;

/// Floor for `cos(lat)` when widening the search box near the poles.
const MIN_LON_SCALE: f64 = 0.01;

/// Cooperative cancellation flag, checked before every commit.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Read-only decision for one candidate pair.
#[derive(Clone, Debug)]
pub enum Plan {
    Merge(MergeOperation),
    Rejected(RejectReason),
}

/// A pair aborted by an internal-consistency error.
#[derive(Clone, Debug, PartialEq)]
pub struct PairError {
    pub kept: LineId,
    pub donor: LineId,
    pub error: ConflateError,
}

/// What a sweep did.
#[derive(Clone, Debug, Default)]
pub struct SweepReport {
    /// Committed merges, in commit order; undo as one unit via the batch.
    pub batch: ConflationBatch,
    pub rejected: BTreeMap<RejectReason, usize>,
    pub errors: Vec<PairError>,
    pub cancelled: bool,
}

impl SweepReport {
    pub fn merged(&self) -> usize {
        self.batch.len()
    }

    pub fn rejected_total(&self) -> usize {
        self.rejected.values().sum()
    }

    fn reject(&mut self, reason: RejectReason) {
        *self.rejected.entry(reason).or_default() += 1;
    }
}

/// The two ways a sweep can reach the store.
trait SweepTarget {
    fn with_store<R>(&self, f: impl FnOnce(&LineStore) -> R) -> R;
    fn commit(&mut self, op: &mut MergeOperation) -> Result<bool, ConflateError>;
}

struct Exclusive<'a>(&'a mut LineStore);

impl SweepTarget for Exclusive<'_> {
    fn with_store<R>(&self, f: impl FnOnce(&LineStore) -> R) -> R {
        f(&*self.0)
    }

    fn commit(&mut self, op: &mut MergeOperation) -> Result<bool, ConflateError> {
        op.execute(self.0)
    }
}

struct Shared<'a>(&'a SharedStore);

impl SweepTarget for Shared<'_> {
    fn with_store<R>(&self, f: impl FnOnce(&LineStore) -> R) -> R {
        f(&self.0.read())
    }

    fn commit(&mut self, op: &mut MergeOperation) -> Result<bool, ConflateError> {
        self.0.commit(op)
    }
}

/// Duplicate-line conflation over a line collection.
#[derive(Clone, Debug, Default)]
pub struct ConflationSweep {
    config: ConflateConfig,
    cancel: CancelToken,
}

impl ConflationSweep {
    /// Fails with [`ConflateError::InvalidConfig`] unless `config` validates.
    pub fn new(config: ConflateConfig) -> Result<Self, ConflateError> {
        config.validate()?;
        Ok(Self {
            config,
            cancel: CancelToken::new(),
        })
    }

    /// Use `token` to cancel a running sweep from another thread.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn config(&self) -> &ConflateConfig {
        &self.config
    }

    /// Decide whether `donor` merges into `kept`, without touching the store.
    pub fn plan_pair(&self, store: &LineStore, kept: LineId, donor: LineId) -> Result<Plan, ConflateError> {
        if kept == donor {
            return Err(ConflateError::SelfMerge(kept));
        }
        for line in [kept, donor] {
            if store.try_line(line)?.deleted {
                return Err(ConflateError::DeletedLine(line));
            }
        }
        let raw = find_correspondences(store, kept, donor, self.config.max_vertex_merge_distance)?;
        let (set, direction) = match validate(store, kept, donor, &raw, &self.config)? {
            Validation::Accepted { set, direction } => (set, direction),
            Validation::Rejected(reason) => return Ok(Plan::Rejected(reason)),
        };
        let Some(merged) = splice(store, kept, donor, &set, direction)? else {
            return Ok(Plan::Rejected(RejectReason::EmptySplice));
        };
        let op = MergeOperation::build(store, kept, donor, direction, set, merged)?;
        Ok(Plan::Merge(op))
    }

    /// Attempt a single pair and commit it on success. Returns the committed
    /// operation, or the reason the pair was rejected.
    pub fn try_merge(
        &self,
        store: &mut LineStore,
        kept: LineId,
        donor: LineId,
    ) -> Result<Result<MergeOperation, RejectReason>, ConflateError> {
        match self.plan_pair(store, kept, donor)? {
            Plan::Merge(mut op) => {
                op.execute(store)?;
                Ok(Ok(op))
            }
            Plan::Rejected(reason) => Ok(Err(reason)),
        }
    }

    /// Merge every duplicate of `line` in its neighbourhood into it.
    pub fn merge_with_neighbors(&self, store: &mut LineStore, line: LineId) -> SweepReport {
        self.sweep(&mut Exclusive(store), vec![line])
    }

    /// Sweep the whole collection with exclusive access.
    pub fn run(&self, store: &mut LineStore) -> SweepReport {
        let order = store.line_ids().to_vec();
        self.sweep(&mut Exclusive(store), order)
    }

    /// Sweep a shared collection, holding the write lock for one commit at a
    /// time so interactive edits can interleave.
    pub fn run_shared(&self, shared: &SharedStore) -> SweepReport {
        let order = shared.read().line_ids().to_vec();
        self.sweep(&mut Shared(shared), order)
    }

    fn sweep<T: SweepTarget>(&self, target: &mut T, order: Vec<LineId>) -> SweepReport {
        let mut report = SweepReport::default();
        for kept in order {
            if self.cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            self.sweep_line(target, kept, &mut report);
        }
        if report.cancelled {
            log::warn!(
                "conflation sweep cancelled after {} merges; store left consistent",
                report.merged()
            );
        }
        log::info!(
            "conflation sweep: {} merged, {} rejected, {} errors",
            report.merged(),
            report.rejected_total(),
            report.errors.len()
        );
        report
    }

    fn sweep_line<T: SweepTarget>(&self, target: &mut T, kept: LineId, report: &mut SweepReport) {
        let tolerance = self.config.max_vertex_merge_distance;
        let mut remaining = target.with_store(|store| candidates(store, kept, tolerance));
        let mut stale_retries = 0;
        while !remaining.is_empty() {
            let plans = target.with_store(|store| {
                remaining.retain(|&d| store.line(d).is_some_and(|l| !l.deleted));
                if store.line(kept).is_none_or(|l| l.deleted || l.is_empty()) {
                    remaining.clear();
                }
                self.plan_batch(store, kept, &remaining)
            });

            let mut consumed = plans.len();
            let mut extended = false;
            for (i, plan) in plans.into_iter().enumerate() {
                let donor = remaining[i];
                match plan {
                    Ok(Plan::Rejected(reason)) => {
                        log::debug!("line {donor} is not a duplicate of {kept}: {reason:?}");
                        report.reject(reason);
                    }
                    Err(error) => {
                        log::error!("skipping pair ({kept}, {donor}): {error}");
                        report.errors.push(PairError { kept, donor, error });
                    }
                    Ok(Plan::Merge(mut op)) => {
                        if self.cancel.is_cancelled() {
                            report.cancelled = true;
                            return;
                        }
                        match target.commit(&mut op) {
                            Ok(true) => {
                                report.batch.push(op);
                                extended = true;
                            }
                            Ok(false) => consumed = i + 1,
                            Err(ConflateError::StaleOperation { .. })
                                if stale_retries < MAX_STALE_RETRIES =>
                            {
                                log::warn!("re-planning ({kept}, {donor}) after a concurrent edit");
                                stale_retries += 1;
                                consumed = i;
                            }
                            Err(error) => {
                                log::error!("skipping pair ({kept}, {donor}): {error}");
                                report.errors.push(PairError { kept, donor, error });
                                consumed = i + 1;
                            }
                        }
                        // Later plans were made against the old kept line.
                        break;
                    }
                }
            }
            if extended {
                // The kept line grew: rescan its neighbourhood so pairs
                // rejected against the old geometry are judged again.
                remaining = target.with_store(|store| candidates(store, kept, tolerance));
            } else {
                remaining.drain(..consumed);
            }
        }
    }

    #[cfg(feature = "rayon")]
    fn plan_batch(&self, store: &LineStore, kept: LineId, donors: &[LineId]) -> Vec<Result<Plan, ConflateError>> {
        use rayon::prelude::*;
        donors
            .par_iter()
            .map(|&donor| self.plan_pair(store, kept, donor))
            .collect()
    }

    /// Plans donors in order up to and including the first merge.
    #[cfg(not(feature = "rayon"))]
    fn plan_batch(&self, store: &LineStore, kept: LineId, donors: &[LineId]) -> Vec<Result<Plan, ConflateError>> {
        let mut plans = Vec::new();
        for &donor in donors {
            let plan = self.plan_pair(store, kept, donor);
            let merge = matches!(plan, Ok(Plan::Merge(_)));
            plans.push(plan);
            if merge {
                break;
            }
        }
        plans
    }
}

/// Live lines whose envelope meets `kept`'s widened by `tolerance_m`, in
/// insertion order.
fn candidates(store: &LineStore, kept: LineId, tolerance_m: f64) -> Vec<LineId> {
    let Some(envelope) = store.line(kept).and_then(|l| l.envelope()) else {
        return Vec::new();
    };
    let search = envelope.expanded(search_margin_degrees(envelope, tolerance_m));
    let mut found: Vec<LineId> = store
        .search_lines(&search)
        .into_iter()
        .filter(|&id| id != kept && store.line(id).is_some_and(|l| !l.deleted))
        .collect();
    found.sort_by_key(|&id| store.insertion_rank(id));
    found
}

/// Degrees covering `tolerance_m` in either axis anywhere inside `envelope`.
/// Longitude degrees shrink with `cos(lat)`, so the widest case is taken.
fn search_margin_degrees(envelope: &BBox, tolerance_m: f64) -> f64 {
    let meters_per_degree = EARTH_RADIUS_M.to_radians();
    let max_abs_lat = envelope.min_lat.abs().max(envelope.max_lat.abs()).min(90.0);
    let lon_scale = max_abs_lat.to_radians().cos().max(MIN_LON_SCALE);
    tolerance_m / meters_per_degree / lon_scale
}
