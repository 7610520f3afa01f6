#![cfg_attr(docsrs, feature(doc_cfg))]
//! # line-sieve
//!
//! line-sieve finds linear features (roads, building outlines) that duplicate
//! each other after several sources have been merged into one collection, and
//! merges each duplicate pair into a single line without losing geometry.
//!
//! ## Pipeline
//! For a kept line `A` and a candidate donor `B` found through the spatial
//! index:
//!
//! 1. [`find_correspondences`](algs::finder::find_correspondences) pairs each
//!    vertex of `A` with the vertices of `B` that share its id or lie within
//!    the merge tolerance.
//! 2. [`validate`](algs::validator::validate) accepts only one-to-one,
//!    index-contiguous, single-direction matches.
//! 3. [`splice`](algs::splicer::splice) keeps `A`'s sequence and prepends or
//!    appends the donor's unmatched head and tail.
//! 4. A [`MergeOperation`](algs::merge_op::MergeOperation) commits the result
//!    (donor deleted, markers redirected) and can be undone exactly.
//!
//! [`ConflationSweep`](algs::sweep::ConflationSweep) drives this over a whole
//! [`LineStore`](data::store::LineStore), or over a
//! [`SharedStore`](data::shared::SharedStore) that interactive edits use at
//! the same time.
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! line-sieve = "0.3"
//! # Optional features:
//! # features = ["rayon", "check-invariants"]
//! ```
//!
//! ## Determinism
//!
//! Lines are visited in insertion order and candidate lists are sorted the
//! same way, so a sweep over the same input always produces the same merges,
//! with or without the `rayon` feature.

pub mod algs;
pub mod config;
pub mod conflate_error;
pub mod data;
pub mod debug_invariants;
pub mod geometry;
pub mod ingest;
pub mod spatial;
pub mod topology;

pub use debug_invariants::DebugInvariants;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::algs::merge_op::{
        AffectedEntities, ConflationBatch, MergeOperation, ReversibleOperation,
    };
    pub use crate::algs::sweep::{CancelToken, ConflationSweep, Plan, SweepReport};
    pub use crate::algs::validator::{RejectReason, Validation};
    pub use crate::config::{ConflateConfig, SinglePairPolicy};
    pub use crate::conflate_error::ConflateError;
    pub use crate::data::shared::{ChangeListener, SharedStore};
    pub use crate::data::store::{Line, LineStore, Vertex};
    pub use crate::data::tags::Tags;
    pub use crate::debug_invariants::DebugInvariants;
    pub use crate::geometry::{BBox, LatLon};
    pub use crate::ingest::FallbackCooldown;
    pub use crate::spatial::SpatialIndex;
    pub use crate::topology::orientation::Direction;
    pub use crate::topology::point::{EntityId, LineId, VertexId};
}
