//! Conflation algorithms: correspondence finding, validation, splicing,
//! marker resolution, reversible merge operations and the sweep driver.

pub mod correspondence;
pub mod finder;
pub mod markers;
pub mod merge_op;
pub mod splicer;
pub mod sweep;
pub mod validator;

pub use correspondence::{CorrespondencePair, CorrespondenceSet};
pub use finder::find_correspondences;
pub use merge_op::{AffectedEntities, ConflationBatch, MergeOperation, ReversibleOperation};
pub use splicer::splice;
pub use sweep::{CancelToken, ConflationSweep, Plan, SweepReport};
pub use validator::{RejectReason, Validation, validate};
