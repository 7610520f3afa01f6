//! ConflateError: Unified error type for line-sieve public APIs
//!
//! Ordinary "these lines are not duplicates" outcomes are *not* errors; they
//! are reported as [`Validation::Rejected`](crate::algs::validator::Validation).
//! The variants below cover invalid input and internal-consistency failures
//! that abort a single candidate pair.

use thiserror::Error;

use crate::topology::point::{EntityId, LineId, VertexId};

/// Unified error type for line-sieve operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConflateError {
    /// Attempted to construct an id with a zero value (invalid).
    #[error("entity id must be non-zero (0 is reserved as invalid/sentinel)")]
    InvalidId,
    /// Textual entity reference (`n12`, `w7`) could not be parsed.
    #[error("malformed entity reference `{0}`")]
    MalformedReference(String),
    /// An entity with this id is already present in the store.
    #[error("duplicate entity id {0}")]
    DuplicateEntity(EntityId),
    /// A vertex coordinate is not a finite latitude/longitude in range.
    #[error("vertex {vertex} has invalid coordinate ({lat}, {lon})")]
    InvalidCoordinate { vertex: VertexId, lat: f64, lon: f64 },
    /// Lookup of a vertex that is not in the store.
    #[error("vertex {0} not found in store")]
    MissingVertex(VertexId),
    /// Lookup of a line that is not in the store.
    #[error("line {0} not found in store")]
    MissingLine(LineId),
    /// A correspondence refers to a vertex already marked deleted.
    #[error("internal consistency: matched vertex {vertex} on line {line} is deleted")]
    DeletedVertexInMatch { line: LineId, vertex: VertexId },
    /// A line taking part in a merge is already deleted.
    #[error("line {0} is deleted and cannot take part in a merge")]
    DeletedLine(LineId),
    /// The kept or donor line changed between planning and commit.
    #[error("merge of {donor} into {kept} is stale: line geometry changed since planning")]
    StaleOperation { kept: LineId, donor: LineId },
    /// A correspondence index lies outside the line it refers to.
    #[error("correspondence index {index} is out of range for line {line} of {len} vertices")]
    CorrespondenceOutOfRange { line: LineId, index: usize, len: usize },
    /// A line cannot be merged with itself.
    #[error("line {0} cannot be merged with itself")]
    SelfMerge(LineId),
    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Envelope cache disagrees with the line's vertices.
    #[error("envelope of line {0} is out of date")]
    StaleEnvelope(LineId),
    /// A live line is missing from the spatial index.
    #[error("line {0} is not present in the spatial index")]
    UnindexedLine(LineId),
}
