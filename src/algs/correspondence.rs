//! Vertex correspondences between two lines.
//!
//! A [`CorrespondencePair`] claims that vertex `index_a` of line A and vertex
//! `index_b` of line B are the same real-world point. [`RawMatches`] is the
//! unfiltered output of the finder; a [`CorrespondenceSet`] is what survives
//! validation: one pair per matched vertex, ordered by `index_a`.

use std::collections::BTreeMap;

use crate::topology::point::VertexId;

/// `(index_a, vertex_a, index_b, vertex_b)`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct CorrespondencePair {
    pub index_a: usize,
    pub vertex_a: VertexId,
    pub index_b: usize,
    pub vertex_b: VertexId,
}

impl CorrespondencePair {
    #[inline]
    pub fn new(index_a: usize, vertex_a: VertexId, index_b: usize, vertex_b: VertexId) -> Self {
        Self {
            index_a,
            vertex_a,
            index_b,
            vertex_b,
        }
    }

    /// Whether both sides are the very same vertex (shared, not just nearby).
    #[inline]
    pub fn is_shared(&self) -> bool {
        self.vertex_a == self.vertex_b
    }
}

/// Every candidate on line B for one vertex of line A.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceMatches {
    pub vertex: VertexId,
    /// `(index_b, vertex_b)` in discovery order.
    pub targets: Vec<(usize, VertexId)>,
}

/// Finder output: `index_a` → all candidate targets. Unmatched source indices
/// are absent.
pub type RawMatches = BTreeMap<usize, SourceMatches>;

/// Validated correspondence, one pair per matched vertex, sorted by `index_a`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CorrespondenceSet {
    pairs: Vec<CorrespondencePair>,
}

impl CorrespondenceSet {
    /// Builds a set, sorting the pairs by `index_a`.
    pub fn new(mut pairs: Vec<CorrespondencePair>) -> Self {
        pairs.sort_by_key(|p| p.index_a);
        Self { pairs }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    #[inline]
    pub fn pairs(&self) -> &[CorrespondencePair] {
        &self.pairs
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Sorted `index_a` values.
    pub fn indices_a(&self) -> Vec<usize> {
        self.pairs.iter().map(|p| p.index_a).collect()
    }

    /// Sorted `index_b` values.
    pub fn indices_b(&self) -> Vec<usize> {
        let mut out: Vec<usize> = self.pairs.iter().map(|p| p.index_b).collect();
        out.sort_unstable();
        out
    }
}
