//! Spatial candidate search over lines.
//!
//! The sweep only needs one read-only query: "which lines have an envelope
//! intersecting this box?". [`SpatialIndex`] is that seam; the
//! [`LineStore`](crate::data::store::LineStore) implements it on top of a
//! [`GridIndex`] it keeps current on every geometry change.

pub mod grid;

pub use grid::GridIndex;

use crate::geometry::BBox;
use crate::topology::point::LineId;

/// Bounding-box query surface consumed by the conflation sweep.
pub trait SpatialIndex {
    /// Lines whose envelope intersects `bbox`, deleted lines included.
    /// Order is unspecified.
    fn search_lines(&self, bbox: &BBox) -> Vec<LineId>;
}

impl SpatialIndex for GridIndex {
    fn search_lines(&self, bbox: &BBox) -> Vec<LineId> {
        self.query(bbox)
    }
}
