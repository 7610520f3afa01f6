//! Correspondence discovery between two lines.
//!
//! Every vertex of line A is compared against every vertex of line B; a pair
//! matches when both sides are the same vertex or lie closer than the
//! tolerance. Disambiguation is left to the
//! [`validator`](crate::algs::validator). O(|A|·|B|), fine for polylines.

use crate::algs::correspondence::{RawMatches, SourceMatches};
use crate::conflate_error::ConflateError;
use crate::data::store::LineStore;
use crate::geometry::LatLon;
use crate::topology::point::{LineId, VertexId};

/// Find all candidate vertex matches of `line_a` against `line_b`.
///
/// `tolerance_m` is an exclusive great-circle bound in meters.
pub fn find_correspondences(
    store: &LineStore,
    line_a: LineId,
    line_b: LineId,
    tolerance_m: f64,
) -> Result<RawMatches, ConflateError> {
    let a = resolve(store, line_a)?;
    let b = resolve(store, line_b)?;
    let mut matches = RawMatches::new();
    for (i, &(va, ca)) in a.iter().enumerate() {
        for (j, &(vb, cb)) in b.iter().enumerate() {
            if va == vb || ca.great_circle_distance(&cb) < tolerance_m {
                matches
                    .entry(i)
                    .or_insert_with(|| SourceMatches {
                        vertex: va,
                        targets: Vec::new(),
                    })
                    .targets
                    .push((j, vb));
            }
        }
    }
    Ok(matches)
}

fn resolve(store: &LineStore, line: LineId) -> Result<Vec<(VertexId, LatLon)>, ConflateError> {
    store
        .try_line(line)?
        .vertices()
        .iter()
        .map(|&v| store.try_vertex(v).map(|vx| (v, vx.coord)))
        .collect()
}
