//! Geometric splicing of a donor line onto a kept line.
//!
//! The kept line's sequence is never reordered. Donor vertices before the
//! matched window become the head, donor vertices after it the tail:
//!
//! ```text
//! merged = donor[..first] ++ kept ++ donor[last + 1..]
//! ```
//!
//! where `first`/`last` are the smallest/largest matched donor indices after
//! the donor has been turned to run the kept line's way.

use crate::algs::correspondence::CorrespondenceSet;
use crate::conflate_error::ConflateError;
use crate::data::store::LineStore;
use crate::topology::orientation::Direction;
use crate::topology::point::{LineId, VertexId};

/// Build the merged vertex sequence, or `None` when it would be empty.
///
/// A pair whose index lies outside its line fails with
/// [`ConflateError::CorrespondenceOutOfRange`].
pub fn splice(
    store: &LineStore,
    kept: LineId,
    donor: LineId,
    set: &CorrespondenceSet,
    direction: Direction,
) -> Result<Option<Vec<VertexId>>, ConflateError> {
    let kept_vertices = store.try_line(kept)?.vertices();
    let mut donor_vertices = store.try_line(donor)?.vertices().to_vec();
    let n = donor_vertices.len();
    for pair in set.pairs() {
        check_index(kept, pair.index_a, kept_vertices.len())?;
        check_index(donor, pair.index_b, n)?;
    }

    let mut donor_indices: Vec<usize> = set.pairs().iter().map(|p| p.index_b).collect();
    if direction == Direction::Reversed {
        donor_vertices.reverse();
        for i in &mut donor_indices {
            *i = n - *i - 1;
        }
    }

    let (head, tail) = match (donor_indices.iter().min(), donor_indices.iter().max()) {
        (Some(&first), Some(&last)) => (&donor_vertices[..first], &donor_vertices[last + 1..]),
        _ => {
            if append_disjoint(store, kept_vertices, &donor_vertices)? {
                (&donor_vertices[..0], &donor_vertices[..])
            } else {
                (&donor_vertices[..], &donor_vertices[..0])
            }
        }
    };

    let mut merged = Vec::with_capacity(head.len() + kept_vertices.len() + tail.len());
    merged.extend_from_slice(head);
    merged.extend_from_slice(kept_vertices);
    merged.extend_from_slice(tail);
    Ok((!merged.is_empty()).then_some(merged))
}

fn check_index(line: LineId, index: usize, len: usize) -> Result<(), ConflateError> {
    if index < len {
        Ok(())
    } else {
        Err(ConflateError::CorrespondenceOutOfRange { line, index, len })
    }
}

/// For a zero-overlap merge: whether the (already oriented) donor joins the
/// kept line's end rather than its start.
fn append_disjoint(
    store: &LineStore,
    kept: &[VertexId],
    donor: &[VertexId],
) -> Result<bool, ConflateError> {
    let (Some(&k_first), Some(&k_last), Some(&d_first), Some(&d_last)) =
        (kept.first(), kept.last(), donor.first(), donor.last())
    else {
        return Ok(true);
    };
    let coord = |v: VertexId| store.try_vertex(v).map(|vx| vx.coord);
    let append_gap = coord(k_last)?.great_circle_distance(&coord(d_first)?);
    let prepend_gap = coord(d_last)?.great_circle_distance(&coord(k_first)?);
    Ok(append_gap <= prepend_gap)
}
