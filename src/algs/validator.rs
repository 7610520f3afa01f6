//! Correspondence validation.
//!
//! Raw finder output is reduced to one pair per matched vertex and then
//! checked: the match must be unambiguous (one-to-one), index-contiguous on
//! both lines and run in a single direction. Anything else is not a simple
//! duplicate and is rejected; rejection is an ordinary outcome, not an error.
//!
//! The only hard error is an internal-consistency failure: a match that
//! involves a vertex already marked deleted.

use hashbrown::HashSet;
use itertools::Itertools;

use crate::algs::correspondence::{CorrespondencePair, CorrespondenceSet, RawMatches};
use crate::config::{ConflateConfig, SinglePairPolicy};
use crate::conflate_error::ConflateError;
use crate::data::store::LineStore;
use crate::topology::orientation::Direction;
use crate::topology::point::LineId;

/// Line attribute identifying the external feature a line was derived from.
pub const ORIG_ID: &str = "orig_id";

/// Why a candidate pair is not a simple duplicate.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RejectReason {
    /// A vertex matches several vertices on the other line, or vice versa.
    Ambiguous,
    /// Matched indices have gaps or change direction: the lines diverge and rejoin.
    NonContiguous,
    /// No vertex matches and no shared `orig_id`.
    NoOverlap,
    /// A single matched vertex that is not an endpoint of both lines.
    IndeterminateDirection,
    /// A single matched vertex while the policy requires two.
    SinglePair,
    /// The splice produced no vertices.
    EmptySplice,
}

/// Outcome of validating one candidate pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Validation {
    Accepted {
        set: CorrespondenceSet,
        direction: Direction,
    },
    Rejected(RejectReason),
}

impl Validation {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Validation::Accepted { .. })
    }
}

/// Validate the raw matches of `line_a` (kept) against `line_b` (donor).
pub fn validate(
    store: &LineStore,
    line_a: LineId,
    line_b: LineId,
    raw: &RawMatches,
    config: &ConflateConfig,
) -> Result<Validation, ConflateError> {
    for source in raw.values() {
        if store.try_vertex(source.vertex)?.deleted {
            return Err(ConflateError::DeletedVertexInMatch {
                line: line_a,
                vertex: source.vertex,
            });
        }
        for &(_, vb) in &source.targets {
            if store.try_vertex(vb)?.deleted {
                return Err(ConflateError::DeletedVertexInMatch {
                    line: line_b,
                    vertex: vb,
                });
            }
        }
    }

    let set = match compress(raw) {
        Some(set) => set,
        None => return Ok(Validation::Rejected(RejectReason::Ambiguous)),
    };

    if set.is_empty() {
        return Ok(if same_origin(store, line_a, line_b)? {
            let direction = disjoint_direction(store, line_a, line_b)?;
            Validation::Accepted { set, direction }
        } else {
            Validation::Rejected(RejectReason::NoOverlap)
        });
    }

    if !is_contiguous(&set.indices_a()) || !is_contiguous(&set.indices_b()) {
        return Ok(Validation::Rejected(RejectReason::NonContiguous));
    }

    let len_a = store.try_line(line_a)?.len();
    let len_b = store.try_line(line_b)?.len();
    Ok(match check_direction(&set, len_a, len_b, config.single_pair_policy) {
        Ok(direction) => Validation::Accepted { set, direction },
        Err(reason) => Validation::Rejected(reason),
    })
}

/// One representative target per source index. `None` when any source has
/// several targets or any target is claimed twice.
pub fn compress(raw: &RawMatches) -> Option<CorrespondenceSet> {
    let mut claimed = HashSet::new();
    let mut pairs = Vec::with_capacity(raw.len());
    for (&index_a, source) in raw {
        let [(index_b, vertex_b)] = source.targets.as_slice() else {
            return None;
        };
        if !claimed.insert(*index_b) {
            return None;
        }
        pairs.push(CorrespondencePair::new(index_a, source.vertex, *index_b, *vertex_b));
    }
    Some(CorrespondenceSet::new(pairs))
}

/// A sorted index list with no gaps (each step is exactly +1).
pub fn is_contiguous(sorted: &[usize]) -> bool {
    sorted.iter().tuple_windows().all(|(a, b)| *b == a + 1)
}

/// Relative direction of the donor (B) with respect to the kept line (A).
///
/// With two or more pairs the first two decide, and every later step must
/// agree. A single pair is resolved by the endpoint heuristic when `policy`
/// allows it.
pub fn check_direction(
    set: &CorrespondenceSet,
    len_a: usize,
    len_b: usize,
    policy: SinglePairPolicy,
) -> Result<Direction, RejectReason> {
    match set.pairs() {
        [] => Ok(Direction::Same),
        [only] => match policy {
            SinglePairPolicy::Reject => Err(RejectReason::SinglePair),
            SinglePairPolicy::EndpointHeuristic => {
                let endpoint = |i: usize, len: usize| i == 0 || i + 1 == len;
                if !endpoint(only.index_a, len_a) || !endpoint(only.index_b, len_b) {
                    return Err(RejectReason::IndeterminateDirection);
                }
                // Joined at index 0 on exactly one side: the lines continue
                // each other. At index 0 on both (or neither): they meet head
                // to head (or tail to tail).
                Ok(Direction::from_deltas(only.index_a == 0, only.index_b != 0))
            }
        },
        [first, second, ..] => {
            let forward_a = first.index_a < second.index_a;
            let forward_b = first.index_b < second.index_b;
            let consistent = set
                .pairs()
                .iter()
                .tuple_windows()
                .all(|(p, q)| (p.index_b < q.index_b) == forward_b);
            if consistent {
                Ok(Direction::from_deltas(forward_a, forward_b))
            } else {
                Err(RejectReason::NonContiguous)
            }
        }
    }
}

fn same_origin(store: &LineStore, a: LineId, b: LineId) -> Result<bool, ConflateError> {
    let a = store.try_line(a)?.tags.get(ORIG_ID);
    let b = store.try_line(b)?.tags.get(ORIG_ID);
    Ok(a.is_some() && a == b)
}

/// For two lines without shared vertices, the donor orientation whose nearest
/// end joins the kept line with the smallest gap.
fn disjoint_direction(store: &LineStore, kept: LineId, donor: LineId) -> Result<Direction, ConflateError> {
    let k = store.line_coords(kept)?;
    let d = store.line_coords(donor)?;
    let (Some(k_first), Some(k_last), Some(d_first), Some(d_last)) =
        (k.first(), k.last(), d.first(), d.last())
    else {
        return Ok(Direction::Same);
    };
    let joins = [
        (k_last.great_circle_distance(d_first), Direction::Same),
        (k_last.great_circle_distance(d_last), Direction::Reversed),
        (d_last.great_circle_distance(k_first), Direction::Same),
        (d_first.great_circle_distance(k_first), Direction::Reversed),
    ];
    let best = joins
        .iter()
        .fold(joins[0], |best, &cand| if cand.0 < best.0 { cand } else { best });
    Ok(best.1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::correspondence::SourceMatches;
    use crate::topology::point::VertexId;

    fn vid(raw: u64) -> VertexId {
        VertexId::new(raw).unwrap()
    }

    fn raw(entries: &[(usize, &[usize])]) -> RawMatches {
        entries
            .iter()
            .map(|&(i, targets)| {
                (
                    i,
                    SourceMatches {
                        vertex: vid(i as u64 + 1),
                        targets: targets.iter().map(|&j| (j, vid(j as u64 + 100))).collect(),
                    },
                )
            })
            .collect()
    }

    fn set(pairs: &[(usize, usize)]) -> CorrespondenceSet {
        CorrespondenceSet::new(
            pairs
                .iter()
                .map(|&(i, j)| CorrespondencePair::new(i, vid(i as u64 + 1), j, vid(j as u64 + 100)))
                .collect(),
        )
    }

    #[test]
    fn compress_rejects_one_to_many_and_many_to_one() {
        assert!(compress(&raw(&[(0, &[0, 1])])).is_none());
        assert!(compress(&raw(&[(0, &[3]), (1, &[3])])).is_none());
        let s = compress(&raw(&[(1, &[4]), (0, &[5])])).unwrap();
        assert_eq!(s.indices_a(), vec![0, 1]);
    }

    #[test]
    fn contiguity() {
        assert!(is_contiguous(&[]));
        assert!(is_contiguous(&[7]));
        assert!(is_contiguous(&[2, 3, 4]));
        assert!(!is_contiguous(&[0, 2]));
        assert!(!is_contiguous(&[1, 1]));
    }

    #[test]
    fn direction_from_first_two_pairs() {
        let p = SinglePairPolicy::EndpointHeuristic;
        assert_eq!(check_direction(&set(&[(0, 0), (1, 1)]), 3, 3, p), Ok(Direction::Same));
        assert_eq!(
            check_direction(&set(&[(0, 2), (1, 1), (2, 0)]), 3, 3, p),
            Ok(Direction::Reversed)
        );
        // Turns back on itself after the first step.
        assert_eq!(
            check_direction(&set(&[(0, 1), (1, 2), (2, 0)]), 3, 3, p),
            Err(RejectReason::NonContiguous)
        );
    }

    #[test]
    fn single_pair_endpoint_heuristic() {
        let p = SinglePairPolicy::EndpointHeuristic;
        // A ends where B starts.
        assert_eq!(check_direction(&set(&[(2, 0)]), 3, 3, p), Ok(Direction::Same));
        // B ends where A starts.
        assert_eq!(check_direction(&set(&[(0, 2)]), 3, 3, p), Ok(Direction::Same));
        // Both start at the shared vertex.
        assert_eq!(check_direction(&set(&[(0, 0)]), 3, 3, p), Ok(Direction::Reversed));
        // Both end at the shared vertex.
        assert_eq!(check_direction(&set(&[(2, 2)]), 3, 3, p), Ok(Direction::Reversed));
        // Interior on A.
        assert_eq!(
            check_direction(&set(&[(1, 0)]), 3, 3, p),
            Err(RejectReason::IndeterminateDirection)
        );
        assert_eq!(
            check_direction(&set(&[(0, 0)]), 3, 3, SinglePairPolicy::Reject),
            Err(RejectReason::SinglePair)
        );
    }
}
