//! Relative direction of two polylines.

use core::fmt::{Debug, Formatter};

/// Whether a donor line runs the same way as the kept line or against it.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Default, serde::Serialize, serde::Deserialize)]
pub enum Direction {
    /// Index deltas increase together on both lines.
    #[default]
    Same,
    /// One line's indices increase while the other's decrease (antiparallel).
    Reversed,
}

impl Direction {
    /// Direction implied by the signs of two index deltas.
    #[inline]
    pub fn from_deltas(forward_a: bool, forward_b: bool) -> Self {
        if forward_a == forward_b {
            Direction::Same
        } else {
            Direction::Reversed
        }
    }

    #[inline]
    pub fn is_same(self) -> bool {
        matches!(self, Direction::Same)
    }
}

impl Debug for Direction {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Direction::Same => "Same",
            Direction::Reversed => "Reversed",
        })
    }
}
