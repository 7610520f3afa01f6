//! `VertexId` / `LineId`: strong, zero-cost handles for map entities
//!
//! Every vertex and line in a [`LineStore`](crate::data::store::LineStore) is
//! addressed by an opaque identifier wrapping a nonzero `u64`; 0 is reserved
//! as an invalid or sentinel value.
//!
//! [`EntityId`] is the closed union over the two entity kinds the engine
//! touches. Its textual form (`n12` for vertex 12, `w7` for line 7) is the one
//! used by the vertex marker attributes, see [`crate::algs::markers`].

use std::{fmt, num::NonZeroU64, str::FromStr};

use crate::conflate_error::ConflateError;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
        )]
        #[repr(transparent)]
        pub struct $name(NonZeroU64);

        impl $name {
            /// Creates a new id from a raw `u64` value.
            ///
            /// Returns [`ConflateError::InvalidId`] if `raw == 0`.
            #[inline]
            pub fn new(raw: u64) -> Result<Self, ConflateError> {
                NonZeroU64::new(raw).map($name).ok_or(ConflateError::InvalidId)
            }

            /// Returns the inner `u64` value.
            #[inline]
            pub const fn get(self) -> u64 {
                self.0.get()
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_tuple(stringify!($name)).field(&self.get()).finish()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.get())
            }
        }
    };
}

entity_id!(
    /// Handle of a vertex (a point shared by any number of lines).
    VertexId
);
entity_id!(
    /// Handle of a line (an ordered polyline of vertex handles).
    LineId
);

/// Either kind of entity, as reported to change listeners and written into
/// marker attributes.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub enum EntityId {
    Vertex(VertexId),
    Line(LineId),
}

impl From<VertexId> for EntityId {
    fn from(v: VertexId) -> Self {
        EntityId::Vertex(v)
    }
}

impl From<LineId> for EntityId {
    fn from(l: LineId) -> Self {
        EntityId::Line(l)
    }
}

/// Prints `n<id>` for vertices and `w<id>` for lines.
impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Vertex(v) => write!(f, "n{v}"),
            EntityId::Line(l) => write!(f, "w{l}"),
        }
    }
}

impl FromStr for EntityId {
    type Err = ConflateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let malformed = || ConflateError::MalformedReference(s.to_string());
        let (kind, digits) = s.split_at_checked(1).ok_or_else(malformed)?;
        let raw: u64 = digits.parse().map_err(|_| malformed())?;
        match kind {
            "n" => Ok(EntityId::Vertex(VertexId::new(raw).map_err(|_| malformed())?)),
            "w" => Ok(EntityId::Line(LineId::new(raw).map_err(|_| malformed())?)),
            _ => Err(malformed()),
        }
    }
}

#[cfg(test)]
mod layout_tests {
    //! Compile-time assertion that ids have the same size as `u64`.
    use super::*;
    use static_assertions::{assert_eq_align, assert_eq_size};

    assert_eq_size!(VertexId, u64);
    assert_eq_size!(LineId, u64);
    assert_eq_align!(VertexId, u64);
    // Niche optimisation keeps `Option<Id>` as small as the id itself.
    assert_eq_size!(Option<VertexId>, u64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_zero_is_rejected() {
        assert_eq!(VertexId::new(0), Err(ConflateError::InvalidId));
        assert_eq!(LineId::new(0), Err(ConflateError::InvalidId));
    }

    #[test]
    fn new_and_get() {
        let v = VertexId::new(42).unwrap();
        assert_eq!(v.get(), 42);
        assert_eq!(LineId::new(u64::MAX).unwrap().get(), u64::MAX);
    }

    #[test]
    fn debug_and_display() {
        let v = VertexId::new(7).unwrap();
        assert_eq!(format!("{:?}", v), "VertexId(7)");
        assert_eq!(format!("{}", v), "7");
        assert_eq!(EntityId::from(v).to_string(), "n7");
        assert_eq!(EntityId::from(LineId::new(3).unwrap()).to_string(), "w3");
    }

    #[test]
    fn parse_references() {
        let n: EntityId = "n12".parse().unwrap();
        assert_eq!(n, EntityId::Vertex(VertexId::new(12).unwrap()));
        let w: EntityId = " w5 ".parse().unwrap();
        assert_eq!(w, EntityId::Line(LineId::new(5).unwrap()));
        for bad in ["", "n", "x3", "n0", "n-1", "r4"] {
            assert!(bad.parse::<EntityId>().is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn ordering_and_hash() {
        let a = VertexId::new(1).unwrap();
        let b = VertexId::new(2).unwrap();
        assert!(a < b);
        let set: std::collections::HashSet<_> = [a, b, a].into_iter().collect();
        assert_eq!(set.len(), 2);
    }
}
