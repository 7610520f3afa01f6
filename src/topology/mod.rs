//! Identity and orientation primitives for line topology.
//!
//! - [`point`]: strong handles for vertices and lines, and the closed
//!   [`EntityId`] union over both.
//! - [`orientation`]: relative [`Direction`] of two polylines.

pub mod orientation;
pub mod point;

pub use orientation::Direction;
pub use point::{EntityId, LineId, VertexId};
