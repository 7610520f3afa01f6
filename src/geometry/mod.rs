//! Geometry utilities for line-sieve.
//!
//! Geographic coordinates with great-circle distance, and the bounding
//! envelopes used by the spatial index.

pub mod coord;
pub mod envelope;

pub use coord::LatLon;
pub use envelope::BBox;
