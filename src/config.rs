//! Engine configuration.
//!
//! The host owns preference persistence; it hands the engine a
//! [`ConflateConfig`], typically deserialized from JSON:
//!
//! ```rust
//! use line_sieve::config::ConflateConfig;
//! let cfg = ConflateConfig::from_json_str(r#"{ "max_vertex_merge_distance": 0.5 }"#).unwrap();
//! assert_eq!(cfg.max_vertex_merge_distance, 0.5);
//! assert_eq!(cfg.index_cell_degrees, line_sieve::config::DEFAULT_INDEX_CELL_DEGREES);
//! ```

use crate::conflate_error::ConflateError;

/// Default vertex merge tolerance, in meters.
pub const DEFAULT_MAX_VERTEX_MERGE_DISTANCE: f64 = 1.0;

/// Default spatial-index cell edge, in degrees (~110 m at the equator).
pub const DEFAULT_INDEX_CELL_DEGREES: f64 = 0.001;

/// How a correspondence consisting of a single vertex pair is treated.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinglePairPolicy {
    /// Accept when the shared vertex is an endpoint of both lines; direction
    /// follows from which side sits at index 0.
    #[default]
    EndpointHeuristic,
    /// Require at least two corresponding vertices.
    Reject,
}

/// Tunables consumed by the finder, validator and sweep.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ConflateConfig {
    /// Two vertices closer than this (meters, great-circle) correspond.
    pub max_vertex_merge_distance: f64,
    /// Cell edge of the store's spatial grid, in degrees.
    pub index_cell_degrees: f64,
    pub single_pair_policy: SinglePairPolicy,
}

impl Default for ConflateConfig {
    fn default() -> Self {
        Self {
            max_vertex_merge_distance: DEFAULT_MAX_VERTEX_MERGE_DISTANCE,
            index_cell_degrees: DEFAULT_INDEX_CELL_DEGREES,
            single_pair_policy: SinglePairPolicy::default(),
        }
    }
}

impl ConflateConfig {
    /// Parse from JSON; missing fields take their defaults. The result is
    /// validated.
    pub fn from_json_str(json: &str) -> Result<Self, ConflateError> {
        let cfg: ConflateConfig =
            serde_json::from_str(json).map_err(|e| ConflateError::InvalidConfig(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConflateError> {
        if !self.max_vertex_merge_distance.is_finite() || self.max_vertex_merge_distance < 0.0 {
            return Err(ConflateError::InvalidConfig(format!(
                "max_vertex_merge_distance must be a finite, non-negative distance (got {})",
                self.max_vertex_merge_distance
            )));
        }
        if !self.index_cell_degrees.is_finite() || self.index_cell_degrees <= 0.0 {
            return Err(ConflateError::InvalidConfig(format!(
                "index_cell_degrees must be positive (got {})",
                self.index_cell_degrees
            )));
        }
        Ok(())
    }
}
