//! Geographic coordinates and great-circle distance.
//!
//! All coordinates are WGS84 degrees; no projection is ever applied.
//! Distances come from `geo`'s haversine, rescaled from its mean Earth radius
//! to the WGS84 semi-major axis.

use geo::{HaversineDistance, Point};

/// Earth radius used for great-circle distances (WGS84 semi-major axis), in meters.
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Mean Earth radius `geo`'s haversine is computed on, in meters.
const GEO_MEAN_EARTH_RADIUS_M: f64 = 6_371_008.8;

/// A latitude/longitude pair in degrees.
#[derive(Copy, Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    #[inline]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Whether both components are finite and inside the valid degree ranges.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }

    /// Great-circle distance to `other` in meters.
    pub fn great_circle_distance(&self, other: &LatLon) -> f64 {
        let d = Point::from(*self).haversine_distance(&Point::from(*other));
        d * (EARTH_RADIUS_M / GEO_MEAN_EARTH_RADIUS_M)
    }
}

/// `geo` points are `(x, y) = (lon, lat)`.
impl From<LatLon> for Point<f64> {
    fn from(p: LatLon) -> Self {
        Point::new(p.lon, p.lat)
    }
}

impl From<Point<f64>> for LatLon {
    fn from(p: Point<f64>) -> Self {
        LatLon::new(p.y(), p.x())
    }
}
