mod quadtree;

pub use quadtree::{Aabb, QuadTree};

use std::f64::consts::PI;
use std::fmt::Display;

use serde::{Deserialize, Serialize};

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A WGS84 point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Great-circle (haversine) distance in meters.
    pub fn distance_m(&self, other: &Coordinate) -> f64 {
        let dist_lat = f64::to_radians(other.latitude - self.latitude);
        let dist_lon = f64::to_radians(other.longitude - self.longitude);
        let a = f64::powi(f64::sin(dist_lat / 2.0), 2)
            + f64::cos(f64::to_radians(self.latitude))
                * f64::cos(f64::to_radians(other.latitude))
                * f64::sin(dist_lon / 2.0)
                * f64::sin(dist_lon / 2.0);
        let c = 2.0 * f64::atan2(f64::sqrt(a), f64::sqrt(1.0 - a));
        EARTH_RADIUS_M * c
    }
}

impl From<(f64, f64)> for Coordinate {
    fn from(value: (f64, f64)) -> Self {
        Self {
            latitude: value.0,
            longitude: value.1,
        }
    }
}

impl Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("{}, {}", self.latitude, self.longitude))
    }
}

/// Equirectangular approximation of a `radius_m` circle around a point, as a
/// bounding box in degrees. The longitude span widens with latitude.
pub fn radius_box(latitude: f64, longitude: f64, radius_m: f64) -> Aabb {
    let half_lat = radius_m / EARTH_RADIUS_M * 180.0 / PI;
    let half_lon = half_lat / f64::cos(latitude * PI / 180.0);
    Aabb::new(longitude, latitude, half_lon.abs(), half_lat.abs())
}
