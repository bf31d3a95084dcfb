//! Geographic coordinates.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Mean Earth radius used for great-circle distances.
const EARTH_RADIUS_M: f64 = 6_371_010.0;

/// A WGS84 latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Great-circle distance in metres.
    ///
    /// # Examples
    ///
    /// ```
    /// use transit_router::domain::Coordinate;
    ///
    /// let a = Coordinate::new(0.0, 0.0);
    /// let b = Coordinate::new(0.0, 1.0);
    /// let d = a.distance_meters(&b);
    /// assert!((d - 111_195.0).abs() < 10.0);
    /// assert_eq!(a.distance_meters(&a), 0.0);
    /// ```
    pub fn distance_meters(&self, other: &Coordinate) -> f64 {
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let dlat = lat2 - lat1;
        let dlon = (other.lon - self.lon).to_radians();

        let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
    }

    /// Initial bearing towards `other`, in degrees clockwise from north.
    ///
    /// Returns `None` for coincident points and logs a warning if the
    /// computation produces NaN (malformed coordinates).
    pub fn bearing_degrees(&self, other: &Coordinate) -> Option<f64> {
        if self == other {
            return None;
        }

        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let dlon = (other.lon - self.lon).to_radians();

        let y = dlon.sin() * lat2.cos();
        let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
        let bearing = y.atan2(x).to_degrees();

        if bearing.is_nan() {
            warn!(from = ?self, to = ?other, "bearing is NaN, ignoring direction");
            return None;
        }

        Some((bearing + 360.0) % 360.0)
    }

    /// Linear interpolation between two coordinates; `fraction` is clamped
    /// to `[0, 1]`.
    pub fn interpolate(&self, other: &Coordinate, fraction: f64) -> Coordinate {
        let f = fraction.clamp(0.0, 1.0);
        Coordinate {
            lat: self.lat + (other.lat - self.lat) * f,
            lon: self.lon + (other.lon - self.lon) * f,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_is_symmetric() {
        let a = Coordinate::new(51.5, -0.12);
        let b = Coordinate::new(51.52, -0.1);
        assert!((a.distance_meters(&b) - b.distance_meters(&a)).abs() < 1e-6);
    }

    #[test]
    fn bearing_cardinal_directions() {
        let origin = Coordinate::new(0.0, 0.0);

        let north = origin.bearing_degrees(&Coordinate::new(1.0, 0.0)).unwrap();
        let east = origin.bearing_degrees(&Coordinate::new(0.0, 1.0)).unwrap();

        assert!(north.abs() < 1e-9);
        assert!((east - 90.0).abs() < 1e-9);
    }

    #[test]
    fn bearing_degenerate() {
        let p = Coordinate::new(10.0, 10.0);
        assert_eq!(p.bearing_degrees(&p), None);
        assert_eq!(p.bearing_degrees(&Coordinate::new(f64::NAN, 0.0)), None);
    }

    #[test]
    fn interpolate_clamps() {
        let a = Coordinate::new(0.0, 0.0);
        let b = Coordinate::new(2.0, 4.0);

        assert_eq!(a.interpolate(&b, 0.5), Coordinate::new(1.0, 2.0));
        assert_eq!(a.interpolate(&b, 3.0), b);
    }
}
