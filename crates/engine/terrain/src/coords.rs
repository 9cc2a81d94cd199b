//! Geographic coordinates and the WGS84 ellipsoid
//!
//! Geocentric locators place tile vertices in earth-centered, earth-fixed (ECEF)
//! space. This module holds the conversions between geodetic (lat/lon/height)
//! and ECEF positions used by [`crate::locator::Locator`].

use glam::DVec3;
use serde::{Deserialize, Serialize};

/// WGS84 semi-major axis in meters
pub const WGS84_A: f64 = 6_378_137.0;
/// WGS84 semi-minor axis in meters
pub const WGS84_B: f64 = 6_356_752.314_245_179;
/// WGS84 first eccentricity squared
pub const WGS84_E2: f64 = 6.694_379_990_141_317e-3;

/// Geographic coordinate using WGS84 datum (latitude/longitude)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoCoord {
    /// Latitude in degrees (-90 to 90, positive = north)
    pub lat: f64,
    /// Longitude in degrees (-180 to 180, positive = east)
    pub lon: f64,
}

impl GeoCoord {
    /// Create a new geographic coordinate
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Check if the coordinate is within valid ranges
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lon)
    }
}

/// Convert geodetic longitude/latitude (degrees) and height (meters) to ECEF
pub fn geodetic_to_ecef(lon_deg: f64, lat_deg: f64, height: f64) -> DVec3 {
    let (sin_lat, cos_lat) = lat_deg.to_radians().sin_cos();
    let (sin_lon, cos_lon) = lon_deg.to_radians().sin_cos();

    // Prime vertical radius of curvature
    let n = WGS84_A / (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt();

    DVec3::new(
        (n + height) * cos_lat * cos_lon,
        (n + height) * cos_lat * sin_lon,
        (n * (1.0 - WGS84_E2) + height) * sin_lat,
    )
}

/// Convert an ECEF position to `(lon_deg, lat_deg, height)`
///
/// Uses Bowring's closed-form initial guess refined by a few fixed-point
/// iterations, which converges to sub-millimeter accuracy for terrain heights.
pub fn ecef_to_geodetic(ecef: DVec3) -> DVec3 {
    let p = (ecef.x * ecef.x + ecef.y * ecef.y).sqrt();
    let lon = ecef.y.atan2(ecef.x);

    if p < 1.0e-9 {
        // On the polar axis
        let lat = if ecef.z >= 0.0 { 90.0 } else { -90.0 };
        return DVec3::new(lon.to_degrees(), lat, ecef.z.abs() - WGS84_B);
    }

    let ep2 = (WGS84_A * WGS84_A - WGS84_B * WGS84_B) / (WGS84_B * WGS84_B);
    let theta = (ecef.z * WGS84_A).atan2(p * WGS84_B);
    let (sin_t, cos_t) = theta.sin_cos();
    let mut lat = (ecef.z + ep2 * WGS84_B * sin_t.powi(3))
        .atan2(p - WGS84_E2 * WGS84_A * cos_t.powi(3));

    let mut height = 0.0;
    for _ in 0..4 {
        let sin_lat = lat.sin();
        let n = WGS84_A / (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt();
        height = p / lat.cos() - n;
        lat = ecef.z.atan2(p * (1.0 - WGS84_E2 * n / (n + height)));
    }

    DVec3::new(lon.to_degrees(), lat.to_degrees(), height)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geo_coord_validity() {
        assert!(GeoCoord::new(45.0, -122.0).is_valid());
        assert!(GeoCoord::new(-90.0, -180.0).is_valid());
        assert!(!GeoCoord::new(91.0, 0.0).is_valid());
        assert!(!GeoCoord::new(0.0, 181.0).is_valid());
    }

    #[test]
    fn test_equator_prime_meridian_is_on_x_axis() {
        let ecef = geodetic_to_ecef(0.0, 0.0, 0.0);
        assert!((ecef.x - WGS84_A).abs() < 1e-6);
        assert!(ecef.y.abs() < 1e-6);
        assert!(ecef.z.abs() < 1e-6);
    }

    #[test]
    fn test_north_pole_uses_semi_minor_axis() {
        let ecef = geodetic_to_ecef(0.0, 90.0, 0.0);
        assert!((ecef.z - WGS84_B).abs() < 1e-3);
    }

    #[test]
    fn test_ecef_roundtrip() {
        let ecef = geodetic_to_ecef(-122.7, 45.5, 1234.0);
        let back = ecef_to_geodetic(ecef);

        assert!((back.x + 122.7).abs() < 1e-8);
        assert!((back.y - 45.5).abs() < 1e-8);
        assert!((back.z - 1234.0).abs() < 1e-3);
    }
}
