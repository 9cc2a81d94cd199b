//! Rectangular extents in a locator's map frame
//!
//! For geographic and geocentric locators the frame is (longitude, latitude)
//! in degrees; for projected locators it is the projection's map units.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::coords::GeoCoord;

/// Axis-aligned rectangle defined by its minimum and maximum corners
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    /// Minimum corner (west/south for geographic extents)
    pub min: DVec2,
    /// Maximum corner (east/north for geographic extents)
    pub max: DVec2,
}

impl Extent {
    /// Create a new extent from its minimum and maximum corners
    pub fn new(min: DVec2, max: DVec2) -> Self {
        Self { min, max }
    }

    /// Create a geographic extent from southwest and northeast corners
    pub fn from_geo(southwest: GeoCoord, northeast: GeoCoord) -> Self {
        Self {
            min: DVec2::new(southwest.lon, southwest.lat),
            max: DVec2::new(northeast.lon, northeast.lat),
        }
    }

    /// Check that the extent spans a non-empty area
    pub fn is_valid(&self) -> bool {
        self.min.is_finite()
            && self.max.is_finite()
            && self.min.x < self.max.x
            && self.min.y < self.max.y
    }

    /// Width along the first axis
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    /// Height along the second axis
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extent_from_geo() {
        let extent = Extent::from_geo(GeoCoord::new(45.0, -123.0), GeoCoord::new(46.0, -122.0));
        assert!(extent.is_valid());
        assert_eq!(extent.width(), 1.0);
        assert_eq!(extent.height(), 1.0);
        assert_eq!(extent.min, DVec2::new(-123.0, 45.0));
    }

    #[test]
    fn test_degenerate_extent_is_invalid() {
        let flat = Extent::new(DVec2::new(1.0, 0.0), DVec2::new(1.0, 5.0));
        assert!(!flat.is_valid());

        let inverted = Extent::new(DVec2::new(2.0, 2.0), DVec2::new(0.0, 3.0));
        assert!(!inverted.is_valid());

        let unbounded = Extent::new(DVec2::ZERO, DVec2::new(f64::INFINITY, 1.0));
        assert!(!unbounded.is_valid());
    }
}
