//! Locators map tile-local normalized coordinates (NDC) to model space
//!
//! A tile's NDC spans `[0, 1] x [0, 1]` across its footprint, with `z` carrying
//! the scaled elevation. The locator first maps NDC into its extent's map frame
//! and then, for geocentric locators, onto the WGS84 ellipsoid.

use glam::DVec3;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::coords::{ecef_to_geodetic, geodetic_to_ecef, GeoCoord};
use crate::extent::Extent;

/// Coordinate system a locator produces model coordinates in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoordinateSystemType {
    /// Earth-centered, earth-fixed meters; the extent is in lon/lat degrees
    Geocentric,
    /// Longitude/latitude degrees with height in meters
    Geographic,
    /// Planar map units
    Projected,
}

impl CoordinateSystemType {
    /// Whether the extent frame is geodetic (lon/lat degrees)
    pub fn is_geodetic(self) -> bool {
        matches!(self, Self::Geocentric | Self::Geographic)
    }
}

/// Bidirectional mapping between tile NDC and model coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Locator {
    coordinate_system: CoordinateSystemType,
    extent: Extent,
    orientation_open_gl: bool,
}

impl Locator {
    /// Create a locator over `extent`
    pub fn new(coordinate_system: CoordinateSystemType, extent: Extent) -> Self {
        Self {
            coordinate_system,
            extent,
            orientation_open_gl: true,
        }
    }

    /// Locator producing ECEF positions for a lon/lat extent
    pub fn geocentric(extent: Extent) -> Self {
        Self::new(CoordinateSystemType::Geocentric, extent)
    }

    /// Locator producing lon/lat/height positions
    pub fn geographic(extent: Extent) -> Self {
        Self::new(CoordinateSystemType::Geographic, extent)
    }

    /// Locator producing planar positions
    pub fn projected(extent: Extent) -> Self {
        Self::new(CoordinateSystemType::Projected, extent)
    }

    /// Override the handedness flag
    ///
    /// When `false`, the mesh builder flips the winding of the main triangulation.
    pub fn with_orientation_open_gl(mut self, orientation_open_gl: bool) -> Self {
        self.orientation_open_gl = orientation_open_gl;
        self
    }

    pub fn coordinate_system(&self) -> CoordinateSystemType {
        self.coordinate_system
    }

    pub fn extent(&self) -> &Extent {
        &self.extent
    }

    /// Whether model coordinates use the renderer's native front-face convention
    pub fn orientation_open_gl(&self) -> bool {
        self.orientation_open_gl
    }

    /// Whether the extent spans an area the locator can map into NDC
    ///
    /// Geodetic extents must also stay within longitude/latitude range.
    pub fn is_valid(&self) -> bool {
        if !self.extent.is_valid() {
            return false;
        }
        if !self.coordinate_system.is_geodetic() {
            return true;
        }
        let (min, max) = (self.extent.min, self.extent.max);
        GeoCoord::new(min.y, min.x).is_valid() && GeoCoord::new(max.y, max.x).is_valid()
    }

    pub fn is_geocentric(&self) -> bool {
        self.coordinate_system == CoordinateSystemType::Geocentric
    }

    /// Geographic locator over the same extent
    ///
    /// Texture coordinates are generated against this twin so that reprojection
    /// between color layers does not detour through ECEF.
    pub fn geographic_from_geocentric(&self) -> Locator {
        Locator {
            coordinate_system: CoordinateSystemType::Geographic,
            ..self.clone()
        }
    }

    /// NDC to the extent's map frame
    pub fn local_to_map(&self, ndc: DVec3) -> DVec3 {
        DVec3::new(
            self.extent.min.x + ndc.x * self.extent.width(),
            self.extent.min.y + ndc.y * self.extent.height(),
            ndc.z,
        )
    }

    /// Map frame to NDC
    ///
    /// A degenerate extent axis maps everything to 0 on that axis.
    pub fn map_to_local(&self, map: DVec3) -> DVec3 {
        let width = self.extent.width();
        let height = self.extent.height();
        DVec3::new(
            if width != 0.0 { (map.x - self.extent.min.x) / width } else { 0.0 },
            if height != 0.0 { (map.y - self.extent.min.y) / height } else { 0.0 },
            map.z,
        )
    }

    /// NDC to model coordinates
    pub fn local_to_model(&self, ndc: DVec3) -> DVec3 {
        let map = self.local_to_map(ndc);
        match self.coordinate_system {
            CoordinateSystemType::Geocentric => geodetic_to_ecef(map.x, map.y, map.z),
            CoordinateSystemType::Geographic | CoordinateSystemType::Projected => map,
        }
    }

    /// Model coordinates to NDC
    pub fn model_to_local(&self, model: DVec3) -> DVec3 {
        let map = match self.coordinate_system {
            CoordinateSystemType::Geocentric => ecef_to_geodetic(model),
            CoordinateSystemType::Geographic | CoordinateSystemType::Projected => model,
        };
        self.map_to_local(map)
    }

    /// Convert an NDC position of `from` into the NDC of `to`
    ///
    /// Locators sharing a horizontal frame convert through map coordinates;
    /// otherwise the conversion goes through model space.
    pub fn convert_local_between(from: &Locator, ndc: DVec3, to: &Locator) -> DVec3 {
        if from.coordinate_system.is_geodetic() == to.coordinate_system.is_geodetic() {
            to.map_to_local(from.local_to_map(ndc))
        } else {
            to.model_to_local(from.local_to_model(ndc))
        }
    }

    /// Expand `min`/`max` (this locator's NDC) to cover `other`'s footprint
    pub fn compute_local_bounds(&self, other: &Locator, min: &mut DVec3, max: &mut DVec3) {
        let corners = [
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(1.0, 0.0, 0.0),
            DVec3::new(0.0, 1.0, 0.0),
            DVec3::new(1.0, 1.0, 0.0),
        ];
        for corner in corners {
            let local = Locator::convert_local_between(other, corner, self);
            *min = min.min(local);
            *max = max.max(local);
        }
    }
}

/// Whether two locator handles denote the same projection
pub fn same_locator(a: &Arc<Locator>, b: &Arc<Locator>) -> bool {
    Arc::ptr_eq(a, b) || a == b
}

/// Locator used for texture-coordinate generation
///
/// Geocentric locators are replaced by their geographic twin.
pub fn texture_locator(locator: &Arc<Locator>) -> Arc<Locator> {
    if locator.is_geocentric() {
        Arc::new(locator.geographic_from_geocentric())
    } else {
        Arc::clone(locator)
    }
}
