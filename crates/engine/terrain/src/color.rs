//! Color layers draped over terrain tiles
//!
//! A color layer is either a regular image (bound as a 2D texture) or a
//! contour color ramp (bound as a 1D texture indexed by elevation). Each layer
//! may carry its own locator; layers without one are mapped with the tile's
//! master locator.

use std::sync::Arc;

use crate::locator::Locator;
use crate::texture::FilterMode;

/// RGBA pixel buffer for a color layer
#[derive(Debug, Clone, PartialEq)]
pub struct TileImage {
    /// Image data as RGBA bytes (row-major, top-to-bottom)
    pub data: Vec<u8>,
    /// Width of the image in pixels
    pub width: u32,
    /// Height of the image in pixels
    pub height: u32,
}

impl TileImage {
    /// Create a tile image from RGBA bytes
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        debug_assert_eq!(data.len(), (width * height * 4) as usize);
        Self { data, width, height }
    }

    /// Create a solid color tile image
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixel_count = (width * height) as usize;
        let mut data = Vec::with_capacity(pixel_count * 4);
        for _ in 0..pixel_count {
            data.extend_from_slice(&rgba);
        }
        Self { data, width, height }
    }

    /// Whether any pixel is not fully opaque
    pub fn is_translucent(&self) -> bool {
        self.data.chunks_exact(4).any(|px| px[3] != 255)
    }

    /// Whether both dimensions are non-zero powers of two
    pub fn is_power_of_two(&self) -> bool {
        self.width.is_power_of_two() && self.height.is_power_of_two()
    }
}

/// Imagery draped as a 2D texture
#[derive(Debug, Clone, PartialEq)]
pub struct ImageLayer {
    pub image: Option<Arc<TileImage>>,
    pub locator: Option<Arc<Locator>>,
    pub min_filter: FilterMode,
    pub mag_filter: FilterMode,
}

impl ImageLayer {
    pub fn new(image: Arc<TileImage>) -> Self {
        Self {
            image: Some(image),
            locator: None,
            min_filter: FilterMode::LinearMipmapLinear,
            mag_filter: FilterMode::Linear,
        }
    }

    pub fn with_locator(mut self, locator: Arc<Locator>) -> Self {
        self.locator = Some(locator);
        self
    }

    pub fn with_filters(mut self, min_filter: FilterMode, mag_filter: FilterMode) -> Self {
        self.min_filter = min_filter;
        self.mag_filter = mag_filter;
        self
    }
}

/// Elevation color ramp draped as a 1D texture
#[derive(Debug, Clone, PartialEq)]
pub struct ContourLayer {
    pub image: Option<Arc<TileImage>>,
    pub locator: Option<Arc<Locator>>,
    pub mag_filter: FilterMode,
}

impl ContourLayer {
    pub fn new(ramp: Arc<TileImage>) -> Self {
        Self {
            image: Some(ramp),
            locator: None,
            mag_filter: FilterMode::Linear,
        }
    }

    pub fn with_locator(mut self, locator: Arc<Locator>) -> Self {
        self.locator = Some(locator);
        self
    }
}

/// A color layer source
#[derive(Debug, Clone, PartialEq)]
pub enum ColorSource {
    Image(ImageLayer),
    Contour(ContourLayer),
}

impl ColorSource {
    pub fn image(&self) -> Option<&Arc<TileImage>> {
        match self {
            ColorSource::Image(layer) => layer.image.as_ref(),
            ColorSource::Contour(layer) => layer.image.as_ref(),
        }
    }

    pub fn locator(&self) -> Option<&Arc<Locator>> {
        match self {
            ColorSource::Image(layer) => layer.locator.as_ref(),
            ColorSource::Contour(layer) => layer.locator.as_ref(),
        }
    }

    /// Preferred minification filter
    ///
    /// Contour ramps are always sampled with nearest minification.
    pub fn min_filter(&self) -> FilterMode {
        match self {
            ColorSource::Image(layer) => layer.min_filter,
            ColorSource::Contour(_) => FilterMode::Nearest,
        }
    }

    pub fn mag_filter(&self) -> FilterMode {
        match self {
            ColorSource::Image(layer) => layer.mag_filter,
            ColorSource::Contour(layer) => layer.mag_filter,
        }
    }
}

impl From<ImageLayer> for ColorSource {
    fn from(layer: ImageLayer) -> Self {
        ColorSource::Image(layer)
    }
}

impl From<ContourLayer> for ColorSource {
    fn from(layer: ContourLayer) -> Self {
        ColorSource::Contour(layer)
    }
}
