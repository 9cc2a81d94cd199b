//! Texture and render-state descriptions produced for the host renderer
//!
//! The terrain core never touches a graphics API; it only decides which image
//! goes into which texture unit and with which sampling parameters.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::color::TileImage;

/// Texture sampling filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterMode {
    Nearest,
    Linear,
    NearestMipmapNearest,
    LinearMipmapNearest,
    NearestMipmapLinear,
    LinearMipmapLinear,
}

impl FilterMode {
    /// Whether sampling with this filter requires a mipmap chain
    pub fn uses_mipmaps(self) -> bool {
        !matches!(self, FilterMode::Nearest | FilterMode::Linear)
    }
}

/// Texture coordinate wrapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WrapMode {
    ClampToEdge,
    Repeat,
}

/// Texture dimensionality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextureKind {
    /// Contour color ramp
    Texture1D,
    /// Imagery
    Texture2D,
}

/// A texture object bound to one texture unit of a tile
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    pub kind: TextureKind,
    pub image: Arc<TileImage>,
    pub min_filter: FilterMode,
    pub mag_filter: FilterMode,
    pub wrap_s: WrapMode,
    pub wrap_t: WrapMode,
    pub max_anisotropy: f32,
}

/// Render bin hint for the host's sorting pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RenderBin {
    #[default]
    Opaque,
    /// Sorted back to front and drawn after opaque geometry
    Transparent,
}

/// Per-tile render state: textures per layer slot and blending
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TileState {
    /// Texture bound to each color-layer slot (`None` for layers without an image)
    pub textures: Vec<Option<Arc<Texture>>>,
    pub blend: bool,
    pub render_bin: RenderBin,
}

impl TileState {
    /// Texture bound at `unit`, if any
    pub fn texture(&self, unit: usize) -> Option<&Arc<Texture>> {
        self.textures.get(unit).and_then(Option::as_ref)
    }

    /// Bind `texture` to `unit`, growing the slot table as needed
    pub fn set_texture(&mut self, unit: usize, texture: Arc<Texture>) {
        if self.textures.len() <= unit {
            self.textures.resize(unit + 1, None);
        }
        self.textures[unit] = Some(texture);
    }
}
