//! Color layer binder
//!
//! Maps every color layer onto the shared vertex set of a tile: one texture
//! coordinate array per distinct color source, one texture per layer slot, and
//! the blending state implied by the first imaged layer.

use glam::{DVec3, Vec2};
use std::sync::Arc;

use crate::color::ColorSource;
use crate::locator::{same_locator, texture_locator, Locator};
use crate::mesh::{grid_ndc, TerrainGeometry};
use crate::sampling::SamplingPlan;
use crate::texture::{FilterMode, RenderBin, Texture, TextureKind, TileState, WrapMode};

/// Assignment of color-layer slots to texture coordinate arrays
///
/// Layers holding the same source (`Arc` identity) share an array. Each array
/// remembers the locator its coordinates are generated in.
#[derive(Debug, Clone)]
pub struct TexCoordPlan {
    master: Arc<Locator>,
    arrays: Vec<Arc<Locator>>,
    slots: Vec<usize>,
}

impl TexCoordPlan {
    pub fn new(master: &Arc<Locator>, layers: &[Arc<ColorSource>]) -> Self {
        let master = texture_locator(master);
        let mut sources: Vec<&Arc<ColorSource>> = Vec::new();
        let mut arrays = Vec::new();
        let mut slots = Vec::with_capacity(layers.len());

        for layer in layers {
            if let Some(array) = sources.iter().position(|s| Arc::ptr_eq(s, layer)) {
                slots.push(array);
                continue;
            }

            let locator = layer
                .locator()
                .map(texture_locator)
                .unwrap_or_else(|| Arc::clone(&master));

            slots.push(arrays.len());
            sources.push(layer);
            arrays.push(locator);
        }

        Self { master, arrays, slots }
    }

    pub fn array_count(&self) -> usize {
        self.arrays.len()
    }

    /// Array index of every color-layer slot
    pub fn slots(&self) -> &[usize] {
        &self.slots
    }

    /// Texture coordinate of a master NDC position in `array`
    pub fn tex_coord(&self, array: usize, ndc: DVec3) -> Vec2 {
        let locator = &self.arrays[array];
        let local = if same_locator(locator, &self.master) {
            ndc
        } else {
            Locator::convert_local_between(&self.master, ndc, locator)
        };
        Vec2::new(local.x as f32, local.y as f32)
    }
}

/// Build the texture for one color layer, or `None` if it has no image
pub fn create_texture(source: &ColorSource, max_anisotropy: f32) -> Option<Texture> {
    let image = source.image()?;

    let texture = match source {
        ColorSource::Image(_) => {
            let mut min_filter = source.min_filter();
            if min_filter.uses_mipmaps() && !image.is_power_of_two() {
                tracing::debug!(
                    width = image.width,
                    height = image.height,
                    "Disabling mipmapping for non power of two texture"
                );
                min_filter = FilterMode::Linear;
            }
            Texture {
                kind: TextureKind::Texture2D,
                image: Arc::clone(image),
                min_filter,
                mag_filter: source.mag_filter(),
                wrap_s: WrapMode::ClampToEdge,
                wrap_t: WrapMode::ClampToEdge,
                max_anisotropy,
            }
        }
        ColorSource::Contour(_) => Texture {
            kind: TextureKind::Texture1D,
            image: Arc::clone(image),
            min_filter: source.min_filter(),
            mag_filter: source.mag_filter(),
            wrap_s: WrapMode::ClampToEdge,
            wrap_t: WrapMode::ClampToEdge,
            max_anisotropy: 1.0,
        },
    };

    Some(texture)
}

/// Bind a texture for every color layer into `state`
///
/// Layers holding the same source reuse one texture within the pass.
pub fn bind_color_layers(state: &mut TileState, layers: &[Arc<ColorSource>], max_anisotropy: f32) {
    let mut created: Vec<(&Arc<ColorSource>, Arc<Texture>)> = Vec::new();

    state.textures.clear();
    state.textures.resize(layers.len(), None);

    for (slot, layer) in layers.iter().enumerate() {
        if let Some((_, texture)) = created.iter().find(|(s, _)| Arc::ptr_eq(s, layer)) {
            state.set_texture(slot, Arc::clone(texture));
            continue;
        }

        if let Some(texture) = create_texture(layer, max_anisotropy) {
            let texture = Arc::new(texture);
            created.push((layer, Arc::clone(&texture)));
            state.set_texture(slot, texture);
        }
    }
}

/// Enable blending when the first layer with an image is translucent
pub fn apply_transparency(state: &mut TileState, layers: &[Arc<ColorSource>]) {
    let translucent = layers
        .iter()
        .find_map(|layer| layer.image())
        .is_some_and(|image| image.is_translucent());

    if translucent {
        state.blend = true;
        state.render_bin = RenderBin::Transparent;
    } else {
        state.blend = false;
        state.render_bin = RenderBin::Opaque;
    }
}

/// Recompute every texture coordinate array of `geometry` from the current layers
///
/// Body vertices are regenerated from their grid position; skirt vertices copy
/// the coordinates of the vertex they hang from.
pub fn refresh_tex_coords(
    geometry: &mut TerrainGeometry,
    master: &Arc<Locator>,
    layers: &[Arc<ColorSource>],
) {
    let tex_plan = TexCoordPlan::new(master, layers);
    let grid = SamplingPlan::new(geometry.columns, geometry.rows, 1.0);
    let vertex_count = geometry.vertices.len();

    let mut arrays: Vec<Vec<Vec2>> = vec![vec![Vec2::ZERO; vertex_count]; tex_plan.array_count()];

    for row in 0..geometry.rows {
        for column in 0..geometry.columns {
            let Some(vertex) = geometry.grid_indices[row * geometry.columns + column] else {
                continue;
            };
            let ndc = grid_ndc(&grid, column, row);
            for (array, coords) in arrays.iter_mut().enumerate() {
                coords[vertex as usize] = tex_plan.tex_coord(array, ndc);
            }
        }
    }

    for skirt in &geometry.skirt_vertices {
        for coords in arrays.iter_mut() {
            coords[skirt.vertex as usize] = coords[skirt.source as usize];
        }
    }

    geometry.tex_coords = arrays;
    geometry.tex_coord_slots = tex_plan.slots().to_vec();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{ContourLayer, ImageLayer, TileImage};
    use crate::extent::Extent;
    use glam::DVec2;

    fn image_layer(width: u32, height: u32, alpha: u8) -> Arc<ColorSource> {
        let image = Arc::new(TileImage::solid(width, height, [200, 200, 200, alpha]));
        Arc::new(ColorSource::from(ImageLayer::new(image)))
    }

    #[test]
    fn test_shared_source_shares_array() {
        let master = Arc::new(Locator::geographic(Extent::new(DVec2::ZERO, DVec2::ONE)));
        let a = image_layer(4, 4, 255);
        let b = image_layer(4, 4, 255);
        let plan = TexCoordPlan::new(&master, &[a.clone(), b, a]);

        assert_eq!(plan.array_count(), 2);
        assert_eq!(plan.slots(), &[0, 1, 0]);
    }

    #[test]
    fn test_layer_locator_remaps_coordinates() {
        let master = Arc::new(Locator::geographic(Extent::new(DVec2::ZERO, DVec2::splat(10.0))));
        let wide = Extent::new(DVec2::ZERO, DVec2::splat(20.0));
        let layer_locator = Arc::new(Locator::geographic(wide));
        let image = Arc::new(TileImage::solid(4, 4, [0, 0, 0, 255]));
        let layer = Arc::new(ColorSource::from(ImageLayer::new(image).with_locator(layer_locator)));

        let plan = TexCoordPlan::new(&master, &[layer]);
        let coord = plan.tex_coord(0, DVec3::new(1.0, 0.5, 0.0));
        assert!((coord - Vec2::new(0.5, 0.25)).length() < 1e-6);
    }

    #[test]
    fn test_geocentric_master_uses_geographic_twin() {
        let extent = Extent::new(DVec2::new(-10.0, -10.0), DVec2::new(10.0, 10.0));
        let master = Arc::new(Locator::geocentric(extent));
        let layer_locator = Arc::new(Locator::geographic(extent));
        let image = Arc::new(TileImage::solid(4, 4, [0, 0, 0, 255]));
        let layer = Arc::new(ColorSource::from(ImageLayer::new(image).with_locator(layer_locator)));

        let plan = TexCoordPlan::new(&master, &[layer]);
        assert_eq!(plan.tex_coord(0, DVec3::new(0.3, 0.7, 0.0)), Vec2::new(0.3, 0.7));
    }

    #[test]
    fn test_npot_image_disables_mipmaps() {
        let layer = image_layer(100, 64, 255);
        let texture = create_texture(&layer, 16.0).unwrap();

        assert_eq!(texture.kind, TextureKind::Texture2D);
        assert_eq!(texture.min_filter, FilterMode::Linear);
        assert_eq!(texture.wrap_s, WrapMode::ClampToEdge);
        assert_eq!(texture.wrap_t, WrapMode::ClampToEdge);
        assert_eq!(texture.max_anisotropy, 16.0);

        let pot = create_texture(&image_layer(64, 64, 255), 8.0).unwrap();
        assert_eq!(pot.min_filter, FilterMode::LinearMipmapLinear);
        assert_eq!(pot.max_anisotropy, 8.0);
    }

    #[test]
    fn test_contour_layer_is_one_dimensional() {
        let ramp = Arc::new(TileImage::solid(16, 1, [255, 0, 0, 255]));
        let layer = ColorSource::from(ContourLayer::new(ramp));
        let texture = create_texture(&layer, 16.0).unwrap();

        assert_eq!(texture.kind, TextureKind::Texture1D);
        assert_eq!(texture.min_filter, FilterMode::Nearest);
    }

    #[test]
    fn test_layer_without_image_keeps_slot() {
        let empty = Arc::new(ColorSource::from(ImageLayer {
            image: None,
            locator: None,
            min_filter: FilterMode::Linear,
            mag_filter: FilterMode::Linear,
        }));
        let layers = vec![empty, image_layer(4, 4, 255)];

        let mut state = TileState::default();
        bind_color_layers(&mut state, &layers, 16.0);

        assert_eq!(state.textures.len(), 2);
        assert!(state.texture(0).is_none());
        assert!(state.texture(1).is_some());
    }

    #[test]
    fn test_shared_source_reuses_texture() {
        let layer = image_layer(4, 4, 255);
        let layers = vec![layer.clone(), layer];

        let mut state = TileState::default();
        bind_color_layers(&mut state, &layers, 16.0);
        assert!(Arc::ptr_eq(state.texture(0).unwrap(), state.texture(1).unwrap()));
    }

    #[test]
    fn test_first_imaged_layer_decides_transparency() {
        let mut state = TileState::default();

        apply_transparency(&mut state, &[image_layer(4, 4, 128), image_layer(4, 4, 255)]);
        assert!(state.blend);
        assert_eq!(state.render_bin, RenderBin::Transparent);

        apply_transparency(&mut state, &[image_layer(4, 4, 255), image_layer(4, 4, 0)]);
        assert!(!state.blend);
        assert_eq!(state.render_bin, RenderBin::Opaque);
    }
}
