//! Terrain technique: builds and publishes a tile's renderable data
//!
//! The technique owns the double buffer of one [`TerrainTile`]. Builders
//! ([`TerrainTechnique::init`] and [`TerrainTechnique::update_content`]) are
//! serialized by a writer mutex and hold the tile's layer read lock while they
//! run; traversal entry points only fetch the published node.

use glam::DVec3;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, trace, warn};

use crate::binder::{apply_transparency, bind_color_layers, refresh_tex_coords, TexCoordPlan};
use crate::buffer::{DoubleBuffer, RenderGroup, TileNode, TileTransform};
use crate::config::TerrainOptions;
use crate::error::{Result, TerrainError};
use crate::locator::{same_locator, Locator};
use crate::mesh::{self, BuildStats, MeshInput, TerrainGeometry};
use crate::sampling::{resolve_vertical_scale, SamplingPlan};
use crate::texture::TileState;
use crate::tile::{TerrainTile, TileLayers};

/// Callback receiving every fully regenerated geometry, e.g. to build a
/// spatial index for intersection queries
pub type SpatialIndexHook = Arc<dyn Fn(&TerrainGeometry) + Send + Sync>;

enum UpdateOutcome {
    Built(Option<BuildStats>),
    Regenerate,
}

pub struct TerrainTechnique {
    tile: Arc<TerrainTile>,
    options: TerrainOptions,
    buffers: DoubleBuffer,
    writer: Mutex<()>,
    vertical_scale_override: Option<f32>,
    master_locator: Option<Arc<Locator>>,
    spatial_index_hook: Option<SpatialIndexHook>,
}

impl TerrainTechnique {
    pub fn new(tile: Arc<TerrainTile>, options: TerrainOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            tile,
            options,
            buffers: DoubleBuffer::new(),
            writer: Mutex::new(()),
            vertical_scale_override: None,
            master_locator: None,
            spatial_index_hook: None,
        })
    }

    pub fn tile(&self) -> &Arc<TerrainTile> {
        &self.tile
    }

    pub fn options(&self) -> &TerrainOptions {
        &self.options
    }

    pub fn buffers(&self) -> &DoubleBuffer {
        &self.buffers
    }

    /// Vertical scale used instead of the elevation source's declared scale
    pub fn set_vertical_scale_override(&mut self, scale: Option<f32>) {
        self.vertical_scale_override = scale;
    }

    /// Projection used instead of the one derived from the tile's layers
    pub fn set_master_locator(&mut self, locator: Option<Arc<Locator>>) {
        self.master_locator = locator;
    }

    pub fn set_spatial_index_hook(&mut self, hook: Option<SpatialIndexHook>) {
        self.spatial_index_hook = hook;
    }

    /// Fully regenerate the tile and publish the result
    ///
    /// Returns `None` when nothing could be built because no usable master
    /// locator is available; the previously published node (if any) stays visible.
    pub fn init(&self) -> Option<BuildStats> {
        match self.try_init() {
            Ok(stats) => Some(stats),
            Err(err) => {
                warn!(tile = %self.tile.id(), error = %err, "Tile not built");
                None
            }
        }
    }

    /// Like [`init`](Self::init), reporting why nothing was built
    pub fn try_init(&self) -> Result<BuildStats> {
        let _writer = self.writer.lock();
        let layers = self.tile.layers();
        self.tile.set_dirty(false);

        let master = self
            .compute_master_locator(&layers)
            .ok_or(TerrainError::MissingLocator)?;
        if !master.is_valid() {
            return Err(TerrainError::InvalidLocator(*master.extent()));
        }

        let center = self.compute_center_model(&master, &layers);
        let elevation = layers.elevation.as_ref();
        let input = MeshInput {
            master: &master,
            center,
            elevation,
            plan: self.sampling_plan(&layers),
            vertical_scale: self.vertical_scale(&layers),
        };

        let geometry = mesh::generate(&input, &TexCoordPlan::new(&master, &layers.colors));
        if let Some(hook) = &self.spatial_index_hook {
            hook(&geometry);
        }

        let mut state = TileState::default();
        bind_color_layers(&mut state, &layers.colors, self.options.max_anisotropy);
        apply_transparency(&mut state, &layers.colors);

        let stats = geometry.stats();
        self.buffers.commit(TileNode {
            transform: TileTransform::from_center(center),
            group: RenderGroup { geometry, state },
        });

        debug!(
            tile = %self.tile.id(),
            body_vertices = stats.body_vertices,
            skirt_vertices = stats.skirt_vertices,
            triangles = stats.triangles,
            "Built terrain tile"
        );
        Ok(stats)
    }

    /// Refresh the published tile in place
    ///
    /// Works on a deep copy of the read buffer: a geometry update repositions
    /// vertices and refreshes color layers, a texture update only refreshes
    /// color layers. Falls back to [`init`](Self::init) when the sampling grid
    /// changed. Returns `None` if nothing has been published yet.
    pub fn update_content(
        &self,
        update_geometry: bool,
        update_textures: bool,
    ) -> Option<BuildStats> {
        match self.try_update_content(update_geometry, update_textures) {
            UpdateOutcome::Built(stats) => stats,
            UpdateOutcome::Regenerate => self.init(),
        }
    }

    fn try_update_content(&self, update_geometry: bool, update_textures: bool) -> UpdateOutcome {
        if !update_geometry && !update_textures {
            return UpdateOutcome::Built(None);
        }

        let _writer = self.writer.lock();
        let layers = self.tile.layers();

        let Some(mut node) = self.buffers.clone_read() else {
            trace!(tile = %self.tile.id(), "Nothing published yet; update skipped");
            return UpdateOutcome::Built(None);
        };

        let Some(master) = self.compute_master_locator(&layers) else {
            warn!(tile = %self.tile.id(), "No master locator; tile not updated");
            return UpdateOutcome::Built(None);
        };
        if !master.is_valid() {
            warn!(
                tile = %self.tile.id(),
                extent = ?master.extent(),
                "Invalid master locator; tile not updated"
            );
            return UpdateOutcome::Built(None);
        }

        if update_geometry {
            let input = MeshInput {
                master: &master,
                center: node.transform.center,
                elevation: layers.elevation.as_ref(),
                plan: self.sampling_plan(&layers),
                vertical_scale: self.vertical_scale(&layers),
            };
            if !mesh::update(&mut node.group.geometry, &input) {
                return UpdateOutcome::Regenerate;
            }
        }

        refresh_tex_coords(&mut node.group.geometry, &master, &layers.colors);
        bind_color_layers(&mut node.group.state, &layers.colors, self.options.max_anisotropy);
        apply_transparency(&mut node.group.state, &layers.colors);

        let stats = node.group.geometry.stats();
        self.buffers.commit(node);

        debug!(tile = %self.tile.id(), update_geometry, update_textures, "Updated terrain tile");
        UpdateOutcome::Built(Some(stats))
    }

    /// Update traversal: rebuild if the tile is dirty
    pub fn on_update(&self) -> Option<BuildStats> {
        if self.tile.is_dirty() {
            self.init()
        } else {
            None
        }
    }

    /// Cull traversal: the node to render, if any
    pub fn on_cull(&self) -> Option<Arc<TileNode>> {
        self.buffers.read()
    }

    /// Intersection traversal: rebuild if dirty, then run `f` on the published node
    pub fn on_intersect<R>(&self, f: impl FnOnce(&TileNode) -> R) -> Option<R> {
        if self.tile.is_dirty() {
            self.init();
        }
        self.buffers.read().map(|node| f(&node))
    }

    /// Projection the tile is tessellated in
    ///
    /// The explicit override wins, then the elevation locator, then the
    /// locator of the first color layer.
    pub fn compute_master_locator(&self, layers: &TileLayers) -> Option<Arc<Locator>> {
        self.master_locator
            .clone()
            .or_else(|| layers.elevation.as_ref().and_then(|e| e.locator().cloned()))
            .or_else(|| layers.colors.first().and_then(|c| c.locator().cloned()))
    }

    /// Model-space center of the elevation and first color layer footprints
    pub fn compute_center_model(&self, master: &Arc<Locator>, layers: &TileLayers) -> DVec3 {
        let mut min = DVec3::new(f64::MAX, f64::MAX, 0.0);
        let mut max = DVec3::new(-f64::MAX, -f64::MAX, 0.0);

        if let Some(elevation) = &layers.elevation {
            expand_local_bounds(master, elevation.locator(), &mut min, &mut max);
        }
        if let Some(color) = layers.colors.first() {
            expand_local_bounds(master, color.locator(), &mut min, &mut max);
        }
        if min.x > max.x || min.y > max.y {
            min = DVec3::ZERO;
            max = DVec3::new(1.0, 1.0, 0.0);
        }

        debug!(bottom_left = ?min, top_right = ?max, "Tile NDC bounds");

        master.local_to_model((min + max) * 0.5)
    }

    fn sampling_plan(&self, layers: &TileLayers) -> SamplingPlan {
        SamplingPlan::for_source(
            layers.elevation.as_ref(),
            self.options.sample_ratio,
            self.options.default_grid_size,
        )
    }

    fn vertical_scale(&self, layers: &TileLayers) -> f32 {
        let declared = layers.elevation.as_ref().and_then(|e| e.vertical_scale());
        resolve_vertical_scale(self.vertical_scale_override, declared)
    }
}

/// Grow `min`/`max` by a layer footprint; layers in the master projection span NDC 0..1
fn expand_local_bounds(
    master: &Arc<Locator>,
    layer: Option<&Arc<Locator>>,
    min: &mut DVec3,
    max: &mut DVec3,
) {
    match layer {
        Some(locator) if !same_locator(locator, master) => {
            master.compute_local_bounds(locator, min, max);
        }
        _ => {
            min.x = min.x.min(0.0);
            min.y = min.y.min(0.0);
            max.x = max.x.max(1.0);
            max.y = max.y.max(1.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{ColorSource, ImageLayer, TileImage};
    use crate::elevation::HeightField;
    use crate::extent::Extent;
    use crate::tile::TileId;
    use glam::DVec2;

    fn projected(min: f64, max: f64) -> Arc<Locator> {
        Arc::new(Locator::projected(Extent::new(DVec2::splat(min), DVec2::splat(max))))
    }

    fn technique(layers: TileLayers) -> TerrainTechnique {
        let tile = Arc::new(TerrainTile::new(TileId::default(), layers));
        TerrainTechnique::new(tile, TerrainOptions::default()).unwrap()
    }

    #[test]
    fn test_rejects_invalid_options() {
        let tile = Arc::new(TerrainTile::new(TileId::default(), TileLayers::default()));
        let options = TerrainOptions {
            sample_ratio: 0.0,
            ..TerrainOptions::default()
        };
        assert!(TerrainTechnique::new(tile, options).is_err());
    }

    #[test]
    fn test_master_locator_priority() {
        let elevation_locator = projected(0.0, 1.0);
        let color_locator = projected(0.0, 2.0);
        let image = Arc::new(TileImage::solid(2, 2, [0, 0, 0, 255]));

        let layers = TileLayers {
            elevation: Some(
                HeightField::new(2, 2)
                    .unwrap()
                    .with_locator(elevation_locator.clone())
                    .into(),
            ),
            colors: vec![Arc::new(ColorSource::from(
                ImageLayer::new(image).with_locator(color_locator.clone()),
            ))],
        };
        let mut technique = technique(layers.clone());
        let master = technique.compute_master_locator(&layers).unwrap();
        assert!(Arc::ptr_eq(&master, &elevation_locator));

        let without_elevation = TileLayers {
            elevation: None,
            ..layers.clone()
        };
        assert!(Arc::ptr_eq(
            &technique.compute_master_locator(&without_elevation).unwrap(),
            &color_locator
        ));

        let explicit = projected(5.0, 6.0);
        technique.set_master_locator(Some(explicit.clone()));
        assert!(Arc::ptr_eq(&technique.compute_master_locator(&layers).unwrap(), &explicit));

        assert!(technique.compute_master_locator(&TileLayers::default()).is_some());
    }

    #[test]
    fn test_center_of_single_layer_is_extent_center() {
        let locator = projected(0.0, 10.0);
        let layers = TileLayers {
            elevation: Some(HeightField::new(2, 2).unwrap().with_locator(locator.clone()).into()),
            colors: Vec::new(),
        };
        let technique = technique(layers.clone());
        assert_eq!(technique.compute_center_model(&locator, &layers), DVec3::new(5.0, 5.0, 0.0));
    }

    #[test]
    fn test_center_covers_larger_color_layer() {
        let master = projected(0.0, 10.0);
        let image = Arc::new(TileImage::solid(2, 2, [0, 0, 0, 255]));
        let layers = TileLayers {
            elevation: Some(HeightField::new(2, 2).unwrap().with_locator(master.clone()).into()),
            colors: vec![Arc::new(ColorSource::from(
                ImageLayer::new(image).with_locator(projected(0.0, 20.0)),
            ))],
        };
        let technique = technique(layers.clone());
        assert_eq!(technique.compute_center_model(&master, &layers), DVec3::new(10.0, 10.0, 0.0));
    }

    #[test]
    fn test_missing_locator_publishes_nothing() {
        let technique = technique(TileLayers {
            elevation: Some(HeightField::new(4, 4).unwrap().into()),
            colors: Vec::new(),
        });
        assert!(matches!(technique.try_init(), Err(TerrainError::MissingLocator)));
        assert!(technique.init().is_none());
        assert!(technique.on_cull().is_none());
    }

    #[test]
    fn test_degenerate_master_extent_is_rejected() {
        let flat = Arc::new(Locator::projected(Extent::new(DVec2::ZERO, DVec2::new(0.0, 3.0))));
        let technique = technique(TileLayers {
            elevation: Some(HeightField::new(4, 4).unwrap().with_locator(flat).into()),
            colors: Vec::new(),
        });
        assert!(matches!(technique.try_init(), Err(TerrainError::InvalidLocator(_))));
        assert!(technique.on_cull().is_none());
        assert!(!technique.tile().is_dirty());
    }

    #[test]
    fn test_update_before_init_is_noop() {
        let locator = projected(0.0, 1.0);
        let technique = technique(TileLayers {
            elevation: Some(HeightField::new(4, 4).unwrap().with_locator(locator).into()),
            colors: Vec::new(),
        });
        assert!(technique.update_content(true, true).is_none());
        assert!(technique.on_cull().is_none());
    }

    #[test]
    fn test_vertical_scale_override() {
        let locator = projected(0.0, 1.0);
        let layers = TileLayers {
            elevation: Some(
                HeightField::new(2, 2)
                    .unwrap()
                    .with_vertical_scale(2.0)
                    .with_locator(locator)
                    .into(),
            ),
            colors: Vec::new(),
        };
        let mut technique = technique(layers.clone());
        assert_eq!(technique.vertical_scale(&layers), 2.0);

        technique.set_vertical_scale_override(Some(5.0));
        assert_eq!(technique.vertical_scale(&layers), 5.0);
    }
}
