//! Terrain tiles and their source layers

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::color::ColorSource;
use crate::elevation::ElevationSource;

/// Quadtree cell address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TileId {
    pub level: u32,
    pub x: u32,
    pub y: u32,
}

impl TileId {
    pub fn new(level: u32, x: u32, y: u32) -> Self {
        Self { level, x, y }
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.level, self.x, self.y)
    }
}

/// Source data of a tile
#[derive(Debug, Clone, Default)]
pub struct TileLayers {
    pub elevation: Option<ElevationSource>,
    /// Color layers in slot order
    pub colors: Vec<Arc<ColorSource>>,
}

/// A terrain tile: an address, its layers and a dirty flag
///
/// Layers are guarded by a reader-writer lock. Builders hold the read side for
/// the whole build, so sources cannot change under a tessellation pass.
#[derive(Debug)]
pub struct TerrainTile {
    id: TileId,
    layers: RwLock<TileLayers>,
    dirty: AtomicBool,
}

impl TerrainTile {
    /// New tile; it starts dirty so the first traversal builds it
    pub fn new(id: TileId, layers: TileLayers) -> Self {
        Self {
            id,
            layers: RwLock::new(layers),
            dirty: AtomicBool::new(true),
        }
    }

    pub fn id(&self) -> TileId {
        self.id
    }

    pub fn layers(&self) -> RwLockReadGuard<'_, TileLayers> {
        self.layers.read()
    }

    /// Exclusive access to the layers; marks the tile dirty
    pub fn layers_mut(&self) -> RwLockWriteGuard<'_, TileLayers> {
        let guard = self.layers.write();
        self.set_dirty(true);
        guard
    }

    pub fn set_elevation(&self, elevation: Option<ElevationSource>) {
        self.layers_mut().elevation = elevation;
    }

    pub fn set_color_layer(&self, slot: usize, layer: Arc<ColorSource>) {
        let mut layers = self.layers_mut();
        if slot < layers.colors.len() {
            layers.colors[slot] = layer;
        } else {
            layers.colors.push(layer);
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    pub fn set_dirty(&self, dirty: bool) {
        self.dirty.store(dirty, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{ImageLayer, TileImage};
    use crate::elevation::HeightField;

    #[test]
    fn test_new_tile_is_dirty() {
        let tile = TerrainTile::new(TileId::new(3, 4, 5), TileLayers::default());
        assert!(tile.is_dirty());
        assert_eq!(tile.id().to_string(), "3/4/5");
    }

    #[test]
    fn test_layer_edits_mark_dirty() {
        let tile = TerrainTile::new(TileId::default(), TileLayers::default());
        tile.set_dirty(false);

        tile.set_elevation(Some(HeightField::new(2, 2).unwrap().into()));
        assert!(tile.is_dirty());
        assert!(tile.layers().elevation.is_some());
    }

    #[test]
    fn test_set_color_layer_replaces_or_appends() {
        let tile = TerrainTile::new(TileId::default(), TileLayers::default());
        let layer = |rgba| {
            let image = Arc::new(TileImage::solid(1, 1, rgba));
            Arc::new(ColorSource::from(ImageLayer::new(image)))
        };
        let red = layer([255, 0, 0, 255]);
        let blue = layer([0, 0, 255, 255]);

        tile.set_color_layer(0, red);
        tile.set_color_layer(5, blue.clone());
        assert_eq!(tile.layers().colors.len(), 2);

        tile.set_color_layer(0, blue.clone());
        assert!(Arc::ptr_eq(&tile.layers().colors[0], &blue));
    }
}
