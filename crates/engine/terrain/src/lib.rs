//! Terrain tile tessellation for Crossworld
//!
//! This crate turns the elevation and color layers of a single terrain
//! quadtree tile into renderable mesh data: sampled heightfield vertices in
//! model space, triangles split along the flatter diagonal, seam-hiding skirts,
//! smooth normals, and one texture-coordinate set per distinct color source.
//! Results are published through a double buffer so a tile can be rebuilt
//! while the previous version is still being drawn.
//!
//! # Modules
//!
//! - [`coords`]: WGS84 geodetic coordinates and ECEF conversion
//! - [`extent`]: Axis-aligned bounds in a locator's map frame
//! - [`locator`]: Mapping between tile NDC and model coordinates
//! - [`elevation`]: Height fields and elevation sources
//! - [`color`]: Imagery and contour color layers
//! - [`texture`]: Texture and render-state descriptions
//! - [`sampling`]: Tessellation grid planning and vertical scale
//! - [`mesh`]: Mesh generation, incremental updates, skirts and normals
//! - [`binder`]: Color layer texturing and texture coordinates
//! - [`buffer`]: Double-buffered tile output
//! - [`tile`]: Tiles and their layers
//! - [`technique`]: Build and traversal entry points
//! - [`config`]: Tessellation options
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use glam::DVec2;
//! use crossworld_terrain::{
//!     Extent, HeightField, Locator, TerrainOptions, TerrainTechnique, TerrainTile, TileId,
//!     TileLayers,
//! };
//!
//! let locator = Arc::new(Locator::geocentric(Extent::new(DVec2::ZERO, DVec2::ONE)));
//! let heights = HeightField::from_fn(9, 9, |c, r| (c + r) as f32 * 10.0)
//!     .unwrap()
//!     .with_skirt_height(50.0)
//!     .with_locator(locator);
//!
//! let tile = Arc::new(TerrainTile::new(
//!     TileId::new(8, 128, 64),
//!     TileLayers { elevation: Some(heights.into()), colors: Vec::new() },
//! ));
//! let technique = TerrainTechnique::new(tile, TerrainOptions::default()).unwrap();
//!
//! let stats = technique.init().unwrap();
//! assert_eq!(stats.body_vertices, 81);
//! assert!(technique.on_cull().is_some());
//! ```

pub mod binder;
pub mod buffer;
pub mod color;
pub mod config;
pub mod coords;
pub mod elevation;
pub mod error;
pub mod extent;
pub mod locator;
pub mod mesh;
pub mod sampling;
pub mod technique;
pub mod texture;
pub mod tile;

pub use buffer::{BufferData, DoubleBuffer, RenderGroup, TileNode, TileTransform};
pub use color::{ColorSource, ContourLayer, ImageLayer, TileImage};
pub use config::TerrainOptions;
pub use coords::GeoCoord;
pub use elevation::{ElevationSource, HeightField};
pub use error::{ConfigError, Result, TerrainError};
pub use extent::Extent;
pub use locator::{CoordinateSystemType, Locator};
pub use mesh::{BuildStats, Primitive, PrimitiveMode, TerrainGeometry};
pub use sampling::SamplingPlan;
pub use technique::{SpatialIndexHook, TerrainTechnique};
pub use texture::{FilterMode, RenderBin, Texture, TextureKind, TileState, WrapMode};
pub use tile::{TerrainTile, TileId, TileLayers};
