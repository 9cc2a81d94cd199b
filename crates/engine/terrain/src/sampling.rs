//! Sampling plan: how many grid cells a tile is tessellated with
//!
//! The effective grid is derived from the elevation raster's native size and
//! the terrain's sample ratio. When undersampling, each effective index is
//! remapped to a native raster index with `floor(index * factor)`.

use crate::elevation::ElevationSource;

/// Smallest grid edge produced when resampling
pub const MIN_GRID_SIZE: usize = 4;

/// Effective tessellation grid of a tile
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingPlan {
    pub columns: usize,
    pub rows: usize,
    /// Native columns per effective column
    pub column_factor: f64,
    /// Native rows per effective row
    pub row_factor: f64,
    resampled: bool,
}

impl SamplingPlan {
    /// Plan a grid for a native `columns x rows` raster
    ///
    /// A ratio of exactly 1.0 keeps the native grid and skips index remapping.
    pub fn new(native_columns: usize, native_rows: usize, sample_ratio: f32) -> Self {
        if sample_ratio == 1.0 {
            return Self::direct(native_columns, native_rows);
        }

        let scale = sample_ratio.sqrt();
        let columns = ((native_columns as f32 * scale) as usize).max(MIN_GRID_SIZE);
        let rows = ((native_rows as f32 * scale) as usize).max(MIN_GRID_SIZE);

        Self {
            columns,
            rows,
            column_factor: (native_columns as f64 - 1.0) / (columns as f64 - 1.0),
            row_factor: (native_rows as f64 - 1.0) / (rows as f64 - 1.0),
            resampled: true,
        }
    }

    /// Plan for a tile, falling back to a flat `default_size` grid without elevation
    pub fn for_source(
        elevation: Option<&ElevationSource>,
        sample_ratio: f32,
        default_size: usize,
    ) -> Self {
        match elevation {
            Some(source) => Self::new(source.num_columns(), source.num_rows(), sample_ratio),
            None => Self::direct(default_size, default_size),
        }
    }

    fn direct(columns: usize, rows: usize) -> Self {
        Self {
            columns,
            rows,
            column_factor: 1.0,
            row_factor: 1.0,
            resampled: false,
        }
    }

    /// Whether effective indices are remapped into the native raster
    pub fn is_resampled(&self) -> bool {
        self.resampled
    }

    /// Number of grid cells (`columns * rows`)
    pub fn cell_count(&self) -> usize {
        self.columns * self.rows
    }

    /// Native raster index for an effective grid position
    pub fn native_index(&self, column: usize, row: usize) -> (usize, usize) {
        if !self.resampled {
            return (column, row);
        }
        (
            (column as f64 * self.column_factor) as usize,
            (row as f64 * self.row_factor) as usize,
        )
    }
}

/// Resolve the vertical scale applied to elevation samples
///
/// An explicit per-tile override wins, then the scale declared by the
/// elevation source, then 1.0.
pub fn resolve_vertical_scale(override_scale: Option<f32>, declared_scale: Option<f32>) -> f32 {
    override_scale.or(declared_scale).unwrap_or(1.0)
}
