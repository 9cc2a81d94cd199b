//! Elevation sources for terrain tiles
//!
//! An elevation source is a regular raster of height samples in the tile's
//! NDC frame: column `0` lies on `x = 0`, column `num_columns - 1` on `x = 1`,
//! and likewise for rows along `y`. Samples can be invalid (no data), which
//! punches holes into the generated mesh.

use std::sync::Arc;

use crate::error::{Result, TerrainError};
use crate::locator::Locator;

/// A grid of height samples with skirt and scale metadata
#[derive(Debug, Clone, PartialEq)]
pub struct HeightField {
    columns: usize,
    rows: usize,
    /// Heights in row-major order (row 0 first)
    data: Vec<f32>,
    /// Sentinel marking missing samples
    no_data_value: Option<f32>,
    skirt_height: f32,
    vertical_scale: Option<f32>,
    locator: Option<Arc<Locator>>,
}

impl HeightField {
    /// Create a flat height field with every sample at zero
    pub fn new(columns: usize, rows: usize) -> Result<Self> {
        Self::from_data(columns, rows, vec![0.0; columns * rows])
    }

    /// Create a height field from existing row-major samples
    ///
    /// Both dimensions must be at least 2 so that every sample maps to a
    /// distinct NDC position.
    pub fn from_data(columns: usize, rows: usize, data: Vec<f32>) -> Result<Self> {
        if columns < 2 || rows < 2 {
            return Err(TerrainError::InvalidHeightField(format!(
                "dimensions must be at least 2x2, got {}x{}",
                columns, rows
            )));
        }
        if data.len() != columns * rows {
            return Err(TerrainError::InvalidHeightField(format!(
                "expected {} samples for {}x{}, got {}",
                columns * rows,
                columns,
                rows,
                data.len()
            )));
        }
        Ok(Self {
            columns,
            rows,
            data,
            no_data_value: None,
            skirt_height: 0.0,
            vertical_scale: None,
            locator: None,
        })
    }

    /// Create a height field by evaluating `f(column, row)` for every sample
    pub fn from_fn<F>(columns: usize, rows: usize, mut f: F) -> Result<Self>
    where
        F: FnMut(usize, usize) -> f32,
    {
        let mut data = Vec::with_capacity(columns * rows);
        for row in 0..rows {
            for column in 0..columns {
                data.push(f(column, row));
            }
        }
        Self::from_data(columns, rows, data)
    }

    /// Mark samples equal to `value` as invalid
    pub fn with_no_data_value(mut self, value: f32) -> Self {
        self.no_data_value = Some(value);
        self
    }

    /// Height of the boundary skirts; zero or negative disables them
    pub fn with_skirt_height(mut self, skirt_height: f32) -> Self {
        self.skirt_height = skirt_height;
        self
    }

    /// Declared vertical exaggeration of this source
    pub fn with_vertical_scale(mut self, scale: f32) -> Self {
        self.vertical_scale = Some(scale);
        self
    }

    pub fn with_locator(mut self, locator: Arc<Locator>) -> Self {
        self.locator = Some(locator);
        self
    }

    pub fn num_columns(&self) -> usize {
        self.columns
    }

    pub fn num_rows(&self) -> usize {
        self.rows
    }

    pub fn skirt_height(&self) -> f32 {
        self.skirt_height
    }

    pub fn set_skirt_height(&mut self, skirt_height: f32) {
        self.skirt_height = skirt_height;
    }

    pub fn vertical_scale(&self) -> Option<f32> {
        self.vertical_scale
    }

    pub fn locator(&self) -> Option<&Arc<Locator>> {
        self.locator.as_ref()
    }

    /// Raw sample at a grid position, valid or not
    pub fn get(&self, column: usize, row: usize) -> Option<f32> {
        if column < self.columns && row < self.rows {
            Some(self.data[row * self.columns + column])
        } else {
            None
        }
    }

    /// Set the sample at a grid position; out-of-range writes are ignored
    pub fn set(&mut self, column: usize, row: usize, value: f32) {
        if column < self.columns && row < self.rows {
            self.data[row * self.columns + column] = value;
        }
    }

    /// Sample at a grid position if it holds valid data
    ///
    /// Out-of-range positions, NaN and the no-data sentinel are invalid.
    pub fn valid_value(&self, column: usize, row: usize) -> Option<f32> {
        let value = self.get(column, row)?;
        if value.is_nan() || self.no_data_value == Some(value) {
            None
        } else {
            Some(value)
        }
    }
}

/// Elevation data attached to a tile
#[derive(Debug, Clone, PartialEq)]
pub enum ElevationSource {
    HeightField(HeightField),
}

impl ElevationSource {
    pub fn num_columns(&self) -> usize {
        match self {
            ElevationSource::HeightField(hf) => hf.num_columns(),
        }
    }

    pub fn num_rows(&self) -> usize {
        match self {
            ElevationSource::HeightField(hf) => hf.num_rows(),
        }
    }

    /// Height at a native grid position, or `None` for missing data
    pub fn valid_value(&self, column: usize, row: usize) -> Option<f32> {
        match self {
            ElevationSource::HeightField(hf) => hf.valid_value(column, row),
        }
    }

    pub fn skirt_height(&self) -> f32 {
        match self {
            ElevationSource::HeightField(hf) => hf.skirt_height(),
        }
    }

    pub fn vertical_scale(&self) -> Option<f32> {
        match self {
            ElevationSource::HeightField(hf) => hf.vertical_scale(),
        }
    }

    pub fn locator(&self) -> Option<&Arc<Locator>> {
        match self {
            ElevationSource::HeightField(hf) => hf.locator(),
        }
    }
}

impl From<HeightField> for ElevationSource {
    fn from(hf: HeightField) -> Self {
        ElevationSource::HeightField(hf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_height_field_creation() {
        let hf = HeightField::new(10, 8).unwrap();
        assert_eq!(hf.num_columns(), 10);
        assert_eq!(hf.num_rows(), 8);
        assert_eq!(hf.skirt_height(), 0.0);
        assert_eq!(hf.vertical_scale(), None);
        assert!(hf.locator().is_none());
    }

    #[test]
    fn test_rejects_mismatched_data() {
        let err = HeightField::from_data(3, 3, vec![0.0; 8]).unwrap_err();
        assert!(matches!(err, TerrainError::InvalidHeightField(_)));
    }

    #[test]
    fn test_rejects_degenerate_dimensions() {
        assert!(HeightField::new(1, 5).is_err());
        assert!(HeightField::new(5, 0).is_err());
    }

    #[test]
    fn test_get_set() {
        let mut hf = HeightField::new(4, 4).unwrap();
        hf.set(2, 3, 100.0);
        assert_eq!(hf.get(2, 3), Some(100.0));
        assert_eq!(hf.get(0, 0), Some(0.0));
        assert_eq!(hf.get(4, 0), None);

        // Out of range writes are ignored
        hf.set(10, 10, 5.0);
    }

    #[test]
    fn test_from_fn_is_row_major() {
        let hf = HeightField::from_fn(3, 2, |c, r| (r * 10 + c) as f32).unwrap();
        assert_eq!(hf.get(2, 0), Some(2.0));
        assert_eq!(hf.get(0, 1), Some(10.0));
    }

    #[test]
    fn test_validity() {
        let mut hf = HeightField::new(3, 3).unwrap().with_no_data_value(-9999.0);
        hf.set(1, 1, -9999.0);
        hf.set(2, 2, f32::NAN);

        assert_eq!(hf.valid_value(0, 0), Some(0.0));
        assert_eq!(hf.valid_value(1, 1), None);
        assert_eq!(hf.valid_value(2, 2), None);
        assert_eq!(hf.valid_value(3, 0), None);
    }

    #[test]
    fn test_source_dispatch() {
        let source = ElevationSource::from(
            HeightField::from_fn(5, 4, |c, _| c as f32)
                .unwrap()
                .with_skirt_height(5.0)
                .with_vertical_scale(2.0),
        );
        assert_eq!(source.num_columns(), 5);
        assert_eq!(source.num_rows(), 4);
        assert_eq!(source.valid_value(3, 1), Some(3.0));
        assert_eq!(source.skirt_height(), 5.0);
        assert_eq!(source.vertical_scale(), Some(2.0));
    }
}
