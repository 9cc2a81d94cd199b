//! Terrain-wide tessellation options
//!
//! Options are usually embedded in a larger TOML document; every field has a
//! default so an empty table is valid.
//!
//! ```toml
//! sample_ratio = 0.25
//! max_anisotropy = 8.0
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;

/// Options shared by every tile of a terrain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainOptions {
    /// Fraction of native elevation samples to keep (1.0 = full resolution)
    pub sample_ratio: f32,
    /// Maximum anisotropy applied to color-layer textures
    pub max_anisotropy: f32,
    /// Grid size used for tiles without an elevation layer
    pub default_grid_size: usize,
}

impl Default for TerrainOptions {
    fn default() -> Self {
        Self {
            sample_ratio: 1.0,
            max_anisotropy: 16.0,
            default_grid_size: 20,
        }
    }
}

impl TerrainOptions {
    /// Parse and validate options from a TOML string
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let options: TerrainOptions = toml::from_str(source)?;
        options.validate()?;
        Ok(options)
    }

    /// Load options from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Check that every value is in range
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.sample_ratio.is_finite() && self.sample_ratio > 0.0) {
            return Err(ConfigError::Invalid {
                field: "sample_ratio",
                reason: format!("must be a positive number, got {}", self.sample_ratio),
            });
        }
        if self.max_anisotropy.is_nan() || self.max_anisotropy < 1.0 {
            return Err(ConfigError::Invalid {
                field: "max_anisotropy",
                reason: format!("must be at least 1.0, got {}", self.max_anisotropy),
            });
        }
        if self.default_grid_size < 2 {
            return Err(ConfigError::Invalid {
                field: "default_grid_size",
                reason: format!("must be at least 2, got {}", self.default_grid_size),
            });
        }
        Ok(())
    }
}
