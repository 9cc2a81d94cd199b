//! Error types for the terrain crate

use crate::extent::Extent;

/// Errors that can occur while configuring or building terrain tiles
#[derive(Debug, thiserror::Error)]
pub enum TerrainError {
    /// Neither the technique, the elevation layer nor any color layer provides a locator
    #[error("No locator found in any of the terrain layers")]
    MissingLocator,

    /// The master locator's extent is empty, inverted or out of range
    #[error("Locator extent {0:?} does not span a valid area")]
    InvalidLocator(Extent),

    /// Height field dimensions or sample data are inconsistent
    #[error("Invalid height field: {0}")]
    InvalidHeightField(String),

    /// Terrain options could not be loaded
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors that can occur while loading [`crate::config::TerrainOptions`]
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The options file could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The options document is not valid TOML for this schema
    #[error("Failed to parse terrain options: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is outside its accepted range
    #[error("Invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Result type for terrain operations
pub type Result<T> = std::result::Result<T, TerrainError>;
