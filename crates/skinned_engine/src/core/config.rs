//! # Engine Configuration
//!
//! Serializable settings for the shadow passes, animation playback and debug
//! overlays, loadable from TOML or RON files.
//!
//! ## Configuration Categories
//!
//! - **Shadow Config**: shadow map resolutions, light frusta and depth bias
//! - **Animation Config**: what happens to freshly loaded objects
//! - **Debug Config**: bounding box and skeleton line overlays

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A value is out of its valid range
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Configuration file format, chosen by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Toml,
    Ron,
}

impl Format {
    fn of(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(Self::Toml),
            Some("ron") => Ok(Self::Ron),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Parse configuration from a string in the format implied by `path`
    fn from_str_for(path: impl AsRef<Path>, contents: &str) -> Result<Self, ConfigError> {
        match Format::of(path.as_ref())? {
            Format::Toml => toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string())),
            Format::Ron => ron::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string())),
        }
    }

    /// Load configuration from file
    fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let format = Format::of(path)?;
        let contents = std::fs::read_to_string(path)?;
        log::debug!("Loading {format:?} configuration from {}", path.display());
        Self::from_str_for(path, &contents)
    }

    /// Save configuration to file
    fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = match Format::of(path)? {
            Format::Toml => toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?,
            Format::Ron => ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?,
        };
        std::fs::write(path, contents)?;
        Ok(())
    }
}

/// # Shadow Configuration
///
/// Resolutions and light frusta for the directional map and the point-light
/// cube atlas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowConfig {
    /// Side of the square directional shadow map in texels
    pub directional_resolution: u32,
    /// Half-width of the sun's orthographic frustum
    pub directional_extent: f32,
    /// Near plane of the sun frustum
    pub directional_near: f32,
    /// Far plane of the sun frustum
    pub directional_far: f32,
    /// Distance from the scene origin at which the sun camera is placed
    pub directional_distance: f32,
    /// Side of one cube-face tile in the point atlas
    pub point_tile_resolution: u32,
    /// Near plane of the cube-face projection
    pub point_near: f32,
    /// Far plane of the cube-face projection
    pub point_far: f32,
    /// Depth bias applied by the main pass when comparing against the maps
    pub depth_bias: f32,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            directional_resolution: 2048,
            directional_extent: 20.0,
            directional_near: 0.1,
            directional_far: 100.0,
            directional_distance: 50.0,
            point_tile_resolution: 512,
            point_near: 0.1,
            point_far: 50.0,
            depth_bias: 0.005,
        }
    }
}

impl ShadowConfig {
    /// Check resolutions and frusta
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.directional_resolution == 0 || self.point_tile_resolution == 0 {
            return Err(ConfigError::Invalid("shadow resolutions must be non-zero".into()));
        }
        if self.directional_extent <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "directional extent must be positive, got {}",
                self.directional_extent
            )));
        }
        let directional_ordered = self.directional_near < self.directional_far;
        if !directional_ordered {
            return Err(ConfigError::Invalid(format!(
                "directional near {} must be below far {}",
                self.directional_near, self.directional_far
            )));
        }
        let point_ordered = self.point_near > 0.0 && self.point_near < self.point_far;
        if !point_ordered {
            return Err(ConfigError::Invalid(format!(
                "point near {} must be in (0, far {})",
                self.point_near, self.point_far
            )));
        }
        if self.depth_bias < 0.0 {
            return Err(ConfigError::Invalid(format!("depth bias {} is negative", self.depth_bias)));
        }
        Ok(())
    }
}

/// # Animation Configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    /// Start the first clip of every object when the scene is loaded
    pub autoplay: bool,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self { autoplay: true }
    }
}

/// # Debug Configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    /// Draw world-space bounding boxes
    pub draw_bounds: bool,
    /// Draw bone segments
    pub draw_skeletons: bool,
}

impl DebugConfig {
    /// Whether any overlay is enabled
    pub fn any(&self) -> bool {
        self.draw_bounds || self.draw_skeletons
    }
}

/// # Engine Configuration
///
/// Top-level configuration handed to the engine context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Log level used when `RUST_LOG` is unset
    pub log_level: String,
    /// Shadow passes
    pub shadows: ShadowConfig,
    /// Animation playback
    pub animation: AnimationConfig,
    /// Debug overlays
    pub debug: DebugConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            shadows: ShadowConfig::default(),
            animation: AnimationConfig::default(),
            debug: DebugConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Set log level
    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Set debug overlays
    #[must_use]
    pub fn with_debug(mut self, debug: DebugConfig) -> Self {
        self.debug = debug;
        self
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.log_level
            .parse::<log::LevelFilter>()
            .map_err(|_| ConfigError::Invalid(format!("unknown log level '{}'", self.log_level)))?;
        self.shadows.validate()
    }
}

impl Config for EngineConfig {}
