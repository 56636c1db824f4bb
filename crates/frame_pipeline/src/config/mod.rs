//! Configuration system
//!
//! Renderer settings load from TOML or RON, chosen by file extension.

use std::path::Path;

pub use serde::{Deserialize, Serialize};

use crate::render::api::DepthBias;
use crate::scene::DEFAULT_LOD_THRESHOLDS;

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;

        match extension(path) {
            Some("toml") => toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
            Some("ron") => ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = match extension(path) {
            Some("toml") => toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?,
            Some("ron") => ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?,
            _ => return Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        };

        std::fs::write(path, contents)?;
        Ok(())
    }
}

fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|e| e.to_str())
}

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

    /// Values that parse but cannot drive the renderer
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Shadow map settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowSettings {
    /// Square shadow map resolution, independent of the window
    pub map_size: u32,
    /// Depth bias applied while rendering the shadow map
    pub bias: DepthBias,
    /// World units added around the scene bounds when fitting the light projection
    pub ortho_padding: f32,
    /// Near plane of point-light shadow projections
    pub point_near: f32,
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self {
            map_size: 2048,
            bias: DepthBias::default(),
            ortho_padding: 1.0,
            point_near: 0.1,
        }
    }
}

/// Tone mapping applied by the post-processing pass
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostSettings {
    /// Linear exposure multiplier
    pub exposure: f32,
    /// Display gamma
    pub gamma: f32,
}

impl Default for PostSettings {
    fn default() -> Self {
        Self { exposure: 1.0, gamma: 2.2 }
    }
}

/// Top-level renderer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Initial framebuffer width
    pub width: u32,
    /// Initial framebuffer height
    pub height: u32,
    /// Scene clear color (RGBA)
    pub clear_color: [f32; 4],
    /// Distance bands for LOD selection, ascending
    pub lod_thresholds: Vec<f32>,
    /// Test batches against the camera frustum
    pub frustum_culling: bool,
    /// Draw the reference grid
    pub grid: bool,
    /// Draw light markers
    pub debug_lights: bool,
    /// Shadow map settings
    pub shadows: ShadowSettings,
    /// Tone mapping settings
    pub post: PostSettings,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            clear_color: [0.05, 0.05, 0.08, 1.0],
            lod_thresholds: DEFAULT_LOD_THRESHOLDS.to_vec(),
            frustum_culling: true,
            grid: false,
            debug_lights: false,
            shadows: ShadowSettings::default(),
            post: PostSettings::default(),
        }
    }
}

impl Config for RendererConfig {}

impl RendererConfig {
    /// Reject values the renderer cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::Invalid(format!("window size {}x{}", self.width, self.height)));
        }
        if self.shadows.map_size == 0 {
            return Err(ConfigError::Invalid("shadow map size 0".to_string()));
        }
        if self.lod_thresholds.iter().any(|t| !t.is_finite() || *t < 0.0) {
            return Err(ConfigError::Invalid(format!("LOD thresholds {:?}", self.lod_thresholds)));
        }
        if self.lod_thresholds.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ConfigError::Invalid(format!(
                "LOD thresholds must be strictly ascending: {:?}",
                self.lod_thresholds
            )));
        }
        if self.post.gamma <= 0.0 || self.post.exposure <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "exposure {} / gamma {}",
                self.post.exposure, self.post.gamma
            )));
        }
        Ok(())
    }
}
