//! Compiler configuration
//!
//! Settings load from and save to `.toml` or `.ron` files through the
//! [`Config`] trait; the file extension picks the format.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Default triangle count at or below which subdivision stops.
pub const DEFAULT_TRIANGLE_RECURSION_THRESHOLD: u32 = 5000;

/// Smallest accepted triangle recursion threshold.
pub const MIN_TRIANGLE_RECURSION_THRESHOLD: u32 = 50;

/// Default distance a split plane may be shifted to avoid splitting a triangle.
pub const DEFAULT_MAX_OVERGROWTH: f32 = 10.0;

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let format = Format::from_path(path)?;
        let contents = std::fs::read_to_string(path)?;

        match format {
            Format::Toml => {
                toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
            }
            Format::Ron => ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = match Format::from_path(path)? {
            Format::Toml => {
                toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
            }
            Format::Ron => ron::ser::to_string_pretty(self, Default::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?,
        };

        std::fs::write(path, contents)?;
        Ok(())
    }
}

enum Format {
    Toml,
    Ron,
}

impl Format {
    fn from_path(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(Format::Toml),
            Some("ron") => Ok(Format::Ron),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }
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
}

/// How compiled geometry is lit, which decides how leaf triangles are grouped into meshes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LightingType {
    /// One mesh per leaf holding every triangle
    #[default]
    PerPixel,
    /// One mesh per distinct lightmap in each leaf
    Lightmap,
}

/// Tunables of the ABT compiler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Subdivision stops once a node holds this many triangles or fewer
    #[serde(deserialize_with = "deserialize_threshold")]
    triangle_recursion_threshold: u32,
    /// Maximum distance a split plane may move to avoid splitting a triangle
    pub max_overgrowth: f32,
    /// How leaf triangles are grouped into meshes
    pub lighting_type: LightingType,
    /// Run degenerate triangle removal on the soup before subdividing
    pub remove_degenerate_triangles: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            triangle_recursion_threshold: DEFAULT_TRIANGLE_RECURSION_THRESHOLD,
            max_overgrowth: DEFAULT_MAX_OVERGROWTH,
            lighting_type: LightingType::PerPixel,
            remove_degenerate_triangles: true,
        }
    }
}

impl Config for CompilerConfig {}

impl CompilerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn triangle_recursion_threshold(&self) -> u32 {
        self.triangle_recursion_threshold
    }

    /// Sets the recursion threshold, clamped to at least [`MIN_TRIANGLE_RECURSION_THRESHOLD`].
    pub fn set_triangle_recursion_threshold(&mut self, threshold: u32) {
        self.triangle_recursion_threshold = clamp_threshold(threshold);
    }

    /// Builder form of [`CompilerConfig::set_triangle_recursion_threshold`].
    pub fn with_triangle_recursion_threshold(mut self, threshold: u32) -> Self {
        self.set_triangle_recursion_threshold(threshold);
        self
    }

    pub fn with_max_overgrowth(mut self, max_overgrowth: f32) -> Self {
        self.max_overgrowth = max_overgrowth;
        self
    }

    pub fn with_lighting_type(mut self, lighting_type: LightingType) -> Self {
        self.lighting_type = lighting_type;
        self
    }

    pub fn with_remove_degenerate_triangles(mut self, remove: bool) -> Self {
        self.remove_degenerate_triangles = remove;
        self
    }
}

fn clamp_threshold(threshold: u32) -> u32 {
    threshold.max(MIN_TRIANGLE_RECURSION_THRESHOLD)
}

fn deserialize_threshold<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    u32::deserialize(deserializer).map(clamp_threshold)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = CompilerConfig::default();
        assert_eq!(config.triangle_recursion_threshold(), 5000);
        assert_eq!(config.max_overgrowth, 10.0);
        assert_eq!(config.lighting_type, LightingType::PerPixel);
        assert!(config.remove_degenerate_triangles);
    }

    #[test]
    fn threshold_is_clamped() {
        let mut config = CompilerConfig::new().with_triangle_recursion_threshold(10);
        assert_eq!(config.triangle_recursion_threshold(), 50);

        config.set_triangle_recursion_threshold(51);
        assert_eq!(config.triangle_recursion_threshold(), 51);
    }

    #[test]
    fn toml_fills_missing_fields_and_clamps() {
        let config: CompilerConfig = toml::from_str(
            r#"
            triangle_recursion_threshold = 3
            lighting_type = "lightmap"
            "#,
        )
        .unwrap();

        assert_eq!(config.triangle_recursion_threshold(), 50);
        assert_eq!(config.lighting_type, LightingType::Lightmap);
        assert_eq!(config.max_overgrowth, 10.0);
    }

    #[test]
    fn ron_round_trip() {
        let config = CompilerConfig::new()
            .with_max_overgrowth(2.5)
            .with_lighting_type(LightingType::Lightmap)
            .with_remove_degenerate_triangles(false);

        let text = ron::to_string(&config).unwrap();
        assert!(text.contains("lightmap"));

        let loaded: CompilerConfig = ron::from_str(&text).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = CompilerConfig::load_from_file("compiler.json").unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat(_)));

        let err = CompilerConfig::default().save_to_file("compiler.json").unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat(_)));
    }
}
