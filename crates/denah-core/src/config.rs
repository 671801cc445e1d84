//! Engine configuration: camera limits, snapping, hit radii and label steps.

use crate::camera::CameraConfig;
use crate::dimension::DimensionConfig;
use crate::selection::HitConfig;
use crate::snap::SnapConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// All tunables of the engine. Missing sections and fields take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub camera: CameraConfig,
    pub snap: SnapConfig,
    pub hit: HitConfig,
    pub dimension: DimensionConfig,
}

impl EngineConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
        let config = Self::from_json(&json)?;
        log::info!("loaded engine config from {}", path.display());
        Ok(config)
    }

    pub fn to_json(&self) -> ConfigResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> ConfigResult<()> {
        let camera = &self.camera;
        if !(camera.min_zoom > 0.0 && camera.min_zoom < camera.max_zoom) {
            return Err(ConfigError::Invalid(format!(
                "zoom range must satisfy 0 < min < max, got {}..{}",
                camera.min_zoom, camera.max_zoom
            )));
        }
        if camera.viewport_width <= 0.0 || camera.viewport_height <= 0.0 {
            return Err(ConfigError::Invalid("viewport must have a positive size".to_string()));
        }

        let snap = &self.snap;
        if snap.grid_spacing <= 0.0 || snap.height_step <= 0.0 {
            return Err(ConfigError::Invalid("grid spacing and height step must be positive".to_string()));
        }
        if !(snap.lock_radius_px > 0.0
            && snap.lock_radius_px < snap.release_radius_px
            && snap.release_radius_px <= snap.hover_radius_px)
        {
            return Err(ConfigError::Invalid(format!(
                "magnet radii must satisfy 0 < lock < release <= hover, got {}/{}/{}",
                snap.lock_radius_px, snap.release_radius_px, snap.hover_radius_px
            )));
        }

        let hit = &self.hit;
        if hit.hover_radius_px <= 0.0 || hit.select_radius_px <= 0.0 || hit.label_radius_px <= 0.0 {
            return Err(ConfigError::Invalid("hit radii must be positive".to_string()));
        }

        let dimension = &self.dimension;
        if dimension.offset_step_px <= 0.0 || dimension.coarse_factor <= 0.0 || dimension.fine_divisor <= 0.0 {
            return Err(ConfigError::Invalid("dimension steps must be positive".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.snap.lock_radius_px, 12.0);
        assert_eq!(config.snap.release_radius_px, 16.0);
        assert_eq!(config.snap.hover_radius_px, 24.0);
        assert_eq!(config.camera.max_zoom, 8.0);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config = EngineConfig::from_json(r#"{ "snap": { "grid_spacing": 50.0 } }"#).unwrap();
        assert_eq!(config.snap.grid_spacing, 50.0);
        assert_eq!(config.snap.height_step, 25.0);
        assert_eq!(config.hit, HitConfig::default());
    }

    #[test]
    fn test_rejects_bad_radii() {
        let err = EngineConfig::from_json(r#"{ "snap": { "lock_radius_px": 20.0 } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_bad_zoom() {
        let err = EngineConfig::from_json(r#"{ "camera": { "min_zoom": 4.0, "max_zoom": 2.0 } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_parse_error() {
        let err = EngineConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "dimension": {{ "offset_step_px": 4.0 }} }}"#).unwrap();

        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config.dimension.offset_step_px, 4.0);
        assert_eq!(config.dimension.coarse_factor, 5.0);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = EngineConfig::load(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_json_roundtrip_keeps_values() {
        let mut config = EngineConfig::default();
        config.snap.enabled = false;
        let back = EngineConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(back, config);
    }
}
