//! Session configuration loaded from YAML.
//!
//! Every field has a default, so a config file only needs the values it
//! changes:
//! ```yaml
//! params:
//!   intensity: 400
//!   sphere_color: "#00ff88"
//! assets:
//!   model: assets/monkey.glb
//! ```

use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::params::SceneParams;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "tinyscene".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

/// Files loaded in the background after the scene is built.
///
/// A missing or unreadable file is reported as a diagnostic and the scene
/// carries on without it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetPaths {
    pub box_texture: Option<PathBuf>,
    /// Six faces in +X, -X, +Y, -Y, +Z, -Z order. Empty disables the skybox.
    pub skybox: Vec<PathBuf>,
    pub model: Option<PathBuf>,
    pub model_offset: Vec3,
}

impl Default for AssetPaths {
    fn default() -> Self {
        let stars = PathBuf::from("assets/stars.jpg");
        Self {
            box_texture: Some(PathBuf::from("assets/nebula.jpg")),
            skybox: vec![
                PathBuf::from("assets/nebula.jpg"),
                stars.clone(),
                stars.clone(),
                stars.clone(),
                stars.clone(),
                stars,
            ],
            model: Some(PathBuf::from("assets/monkey.glb")),
            model_offset: Vec3::new(-12.0, 4.0, 10.0),
        }
    }
}

impl AssetPaths {
    /// No background loads at all.
    pub fn none() -> Self {
        Self {
            box_texture: None,
            skybox: Vec::new(),
            model: None,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub params: SceneParams,
    pub camera_position: Vec3,
    pub camera_target: Vec3,
    pub window: WindowConfig,
    pub assets: AssetPaths,
    /// Seed for the vertex jitter stream.
    pub seed: u64,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            params: SceneParams::default(),
            camera_position: Vec3::new(-10.0, 30.0, 30.0),
            camera_target: Vec3::ZERO,
            window: WindowConfig::default(),
            assets: AssetPaths::default(),
            seed: 0,
        }
    }
}

impl SceneConfig {
    /// Read a YAML config file. Parameter values are clamped to their
    /// declared ranges.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml(&text)?;
        tracing::info!(path = %path.display(), "config loaded");
        Ok(config)
    }

    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yaml::from_str(text)?;
        config.params = config.params.clamped();
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tinyscene_common::Color;

    #[test]
    fn empty_document_is_default() {
        let config = SceneConfig::from_yaml("{}").unwrap();
        assert_eq!(config, SceneConfig::default());
        assert_eq!(config.window.width, 1280);
        assert_eq!(config.assets.model_offset, Vec3::new(-12.0, 4.0, 10.0));
    }

    #[test]
    fn partial_params_keep_other_defaults() {
        let yaml = "params:\n  intensity: 400\n  sphere_color: \"#00ff88\"\n";
        let config = SceneConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.params.intensity, 400.0);
        assert_eq!(config.params.sphere_color, Color::from_hex(0x00ff88));
        assert_eq!(config.params.angle, 0.2);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let config = SceneConfig::from_yaml("params:\n  angle: 7.5\n").unwrap();
        assert_eq!(config.params.angle, 1.0);
    }

    #[test]
    fn yaml_round_trip() {
        let mut config = SceneConfig::default();
        config.assets = AssetPaths::none();
        config.seed = 42;
        let text = config.to_yaml().unwrap();
        assert_eq!(SceneConfig::from_yaml(&text).unwrap(), config);
    }

    #[test]
    fn load_from_disk_and_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.yaml");
        std::fs::write(&path, "seed: 7\nwindow:\n  width: 640\n").unwrap();
        let config = SceneConfig::load(&path).unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.window.width, 640);
        assert_eq!(config.window.height, 720);

        let err = SceneConfig::load(dir.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        assert!(matches!(
            SceneConfig::from_yaml("params: [1, 2"),
            Err(ConfigError::Yaml(_))
        ));
    }
}
