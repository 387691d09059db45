use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Engine settings shared by the desktop app and the CLI.
///
/// Every key is optional in the YAML file; absent keys take the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub window: WindowConfig,
    pub projection: ProjectionConfig,
    pub camera: CameraConfig,
    pub clear_color: [f32; 3],
    pub light_position: [f32; 3],
    pub asset_dir: PathBuf,
    /// Static meshes spawned next to the demo shapes.
    pub meshes: Vec<MeshEntry>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            projection: ProjectionConfig::default(),
            camera: CameraConfig::default(),
            clear_color: [0.02, 0.02, 0.04],
            light_position: crate::world::DEFAULT_LIGHT_POSITION.to_array(),
            asset_dir: PathBuf::from("assets"),
            meshes: Vec::new(),
        }
    }
}

impl EngineConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml(&text)?;
        tracing::info!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }
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
            title: "Cinder".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 60.0,
            near: 0.5,
            far: 2000.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Units per second.
    pub move_speed: f32,
    /// Degrees per pixel of mouse movement.
    pub look_sensitivity: f32,
    /// Speed multiplier while shift is held.
    pub boost: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            move_speed: 12.0,
            look_sensitivity: 0.2,
            boost: 5.0,
        }
    }
}

/// A static mesh to spawn: `stem` resolves to `<stem>.obj` and `<stem>.png`
/// under the asset directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshEntry {
    pub name: String,
    pub stem: PathBuf,
    #[serde(default = "default_import_scale")]
    pub import_scale: f32,
    #[serde(default)]
    pub location: [f32; 3],
}

fn default_import_scale() -> f32 {
    1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_keys_use_defaults() {
        let config = EngineConfig::from_yaml("window:\n  width: 800\n").unwrap();
        assert_eq!(config.window.width, 800);
        assert_eq!(config.window.height, 720);
        assert_eq!(config.window.title, "Cinder");
        assert_eq!(config.camera, CameraConfig::default());
        assert_eq!(EngineConfig::from_yaml("").unwrap(), EngineConfig::default());
    }

    #[test]
    fn mesh_entries_parse() {
        let text = "meshes:\n  - name: Crate\n    stem: models/crate\n    location: [0, 1, 2]\n";
        let config = EngineConfig::from_yaml(text).unwrap();
        assert_eq!(config.meshes.len(), 1);
        assert_eq!(config.meshes[0].stem, PathBuf::from("models/crate"));
        assert_eq!(config.meshes[0].import_scale, 1.0);
        assert_eq!(config.meshes[0].location, [0.0, 1.0, 2.0]);
    }

    #[test]
    fn load_reads_file_and_reports_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cinder.yaml");
        let mut config = EngineConfig::default();
        config.projection.fov_degrees = 75.0;
        std::fs::write(&path, config.to_yaml().unwrap()).unwrap();
        assert_eq!(EngineConfig::load(&path).unwrap(), config);

        let missing = EngineConfig::load(dir.path().join("nope.yaml"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        assert!(matches!(
            EngineConfig::from_yaml("window: [1, 2"),
            Err(ConfigError::Parse(_))
        ));
    }
}
