//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/xmlflux/xmlflux.toml`
//! 3. Local config: `<project_dir>/.xmlflux.toml`
//! 4. Environment variables: `XMLFLUX_*` prefix, `__` between sections

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;

/// Diagram geometry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LayoutConfig {
    /// Height of one row of siblings
    pub row_pitch: f64,
    /// Horizontal space per label character, multiplied by depth
    pub label_char_width: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            row_pitch: 25.0,
            label_char_width: 10.0,
        }
    }
}

/// Zoom bounds and drag panning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CameraConfig {
    pub min_scale: f64,
    pub max_scale: f64,
    /// Translation per pan step
    pub pan_speed: f64,
    /// Distance from the viewport edge that triggers panning
    pub pan_boundary: f64,
    /// Time between pan steps
    pub pan_interval_ms: u64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            min_scale: 0.1,
            max_scale: 3.0,
            pan_speed: 200.0,
            pan_boundary: 20.0,
            pan_interval_ms: 50,
        }
    }
}

impl CameraConfig {
    pub fn pan_interval(&self) -> Duration {
        Duration::from_millis(self.pan_interval_ms)
    }
}

/// Raw layout config for intermediate parsing (Option to detect "not specified").
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawLayoutConfig {
    pub row_pitch: Option<f64>,
    pub label_char_width: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawCameraConfig {
    pub min_scale: Option<f64>,
    pub max_scale: Option<f64>,
    pub pan_speed: Option<f64>,
    pub pan_boundary: Option<f64>,
    pub pan_interval_ms: Option<u64>,
}

/// Raw settings for intermediate parsing.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub duration: Option<f64>,
    pub layout: RawLayoutConfig,
    pub camera: RawCameraConfig,
}

/// Unified configuration for xmlflux.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Length of every animated transition, in milliseconds
    pub duration: f64,
    pub layout: LayoutConfig,
    pub camera: CameraConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            duration: 750.0,
            layout: LayoutConfig::default(),
            camera: CameraConfig::default(),
        }
    }
}

/// Get the XDG config directory for xmlflux.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "xmlflux").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("xmlflux.toml"))
}

/// Get the path to the local config file in a project directory.
pub fn local_config_path(project_dir: &Path) -> PathBuf {
    project_dir.join(".xmlflux.toml")
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

impl Settings {
    /// Overlay wins where it specifies a value.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        let layout = &overlay.layout;
        let camera = &overlay.camera;
        Self {
            duration: overlay.duration.unwrap_or(self.duration),
            layout: LayoutConfig {
                row_pitch: layout.row_pitch.unwrap_or(self.layout.row_pitch),
                label_char_width: layout
                    .label_char_width
                    .unwrap_or(self.layout.label_char_width),
            },
            camera: CameraConfig {
                min_scale: camera.min_scale.unwrap_or(self.camera.min_scale),
                max_scale: camera.max_scale.unwrap_or(self.camera.max_scale),
                pan_speed: camera.pan_speed.unwrap_or(self.camera.pan_speed),
                pan_boundary: camera.pan_boundary.unwrap_or(self.camera.pan_boundary),
                pan_interval_ms: camera
                    .pan_interval_ms
                    .unwrap_or(self.camera.pan_interval_ms),
            },
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `project_dir` - Optional directory holding a `.xmlflux.toml`
    pub fn load(project_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        // 1. Start with defaults
        let mut current = Self::default();

        // 2. Global config
        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                let raw = load_raw_settings(&global_path)?;
                current = current.merge_with(&raw);
            }
        }

        // 3. Project-local config
        if let Some(dir) = project_dir {
            let local_path = local_config_path(dir);
            if local_path.exists() {
                let raw = load_raw_settings(&local_path)?;
                current = current.merge_with(&raw);
            }
        }

        // 4. Environment variables
        current = Self::apply_env_overrides(current)?;

        current.validate()?;
        Ok(current)
    }

    /// Load defaults overlaid with a single TOML file.
    pub fn load_file(path: &Path) -> Result<Self, ApplicationError> {
        let raw = load_raw_settings(path)?;
        let settings = Self::default().merge_with(&raw);
        settings.validate()?;
        Ok(settings)
    }

    /// Apply XMLFLUX_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("XMLFLUX")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get::<f64>("duration") {
            settings.duration = val;
        }
        if let Ok(val) = config.get::<f64>("layout.row_pitch") {
            settings.layout.row_pitch = val;
        }
        if let Ok(val) = config.get::<f64>("layout.label_char_width") {
            settings.layout.label_char_width = val;
        }
        if let Ok(val) = config.get::<f64>("camera.min_scale") {
            settings.camera.min_scale = val;
        }
        if let Ok(val) = config.get::<f64>("camera.max_scale") {
            settings.camera.max_scale = val;
        }
        if let Ok(val) = config.get::<f64>("camera.pan_speed") {
            settings.camera.pan_speed = val;
        }
        if let Ok(val) = config.get::<f64>("camera.pan_boundary") {
            settings.camera.pan_boundary = val;
        }
        if let Ok(val) = config.get::<u64>("camera.pan_interval_ms") {
            settings.camera.pan_interval_ms = val;
        }

        Ok(settings)
    }

    fn validate(&self) -> Result<(), ApplicationError> {
        let invalid = |message: &str| {
            Err(ApplicationError::Config {
                message: message.to_string(),
            })
        };
        if !(self.duration >= 0.0) {
            return invalid("duration must not be negative");
        }
        if !(self.layout.row_pitch > 0.0) || !(self.layout.label_char_width > 0.0) {
            return invalid("layout sizes must be positive");
        }
        if !(self.camera.min_scale > 0.0) || self.camera.min_scale > self.camera.max_scale {
            return invalid("camera scale bounds must satisfy 0 < min_scale <= max_scale");
        }
        if self.camera.pan_interval_ms == 0 {
            return invalid("pan_interval_ms must be positive");
        }
        Ok(())
    }

    /// Render the effective settings as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: e.to_string(),
        })
    }
}
