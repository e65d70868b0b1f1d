//! Viewer configuration, loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file) reproduces the
//! stock viewer: porcelain model, green marker cube, red point light.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;
use crate::frame_loop::FaultPolicy;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ViewerConfig {
    pub camera: CameraConfig,
    pub controls: ControlsConfig,
    pub light: LightConfig,
    pub marker: MarkerConfig,
    pub model: ModelConfig,
    pub debug: DebugConfig,
    pub frame: FrameConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CameraConfig {
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    /// Initial distance from the origin along +z
    pub distance: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 75.0,
            near: 10.0,
            far: 100_000.0,
            distance: 500.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ControlsConfig {
    pub min_distance: f32,
    pub max_distance: f32,
    /// Radians per rotate input
    pub rotate_step: f32,
    /// Distance multiplier per zoom input
    pub zoom_step: f32,
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            min_distance: 100.0,
            max_distance: 700.0,
            rotate_step: 0.1,
            zoom_step: 1.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LightConfig {
    pub color: u32,
    pub intensity: f32,
    pub distance: f32,
    pub position: [f32; 3],
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            color: 0xff0000,
            intensity: 1.0,
            distance: 100.0,
            position: [5.0, 5.0, 5.0],
        }
    }
}

/// The flat-shaded cube placed at the origin next to the model
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MarkerConfig {
    pub enabled: bool,
    pub size: f32,
    pub color: u32,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            size: 10.0,
            color: 0x00ff00,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelConfig {
    pub path: Option<PathBuf>,
    pub matcap: Option<PathBuf>,
    pub color: u32,
    /// Tilt applied around x after centering, in radians
    pub rotation_x: f32,
    /// Radians per frame around x and y; `[0, 0]` registers no spin trigger
    pub spin: [f32; 2],
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: None,
            matcap: None,
            color: 0xffffff,
            rotation_x: -1.2,
            spin: [0.0, 0.0],
        }
    }
}

/// Bounds of the light height control
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DebugConfig {
    pub light_y_min: f32,
    pub light_y_max: f32,
    pub light_y_step: f32,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            light_y_min: -10.0,
            light_y_max: 10.0,
            light_y_step: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FrameConfig {
    pub fault_policy: FaultPolicy,
    /// Frame rate of hosts that drive their own clock (the terminal)
    pub target_fps: u32,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            fault_policy: FaultPolicy::Isolate,
            target_fps: 30,
        }
    }
}

impl ViewerConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: ViewerConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        log::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        if !(self.camera.near > 0.0 && self.camera.far > self.camera.near) {
            return invalid("camera requires 0 < near < far");
        }
        if !(self.camera.fov_degrees > 0.0 && self.camera.fov_degrees < 180.0) {
            return invalid("camera.fov_degrees must be in (0, 180)");
        }
        if !(self.controls.min_distance > 0.0
            && self.controls.min_distance <= self.controls.max_distance)
        {
            return invalid("controls require 0 < min_distance <= max_distance");
        }
        if self.controls.zoom_step <= 1.0 {
            return invalid("controls.zoom_step must be greater than 1");
        }
        if !(self.debug.light_y_min <= self.debug.light_y_max && self.debug.light_y_step > 0.0) {
            return invalid("debug requires light_y_min <= light_y_max and a positive step");
        }
        if self.frame.target_fps == 0 {
            return invalid("frame.target_fps must be positive");
        }
        Ok(())
    }
}
