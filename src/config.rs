//! Configuration file handling for qrscan.
//!
//! Loads configuration from `<config dir>/qrscan/config.toml` or a custom path.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::camera::{CameraSettings, Facing, Resolution};
use crate::scan::ScanOptions;

/// Configuration file structure for qrscan.
#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub decoder: DecoderConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CameraConfig {
    /// Explicit device index; overrides facing
    #[serde(default)]
    pub device: Option<u32>,
    #[serde(default = "default_facing")]
    pub facing: String,
    #[serde(default)]
    pub mirror: bool,
    #[serde(default = "default_resolution")]
    pub resolution: String,
    #[serde(default = "default_fps")]
    pub fps: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: None,
            facing: default_facing(),
            mirror: false,
            resolution: default_resolution(),
            fps: default_fps(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ScanConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default)]
    pub warmup_frame_limit: Option<u32>,
    #[serde(default)]
    pub max_attempts: Option<u32>,
    #[serde(default)]
    pub zoom: Option<f64>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            warmup_frame_limit: None,
            max_attempts: None,
            zoom: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct DecoderConfig {
    /// Enable the enhanced preprocessing strategy
    #[serde(default = "default_true")]
    pub assist: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self { assist: true }
    }
}

fn default_true() -> bool {
    true
}

fn default_facing() -> String {
    Facing::default().as_str().to_string()
}

fn default_resolution() -> String {
    Resolution::default().to_string()
}

fn default_fps() -> u32 {
    30
}

fn default_interval_ms() -> u64 {
    16
}

/// Commented template written by `config init`.
pub const DEFAULT_CONFIG: &str = r#"# qrscan configuration

[camera]
# Explicit device index (from `qrscan list-cameras`); overrides facing
# device = 0
# Preferred facing: environment, user, any
facing = "environment"
# Mirror horizontally
mirror = false
# Capture resolution
resolution = "640x480"
# Target frame rate
fps = 30

[scan]
# Milliseconds between scan cycles (16 = one 60 Hz display frame)
interval_ms = 16
# Give up if the camera yields this many empty captures before the first frame (at least 1)
# warmup_frame_limit = 300
# Give up after this many decode attempts without a match (at least 1)
# max_attempts = 1000
# Zoom requested once the camera opens (clamped to what the camera supports)
# zoom = 1.0

[decoder]
# Also try the enhanced preprocessing cascade once it has loaded
assist = true
"#;

impl Config {
    /// Load configuration from a file path.
    /// Returns default config if the file doesn't exist.
    /// Returns an error if the file exists but cannot be parsed or holds
    /// invalid values.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(PathBuf::from).unwrap_or_else(default_path);

        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::Io {
            path: path.clone(),
            source: e,
        })?;
        let config = Self::parse(&content).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.clone(),
                source,
            },
            other => other,
        })?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse and validate TOML content.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: PathBuf::new(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.facing()?;
        self.resolution()?;
        if self.scan.interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "scan.interval_ms",
                value: "0".to_string(),
            });
        }
        let limits = [
            ("scan.warmup_frame_limit", self.scan.warmup_frame_limit),
            ("scan.max_attempts", self.scan.max_attempts),
        ];
        for (field, limit) in limits {
            if limit == Some(0) {
                return Err(ConfigError::Invalid {
                    field,
                    value: "0".to_string(),
                });
            }
        }
        if let Some(zoom) = self.scan.zoom {
            if !zoom.is_finite() {
                return Err(ConfigError::Invalid {
                    field: "scan.zoom",
                    value: zoom.to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn facing(&self) -> Result<Facing, ConfigError> {
        Facing::parse(&self.camera.facing).ok_or_else(|| ConfigError::Invalid {
            field: "camera.facing",
            value: self.camera.facing.clone(),
        })
    }

    pub fn resolution(&self) -> Result<Resolution, ConfigError> {
        Resolution::parse(&self.camera.resolution).ok_or_else(|| ConfigError::Invalid {
            field: "camera.resolution",
            value: self.camera.resolution.clone(),
        })
    }

    pub fn camera_settings(&self) -> Result<CameraSettings, ConfigError> {
        Ok(CameraSettings {
            device_index: self.camera.device,
            resolution: self.resolution()?,
            fps: self.camera.fps,
            mirror: self.camera.mirror,
        })
    }

    pub fn scan_options(&self) -> Result<ScanOptions, ConfigError> {
        Ok(ScanOptions {
            facing: self.facing()?,
            cycle_interval: Duration::from_millis(self.scan.interval_ms.max(1)),
            warmup_frame_limit: self.scan.warmup_frame_limit,
            max_attempts: self.scan.max_attempts,
            initial_zoom: self.scan.zoom,
        })
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid value for {field}: '{value}'")]
    Invalid { field: &'static str, value: String },
}

/// Get the default config file path.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("qrscan").join("config.toml"))
        .unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config/qrscan/config.toml")
        })
}
