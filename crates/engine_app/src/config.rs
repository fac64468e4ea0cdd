//! Configuration system for the gaze viewer
//!
//! Loads settings from `config/settings.json` or creates default if missing

use gaze_select::{CursorConfig, DwellConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid setting `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Logging verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LogLevel {
    /// Only errors
    Silent,
    /// Startup, selections and the run summary (default)
    #[default]
    Summary,
    /// Summary + every state transition
    Normal,
    /// All debug information, including per-second engine telemetry
    Verbose,
}

impl LogLevel {
    /// Default `EnvFilter` directive, overridden by `RUST_LOG`
    pub fn filter_directive(self) -> &'static str {
        match self {
            LogLevel::Silent => "error",
            LogLevel::Summary => "warn,engine_app=info",
            LogLevel::Normal => "info,gaze_select=debug,engine_core=info",
            LogLevel::Verbose => "debug",
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GazeConfig {
    /// Dwell picking and cursor settings
    pub selection: SelectionConfig,

    /// Solar system layout and orbit speeds
    pub scene: SceneConfig,

    /// Viewer head and scripted gaze path
    pub head: HeadConfig,

    /// Frame loop settings
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectionConfig {
    pub dwell: DwellConfig,
    pub cursor: CursorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneConfig {
    /// Sun position relative to the viewer
    pub center: [f32; 3],

    /// Earth orbit radius around the sun
    pub earth_distance: f32,

    /// Moon orbit radius around the earth
    pub moon_distance: f32,

    /// Earth orbit speed (radians per second)
    pub earth_orbit_rate: f32,

    /// Moon orbit speed (radians per second)
    pub moon_orbit_rate: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeadConfig {
    /// Viewer position
    pub position: [f32; 3],

    /// Bodies looked at in turn, with how long each is held (ms)
    pub gaze_script: Vec<GazeStep>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GazeStep {
    /// Body to look at, or `None` to look away from the scene
    pub body: Option<String>,
    pub hold_ms: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Frame rate of the render loop
    pub tick_hz: u32,

    /// Frames to run before ending the session (`None` runs until Ctrl-C)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_frames: Option<u64>,

    /// Logging verbosity level
    #[serde(default)]
    pub log_level: LogLevel,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            center: [0.0, 0.0, -2.0],
            earth_distance: 2.0,
            moon_distance: 0.5,
            // 0.01 and 0.02 rad per frame at 60 Hz
            earth_orbit_rate: 0.6,
            moon_orbit_rate: 1.2,
        }
    }
}

impl Default for HeadConfig {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, 0.0],
            gaze_script: vec![
                GazeStep {
                    body: Some("sun".into()),
                    hold_ms: 1000.0,
                },
                GazeStep {
                    body: None,
                    hold_ms: 500.0,
                },
                GazeStep {
                    body: Some("earth".into()),
                    hold_ms: 1200.0,
                },
                GazeStep {
                    body: Some("moon".into()),
                    hold_ms: 400.0,
                },
            ],
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_hz: 60,
            run_frames: Some(600),
            log_level: LogLevel::Summary,
        }
    }
}

impl GazeConfig {
    /// Load configuration from file, or create default if missing
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;

            let config: GazeConfig = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
            config.validate()?;

            info!(path = %path.display(), "loaded configuration");
            Ok(config)
        } else {
            warn!(path = %path.display(), "no config file found, creating default");
            let config = Self::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let content = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, content).map_err(io_err)?;

        info!(path = %path.display(), "saved configuration");
        Ok(())
    }

    /// Reject settings the frame loop cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let threshold = self.selection.dwell.threshold_ms;
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(invalid("selection.dwell.threshold_ms", format!("{threshold} is not a positive duration")));
        }

        let cursor = &self.selection.cursor;
        if !(cursor.radius > 0.0 && cursor.scale_factor > 0.0) {
            return Err(invalid("selection.cursor", "radius and scale_factor must be positive".into()));
        }

        if self.engine.tick_hz == 0 || self.engine.tick_hz > 240 {
            return Err(invalid("engine.tick_hz", format!("{} is outside 1..=240", self.engine.tick_hz)));
        }

        for (field, rate) in [
            ("scene.earth_orbit_rate", self.scene.earth_orbit_rate),
            ("scene.moon_orbit_rate", self.scene.moon_orbit_rate),
        ] {
            if !rate.is_finite() {
                return Err(invalid(field, format!("{rate} is not a number")));
            }
        }

        if self.head.gaze_script.iter().any(|step| !(step.hold_ms > 0.0)) {
            return Err(invalid("head.gaze_script", "every step needs a positive hold_ms".into()));
        }

        Ok(())
    }

    /// Get the path to the config file
    fn config_path() -> PathBuf {
        Path::new("config").join("settings.json")
    }
}

fn invalid(field: &'static str, reason: String) -> ConfigError {
    ConfigError::Invalid { field, reason }
}
