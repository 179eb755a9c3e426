//! Layered configuration: defaults, optional TOML file, environment
//!
//! Environment variables use the `COLLISION_SENSE` prefix with `__` between
//! nested keys, e.g. `COLLISION_SENSE_PIPELINE__MIN_CONFIDENCE=0.6`.

use ::config::{Config, Environment, File};
use risk_engine::projection::DEFAULT_FOCAL_LENGTH;
use risk_engine::{ClassWidths, RiskParams};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::PipelineError;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "COLLISION_SENSE";

/// Camera settings not carried by the detection frames
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Focal length (pixels)
    pub focal_length: f64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            focal_length: DEFAULT_FOCAL_LENGTH,
        }
    }
}

/// Per-frame processing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Detections below this confidence are ignored
    pub min_confidence: f64,

    /// Objects with |x| below this are in the ego lane (meters)
    pub lane_half_width: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.75,
            lane_half_width: 1.5,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// trace, debug, info, warn or error
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Replay pacing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Frames per second; 0 replays as fast as possible
    pub fps: f64,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self { fps: 30.0 }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub camera: CameraConfig,
    pub classes: ClassWidths,
    pub risk: RiskParams,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
    pub replay: ReplayConfig,
}

impl AppConfig {
    /// Load defaults, then the optional file, then the environment
    pub fn load(path: Option<&Path>) -> Result<Self, PipelineError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints the types cannot express
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !self.camera.focal_length.is_finite() || self.camera.focal_length <= 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "camera.focal_length must be positive, got {}",
                self.camera.focal_length
            )));
        }
        if !(0.0..=1.0).contains(&self.pipeline.min_confidence) {
            return Err(PipelineError::InvalidConfig(format!(
                "pipeline.min_confidence must be within [0, 1], got {}",
                self.pipeline.min_confidence
            )));
        }
        if self.pipeline.lane_half_width < 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "pipeline.lane_half_width must not be negative, got {}",
                self.pipeline.lane_half_width
            )));
        }
        if !self.replay.fps.is_finite() || self.replay.fps < 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "replay.fps must not be negative, got {}",
                self.replay.fps
            )));
        }
        self.classes.validate()?;
        self.risk.validate()?;
        Ok(())
    }
}
