//! Collision Sense
//!
//! Turns per-frame tracked detections into per-object collision risk:
//! - Projects boxes to camera-relative positions
//! - Differences against the previous frame for velocity
//! - Scores closest-approach risk for each object
//! - Hands results to consumers with latest-frame-wins backpressure

pub mod config;
pub mod detection;
pub mod pipeline;
pub mod replay;

pub use crate::config::{AppConfig, CameraConfig, LoggingConfig, PipelineConfig, ReplayConfig};
pub use detection::{Detection, DetectionFrame};
pub use pipeline::{CollisionPipeline, FrameAssessment, ObjectAssessment, SkipReason, SkippedDetection};
pub use replay::{run_replay, ReplaySummary};

use std::str::FromStr;
use thiserror::Error;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Pipeline error types
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Risk(#[from] risk_engine::RiskError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Producer task failed: {0}")]
    Task(String),
}

/// Initialize logging. Logs go to stderr so stdout stays machine-readable.
pub fn init_logging(config: &LoggingConfig) -> Result<(), PipelineError> {
    let level = Level::from_str(&config.level)
        .map_err(|_| PipelineError::InvalidConfig(format!("unknown log level '{}'", config.level)))?;

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr);

    let result = if config.json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };

    result.map_err(|e| PipelineError::InvalidConfig(format!("failed to set tracing subscriber: {}", e)))
}
