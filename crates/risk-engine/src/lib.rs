//! Collision Risk Engine
//!
//! Per-object danger assessment from monocular detections:
//! - Bounding box to camera-relative 3D position (pinhole approximation)
//! - Finite-difference velocity between consecutive samples
//! - Closest approach and time-to-collision
//! - Weighted 0-100 risk score

pub mod config;
pub mod geometry;
pub mod kinematics;
pub mod projection;
pub mod velocity;

pub use config::{ClassWidths, RiskParams};
pub use geometry::{BoundingBox, Position3D, TrackId, Velocity};
pub use kinematics::{analyze, assess, radial_time_to_collision, KinematicsReport, RiskScore};
pub use projection::{project, project_bbox, CameraIntrinsics};
pub use velocity::{estimate, Sample};

use thiserror::Error;

/// Risk engine error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RiskError {
    /// Degenerate box, non-positive intrinsics or reference width
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Two samples with equal or reversed timestamps
    #[error("Non-positive elapsed time between samples: {elapsed_ms}ms")]
    NonPositiveElapsedTime { elapsed_ms: i64 },

    /// Risk tunable out of range
    #[error("Invalid risk parameter: {0}")]
    InvalidParameter(String),
}
