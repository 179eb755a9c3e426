//! Per-frame risk pipeline
//!
//! Each frame is one transaction on the motion history: read the previous
//! samples, compute, write the current samples, evict identities that were
//! not observed. The history lock is held for the whole frame.

use motion_history::MotionHistory;
use risk_engine::{
    analyze, estimate, project, BoundingBox, CameraIntrinsics, ClassWidths, KinematicsReport,
    Position3D, RiskError, RiskParams, RiskScore, Sample, TrackId, Velocity,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

use crate::config::{AppConfig, PipelineConfig};
use crate::detection::{Detection, DetectionFrame};
use crate::PipelineError;

/// Risk output for one object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectAssessment {
    pub id: TrackId,
    pub label: String,
    pub confidence: f64,
    pub bbox: BoundingBox,

    /// Camera-relative position (m)
    pub position: Position3D,

    /// Relative velocity (m/s)
    pub velocity: Velocity,

    pub risk: RiskScore,

    /// Angle from the forward axis (degrees, negative = left)
    pub bearing_deg: f64,

    /// Object sits laterally within the ego lane
    pub in_lane: bool,

    pub kinematics: KinematicsReport,
}

/// Why a detection produced no assessment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SkipReason {
    /// Box, intrinsics or class width unusable
    InvalidGeometry(String),

    /// Identity already seen earlier in the same frame
    DuplicateIdentity,
}

/// A detection dropped for this frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedDetection {
    pub id: TrackId,
    pub label: String,
    pub reason: SkipReason,
}

/// Result of processing one frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameAssessment {
    pub frame_index: u64,
    pub timestamp_ms: u64,
    pub objects: Vec<ObjectAssessment>,
    pub skipped: Vec<SkippedDetection>,

    /// Detections under the confidence threshold
    pub filtered: usize,

    /// Identities evicted from the history this frame
    pub evicted: usize,
}

impl FrameAssessment {
    /// Highest-risk object, if any
    pub fn most_dangerous(&self) -> Option<&ObjectAssessment> {
        self.objects.iter().max_by_key(|o| o.risk)
    }
}

/// Collision risk pipeline owning the motion history
pub struct CollisionPipeline {
    focal_length: f64,
    classes: ClassWidths,
    risk: RiskParams,
    settings: PipelineConfig,
    history: Mutex<MotionHistory>,
}

impl CollisionPipeline {
    /// Create a pipeline from validated configuration
    pub fn new(config: &AppConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self {
            focal_length: config.camera.focal_length,
            classes: config.classes.clone(),
            risk: config.risk.clone(),
            settings: config.pipeline.clone(),
            history: Mutex::new(MotionHistory::new()),
        })
    }

    fn lock_history(&self) -> MutexGuard<'_, MotionHistory> {
        // Every store operation leaves it consistent, so a poisoned lock is still usable
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Process one frame of detections
    pub fn process_frame(&self, frame: &DetectionFrame) -> FrameAssessment {
        let intrinsics = frame.intrinsics(self.focal_length);
        let mut history = self.lock_history();

        let mut claimed = HashSet::new();
        let mut observed = HashSet::new();
        let mut assessment = FrameAssessment {
            frame_index: frame.frame_index,
            timestamp_ms: frame.timestamp_ms,
            ..Default::default()
        };

        for detection in &frame.detections {
            if detection.confidence < self.settings.min_confidence {
                assessment.filtered += 1;
                continue;
            }

            if !claimed.insert(detection.id) {
                warn!(
                    "Frame {}: duplicate track {} skipped",
                    frame.frame_index, detection.id
                );
                assessment.skipped.push(SkippedDetection {
                    id: detection.id,
                    label: detection.label.clone(),
                    reason: SkipReason::DuplicateIdentity,
                });
                continue;
            }

            match self.assess_detection(&mut history, detection, &intrinsics, frame.timestamp_ms) {
                Ok(object) => {
                    observed.insert(detection.id);
                    assessment.objects.push(object);
                }
                Err(e) => {
                    warn!(
                        "Frame {}: skipping track {} ({}): {}",
                        frame.frame_index, detection.id, detection.label, e
                    );
                    assessment.skipped.push(SkippedDetection {
                        id: detection.id,
                        label: detection.label.clone(),
                        reason: SkipReason::InvalidGeometry(e.to_string()),
                    });
                }
            }
        }

        assessment.evicted = history.retain(&observed);

        debug!(
            "Frame {}: {} assessed, {} skipped, {} filtered, {} evicted, {} tracked",
            frame.frame_index,
            assessment.objects.len(),
            assessment.skipped.len(),
            assessment.filtered,
            assessment.evicted,
            history.len()
        );

        assessment
    }

    fn assess_detection(
        &self,
        history: &mut MotionHistory,
        detection: &Detection,
        intrinsics: &CameraIntrinsics,
        timestamp_ms: u64,
    ) -> Result<ObjectAssessment, RiskError> {
        let known_width = self.classes.width_for(&detection.label);
        let position = project(&detection.bbox, intrinsics, known_width)?;
        let current = Sample::new(position, timestamp_ms);

        let prior = history.prior(detection.id);
        let previous = prior.previous().map(|p| p.sample());

        let (velocity, fresh) = match estimate(previous, current, prior.velocity()) {
            Ok(v) => (v, previous.is_some()),
            Err(RiskError::NonPositiveElapsedTime { elapsed_ms }) => {
                debug!(
                    "Track {}: elapsed {}ms, reusing last velocity",
                    detection.id, elapsed_ms
                );
                (estimate(None, current, prior.velocity())?, false)
            }
            Err(e) => return Err(e),
        };

        history.update(detection.id, detection.bbox, position, timestamp_ms);
        if fresh {
            history.set_velocity(detection.id, velocity);
        }

        let kinematics = analyze(position.ground_plane(), velocity.ground_plane(), &self.risk);

        debug!(
            "Track {} ({}): pos=({:.2}, {:.2}, {:.2}) vel=({:.2}, {:.2}, {:.2}) risk={}",
            detection.id,
            detection.label,
            position.x,
            position.y,
            position.z,
            velocity.vx,
            velocity.vy,
            velocity.vz,
            kinematics.risk
        );

        Ok(ObjectAssessment {
            id: detection.id,
            label: detection.label.clone(),
            confidence: detection.confidence,
            bbox: detection.bbox,
            position,
            velocity,
            risk: kinematics.risk,
            bearing_deg: position.bearing_deg(),
            in_lane: position.x.abs() < self.settings.lane_half_width,
            kinematics,
        })
    }

    /// Number of identities currently tracked
    pub fn tracked_count(&self) -> usize {
        self.lock_history().len()
    }

    /// Forget all motion history (e.g. when the stream restarts)
    pub fn reset(&self) {
        self.lock_history().clear();
    }
}
