//! Detection input from the upstream tracker

use risk_engine::{BoundingBox, CameraIntrinsics, TrackId};
use serde::{Deserialize, Serialize};

/// One tracked object in one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Identity assigned upstream
    pub id: TrackId,

    /// Box in pixel coordinates
    pub bbox: BoundingBox,

    /// Detector class label
    pub label: String,

    /// Detection confidence (0.0 - 1.0)
    pub confidence: f64,
}

/// All detections from one video frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionFrame {
    /// Frame sequence number
    #[serde(default)]
    pub frame_index: u64,

    /// Monotonic capture timestamp (ms)
    pub timestamp_ms: u64,

    /// Frame width (pixels)
    pub image_width: f64,

    /// Frame height (pixels)
    pub image_height: f64,

    #[serde(default)]
    pub detections: Vec<Detection>,
}

impl DetectionFrame {
    /// Intrinsics for this frame given the configured focal length
    pub fn intrinsics(&self, focal_length: f64) -> CameraIntrinsics {
        CameraIntrinsics::new(self.image_width, self.image_height, focal_length)
    }
}
