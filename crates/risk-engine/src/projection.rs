//! Monocular 3D position from bounding box geometry
//!
//! Similar-triangles pinhole model: the pixel width of a box is taken to be
//! proportional to the real width of the object at its depth. Only valid for
//! roughly front/back-facing, fully visible objects.

use serde::{Deserialize, Serialize};

use crate::geometry::{BoundingBox, Position3D};
use crate::RiskError;

/// Default focal length in pixels
pub const DEFAULT_FOCAL_LENGTH: f64 = 1000.0;

/// Camera intrinsics for one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    /// Frame width (pixels)
    pub image_width: f64,
    /// Frame height (pixels)
    pub image_height: f64,
    /// Focal length (pixels)
    pub focal_length: f64,
}

impl CameraIntrinsics {
    pub fn new(image_width: f64, image_height: f64, focal_length: f64) -> Self {
        Self {
            image_width,
            image_height,
            focal_length,
        }
    }

    pub fn validate(&self) -> Result<(), RiskError> {
        let fields = [
            ("image_width", self.image_width),
            ("image_height", self.image_height),
            ("focal_length", self.focal_length),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value <= 0.0 {
                return Err(RiskError::InvalidGeometry(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Estimate the camera-relative position of a detected object
pub fn project(
    bbox: &BoundingBox,
    intrinsics: &CameraIntrinsics,
    known_width: f64,
) -> Result<Position3D, RiskError> {
    bbox.validate()?;
    intrinsics.validate()?;
    if !known_width.is_finite() || known_width <= 0.0 {
        return Err(RiskError::InvalidGeometry(format!(
            "reference width must be positive, got {}",
            known_width
        )));
    }

    let f = intrinsics.focal_length;
    let z = known_width * f / bbox.width();

    let (cx, cy) = bbox.center();
    let x = (cx - intrinsics.image_width / 2.0) * z / f;
    let y = (cy - intrinsics.image_height / 2.0) * z / f;

    Ok(Position3D::new(x, y, z))
}

/// Flat-argument form of [`project`]
pub fn project_bbox(
    bbox: &BoundingBox,
    image_width: f64,
    image_height: f64,
    focal_length: f64,
    known_width: f64,
) -> Result<Position3D, RiskError> {
    project(
        bbox,
        &CameraIntrinsics::new(image_width, image_height, focal_length),
        known_width,
    )
}
