//! Geometry primitives shared by projection, velocity and risk

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Sub;

use crate::RiskError;

/// Identity assigned by the upstream tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(pub u64);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for TrackId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Axis-aligned bounding box in pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BoundingBox {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    /// Box center (cx, cy)
    pub fn center(&self) -> (f64, f64) {
        ((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }

    /// Reject inverted, empty or non-finite boxes
    pub fn validate(&self) -> Result<(), RiskError> {
        let coords = [self.x1, self.y1, self.x2, self.y2];
        if coords.iter().any(|c| !c.is_finite()) {
            return Err(RiskError::InvalidGeometry(format!(
                "non-finite bounding box {:?}",
                coords
            )));
        }
        if self.width() <= 0.0 || self.height() <= 0.0 {
            return Err(RiskError::InvalidGeometry(format!(
                "bounding box {}x{} must have positive extent",
                self.width(),
                self.height()
            )));
        }
        Ok(())
    }
}

/// Camera-relative position in meters.
///
/// `x` is lateral (positive = right), `y` vertical (positive = down),
/// `z` depth along the optical axis and always positive for projected boxes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position3D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position3D {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Ground-plane projection (x, z) used for risk
    pub fn ground_plane(&self) -> (f64, f64) {
        (self.x, self.z)
    }

    /// Angle from the forward axis in degrees (negative = left)
    pub fn bearing_deg(&self) -> f64 {
        self.x.atan2(self.z).to_degrees()
    }
}

impl Sub for Position3D {
    type Output = Position3D;

    fn sub(self, rhs: Position3D) -> Position3D {
        Position3D::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

/// Velocity relative to the (stationary) ego camera, m/s
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    pub vx: f64,
    pub vy: f64,
    pub vz: f64,
}

impl Velocity {
    pub const ZERO: Velocity = Velocity {
        vx: 0.0,
        vy: 0.0,
        vz: 0.0,
    };

    pub fn new(vx: f64, vy: f64, vz: f64) -> Self {
        Self { vx, vy, vz }
    }

    /// Ground-plane projection (vx, vz) used for risk
    pub fn ground_plane(&self) -> (f64, f64) {
        (self.vx, self.vz)
    }
}
