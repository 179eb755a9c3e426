//! Closest-approach kinematics and composite risk score
//!
//! Ego vehicle sits at the origin at rest; all velocities are relative.
//! Only the ground plane (x, z) contributes to risk.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::RiskParams;

/// Risk score in [0, 100]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RiskScore(u8);

impl RiskScore {
    pub const MIN: RiskScore = RiskScore(0);
    pub const MAX: RiskScore = RiskScore(100);

    /// Round (half to even) and clamp a raw score. NaN maps to zero.
    pub fn from_raw(raw: f64) -> Self {
        if raw.is_nan() {
            return Self::MIN;
        }
        Self(raw.clamp(0.0, 100.0).round_ties_even() as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl fmt::Display for RiskScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Every intermediate of a risk assessment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KinematicsReport {
    /// Current separation (m)
    pub distance: f64,
    /// Relative speed magnitude (m/s)
    pub rel_speed: f64,
    /// Object is closing on the ego vehicle
    pub approaching: bool,
    /// Time until closest approach; `None` when relative motion is negligible
    pub t_closest: Option<f64>,
    /// Separation at closest approach (m)
    pub min_distance: f64,
    /// Time to collision; `None` when not on a near-intersecting closing course
    pub ttc: Option<f64>,
    /// Distance needed to brake away the relative speed (m)
    pub stopping_distance: f64,
    pub distance_factor: f64,
    pub ttc_factor: f64,
    pub sudden_stop_factor: f64,
    pub min_distance_factor: f64,
    /// |cos| between position and velocity; 0 crossing, 1 head-on or away
    pub perpendicular_factor: f64,
    /// Weighted score after the crossing discount, before rounding
    pub raw_risk: f64,
    pub risk: RiskScore,
}

fn clamp_factor(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

/// Run the full kinematics and risk computation
pub fn analyze(position: (f64, f64), velocity: (f64, f64), params: &RiskParams) -> KinematicsReport {
    let (x, z) = position;
    let (vx, vz) = velocity;

    let distance = (x * x + z * z).sqrt();
    let speed_sq = vx * vx + vz * vz;
    let rel_speed = speed_sq.sqrt();

    let dot = x * vx + z * vz;
    let approaching = dot < 0.0;
    let moving = rel_speed > params.speed_epsilon;

    let (t_closest, min_distance) = if moving {
        let t = (-dot / speed_sq).max(0.0);
        let fx = x + vx * t;
        let fz = z + vz * t;
        (Some(t), (fx * fx + fz * fz).sqrt())
    } else {
        (None, distance)
    };

    // Radial distance over total speed, not the closing component
    let ttc = if min_distance < params.safe_passing_distance && approaching && rel_speed > 0.0 {
        Some(distance / rel_speed)
    } else {
        None
    };

    let stopping_distance = rel_speed * rel_speed / (2.0 * params.max_deceleration);
    let safe_distance = (stopping_distance * params.stopping_margin).max(params.min_safe_distance);

    let distance_factor = clamp_factor(100.0 * (1.0 - distance / safe_distance));
    let ttc_factor = ttc.map_or(0.0, |t| clamp_factor(100.0 * (1.0 - t / params.ttc_horizon)));
    let sudden_stop_factor = clamp_factor(100.0 * stopping_distance / distance.max(1.0));
    let min_distance_factor = if min_distance < params.safe_passing_distance * 3.0 {
        clamp_factor(100.0 * (1.0 - min_distance / params.safe_passing_distance))
    } else {
        0.0
    };

    let mut raw_risk = params.distance_weight * distance_factor
        + params.ttc_weight * ttc_factor
        + params.sudden_stop_weight * sudden_stop_factor
        + params.min_distance_weight * min_distance_factor;

    let perpendicular_factor = if !moving {
        0.0
    } else if distance > 0.0 {
        (dot / (distance * rel_speed)).abs()
    } else {
        1.0
    };
    if perpendicular_factor < params.perpendicular_threshold {
        raw_risk *= perpendicular_factor * 2.0;
    }

    KinematicsReport {
        distance,
        rel_speed,
        approaching,
        t_closest,
        min_distance,
        ttc,
        stopping_distance,
        distance_factor,
        ttc_factor,
        sudden_stop_factor,
        min_distance_factor,
        perpendicular_factor,
        raw_risk,
        risk: RiskScore::from_raw(raw_risk),
    }
}

/// Risk score with default parameters
pub fn assess(position: (f64, f64), velocity: (f64, f64)) -> RiskScore {
    analyze(position, velocity, &RiskParams::default()).risk
}

/// Simple radial TTC: `None` unless the radial velocity is negative (closing)
pub fn radial_time_to_collision(distance: f64, radial_velocity: f64) -> Option<f64> {
    if radial_velocity >= 0.0 {
        return None;
    }
    Some((distance / radial_velocity).abs())
}
