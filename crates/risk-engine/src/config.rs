//! Risk engine configuration

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::RiskError;

/// Real-world reference widths per class label (meters)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassWidths {
    /// Width by detector label
    pub widths: HashMap<String, f64>,

    /// Width used for labels not in the table
    pub default_width: f64,
}

impl Default for ClassWidths {
    fn default() -> Self {
        let widths = [("car", 1.8), ("person", 0.15)]
            .into_iter()
            .map(|(label, width)| (label.to_string(), width))
            .collect();

        Self {
            widths,
            default_width: 1.8,
        }
    }
}

impl ClassWidths {
    /// Reference width for a label, falling back to the default
    pub fn width_for(&self, label: &str) -> f64 {
        self.widths.get(label).copied().unwrap_or(self.default_width)
    }

    /// Add or replace a class width
    pub fn with_width(mut self, label: impl Into<String>, width: f64) -> Self {
        self.widths.insert(label.into(), width);
        self
    }

    pub fn validate(&self) -> Result<(), RiskError> {
        let bad = |w: f64| !w.is_finite() || w <= 0.0;

        if bad(self.default_width) {
            return Err(RiskError::InvalidGeometry(format!(
                "default class width {} must be positive",
                self.default_width
            )));
        }
        if let Some((label, width)) = self.widths.iter().find(|(_, w)| bad(**w)) {
            return Err(RiskError::InvalidGeometry(format!(
                "class width for '{}' ({}) must be positive",
                label, width
            )));
        }
        Ok(())
    }
}

/// Tunables for the kinematics and risk computation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskParams {
    /// Maximum braking deceleration (m/s²)
    pub max_deceleration: f64,

    /// Closest approach below which a pass counts as a near miss (m)
    pub safe_passing_distance: f64,

    /// Lower bound for the safe following distance (m)
    pub min_safe_distance: f64,

    /// Multiplier applied to the stopping distance
    pub stopping_margin: f64,

    /// TTC at or beyond which the TTC factor is zero (s)
    pub ttc_horizon: f64,

    /// Relative speeds at or below this are treated as stationary (m/s)
    pub speed_epsilon: f64,

    pub distance_weight: f64,
    pub ttc_weight: f64,
    pub sudden_stop_weight: f64,
    pub min_distance_weight: f64,

    /// |cos| below which motion counts as crossing and is discounted
    pub perpendicular_threshold: f64,
}

impl Default for RiskParams {
    fn default() -> Self {
        Self {
            max_deceleration: 7.0,
            safe_passing_distance: 3.0,
            min_safe_distance: 5.0,
            stopping_margin: 1.5,
            ttc_horizon: 10.0,
            speed_epsilon: 0.001,
            distance_weight: 0.30,
            ttc_weight: 0.30,
            sudden_stop_weight: 0.15,
            min_distance_weight: 0.25,
            perpendicular_threshold: 0.3,
        }
    }
}

impl RiskParams {
    /// Reject parameters that would divide by zero or invert a factor
    pub fn validate(&self) -> Result<(), RiskError> {
        let positive = [
            ("max_deceleration", self.max_deceleration),
            ("safe_passing_distance", self.safe_passing_distance),
            ("min_safe_distance", self.min_safe_distance),
            ("ttc_horizon", self.ttc_horizon),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(RiskError::InvalidParameter(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }

        let non_negative = [
            ("stopping_margin", self.stopping_margin),
            ("speed_epsilon", self.speed_epsilon),
            ("distance_weight", self.distance_weight),
            ("ttc_weight", self.ttc_weight),
            ("sudden_stop_weight", self.sudden_stop_weight),
            ("min_distance_weight", self.min_distance_weight),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(RiskError::InvalidParameter(format!(
                    "{} must be non-negative, got {}",
                    name, value
                )));
            }
        }

        if !(0.0..=1.0).contains(&self.perpendicular_threshold) {
            return Err(RiskError::InvalidParameter(format!(
                "perpendicular_threshold must be within [0, 1], got {}",
                self.perpendicular_threshold
            )));
        }
        Ok(())
    }
}
