//! Finite-difference velocity estimation
//!
//! Single-step difference, no smoothing: box jitter shows up directly in the
//! velocity.

use crate::geometry::{Position3D, Velocity};
use crate::RiskError;

/// Position observed at a timestamp
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub position: Position3D,
    /// Monotonic frame timestamp (milliseconds)
    pub timestamp_ms: u64,
}

impl Sample {
    pub fn new(position: Position3D, timestamp_ms: u64) -> Self {
        Self {
            position,
            timestamp_ms,
        }
    }
}

/// Estimate velocity from the previous and current sample.
///
/// Without a previous sample the fallback velocity is returned, or zero when
/// there is none. Equal or reversed timestamps fail with
/// [`RiskError::NonPositiveElapsedTime`]; callers then take the fallback path.
pub fn estimate(
    previous: Option<Sample>,
    current: Sample,
    fallback: Option<Velocity>,
) -> Result<Velocity, RiskError> {
    let Some(previous) = previous else {
        return Ok(fallback.unwrap_or(Velocity::ZERO));
    };

    if current.timestamp_ms <= previous.timestamp_ms {
        // Non-positive by construction; saturate gaps beyond i64 range
        let back_ms = previous.timestamp_ms - current.timestamp_ms;
        let elapsed_ms = i64::try_from(back_ms).map_or(i64::MIN, |b| -b);
        return Err(RiskError::NonPositiveElapsedTime { elapsed_ms });
    }

    let dt = (current.timestamp_ms - previous.timestamp_ms) as f64 / 1000.0;
    let d = current.position - previous.position;

    Ok(Velocity::new(d.x / dt, d.y / dt, d.z / dt))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(x: f64, y: f64, z: f64, t: u64) -> Sample {
        Sample::new(Position3D::new(x, y, z), t)
    }

    #[test]
    fn test_no_history_is_stationary() {
        let v = estimate(None, sample(1.0, 0.0, 10.0, 100), None).unwrap();
        assert_eq!(v, Velocity::ZERO);
    }

    #[test]
    fn test_no_history_uses_fallback() {
        let last = Velocity::new(0.5, 0.0, -3.0);
        let v = estimate(None, sample(1.0, 0.0, 10.0, 100), Some(last)).unwrap();
        assert_eq!(v, last);
    }

    #[test]
    fn test_finite_difference() {
        // 2m closer and 0.5m right over 200ms
        let v = estimate(
            Some(sample(0.0, 0.2, 20.0, 1000)),
            sample(0.5, 0.2, 18.0, 1200),
            None,
        )
        .unwrap();

        assert!((v.vx - 2.5).abs() < 1e-9);
        assert!(v.vy.abs() < 1e-9);
        assert!((v.vz + 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_history_ignores_fallback() {
        let v = estimate(
            Some(sample(0.0, 0.0, 10.0, 0)),
            sample(0.0, 0.0, 11.0, 1000),
            Some(Velocity::new(9.0, 9.0, 9.0)),
        )
        .unwrap();
        assert_eq!(v, Velocity::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_equal_timestamps_rejected() {
        let err = estimate(
            Some(sample(0.0, 0.0, 10.0, 500)),
            sample(0.0, 0.0, 9.0, 500),
            None,
        )
        .unwrap_err();
        assert_eq!(err, RiskError::NonPositiveElapsedTime { elapsed_ms: 0 });
    }

    #[test]
    fn test_out_of_order_rejected() {
        let err = estimate(
            Some(sample(0.0, 0.0, 10.0, 500)),
            sample(0.0, 0.0, 9.0, 400),
            None,
        )
        .unwrap_err();
        assert_eq!(err, RiskError::NonPositiveElapsedTime { elapsed_ms: -100 });
    }

    #[test]
    fn test_huge_timestamp_gap_does_not_overflow() {
        let err = estimate(Some(sample(0.0, 0.0, 10.0, 1 << 63)), sample(0.0, 0.0, 9.0, 0), None)
            .unwrap_err();
        assert_eq!(err, RiskError::NonPositiveElapsedTime { elapsed_ms: i64::MIN });

        let err = estimate(Some(sample(0.0, 0.0, 10.0, u64::MAX)), sample(0.0, 0.0, 9.0, 0), None)
            .unwrap_err();
        assert_eq!(err, RiskError::NonPositiveElapsedTime { elapsed_ms: i64::MIN });

        let err = estimate(
            Some(sample(0.0, 0.0, 10.0, i64::MAX as u64)),
            sample(0.0, 0.0, 9.0, 0),
            None,
        )
        .unwrap_err();
        assert_eq!(err, RiskError::NonPositiveElapsedTime { elapsed_ms: -i64::MAX });
    }
}
