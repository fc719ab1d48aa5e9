//! Temperature to fan duty curve
//!
//! Maps a temperature to a duty percent with step semantics: each point
//! holds from its own threshold up to (but not including) the next one, so
//! the fan runs at a handful of fixed speeds instead of creeping around.

use serde::{Deserialize, Serialize};

use zf_error::{Result, ZonefanError};

use crate::constants::limits;

/// One point of a fan curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    /// Temperature threshold in °C at which this point takes over
    pub threshold_c: f64,
    /// Duty percent (0-100) held from this threshold upward
    pub fan_percent: f64,
}

/// Immutable temperature -> duty mapping.
///
/// Points are kept sorted ascending by threshold. `resolve` picks the
/// greatest threshold at or below the queried temperature; temperatures below
/// the lowest threshold clamp to the lowest point's percent, so the lookup
/// is total over the real line.
#[derive(Debug, Clone)]
pub struct FanCurve {
    points: Vec<CurvePoint>,
}

impl FanCurve {
    /// Build a curve from points in any order.
    ///
    /// Rejects an empty or oversized point set, non-finite values, percents
    /// outside 0-100, and duplicate thresholds.
    pub fn new(mut points: Vec<CurvePoint>) -> Result<Self> {
        if points.is_empty() {
            return Err(ZonefanError::config("fan curve has no points"));
        }
        if points.len() > limits::MAX_CURVE_POINTS {
            return Err(ZonefanError::config(format!(
                "fan curve has {} points (max {})",
                points.len(),
                limits::MAX_CURVE_POINTS
            )));
        }
        for point in &points {
            if !point.threshold_c.is_finite() {
                return Err(ZonefanError::InvalidThreshold {
                    value: point.threshold_c,
                });
            }
            validate_percent(point.fan_percent)?;
        }

        points.sort_by(|a, b| a.threshold_c.total_cmp(&b.threshold_c));
        for pair in points.windows(2) {
            if pair[0].threshold_c == pair[1].threshold_c {
                return Err(ZonefanError::config(format!(
                    "duplicate curve threshold {}°C",
                    pair[0].threshold_c
                )));
            }
        }

        Ok(Self { points })
    }

    /// Resolve the duty percent for a temperature.
    pub fn resolve(&self, temp_c: f64) -> f64 {
        self.points
            .iter()
            .rev()
            .find(|point| point.threshold_c <= temp_c)
            .unwrap_or(&self.points[0])
            .fan_percent
    }

    /// The curve points, sorted ascending by threshold
    pub fn points(&self) -> &[CurvePoint] {
        &self.points
    }
}

/// Validate a fan percentage is finite and within 0-100
pub fn validate_percent(value: f64) -> Result<()> {
    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return Err(ZonefanError::InvalidPercentage { value });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_curve() -> FanCurve {
        FanCurve::new(vec![
            CurvePoint { threshold_c: 30.0, fan_percent: 20.0 },
            CurvePoint { threshold_c: 50.0, fan_percent: 40.0 },
            CurvePoint { threshold_c: 70.0, fan_percent: 80.0 },
        ])
        .unwrap()
    }

    #[test]
    fn test_resolve_at_thresholds() {
        let curve = test_curve();
        assert_eq!(curve.resolve(30.0), 20.0);
        assert_eq!(curve.resolve(50.0), 40.0);
        assert_eq!(curve.resolve(70.0), 80.0);
    }

    #[test]
    fn test_step_holds_until_next_threshold() {
        let curve = test_curve();
        assert_eq!(curve.resolve(45.0), 20.0);
        assert_eq!(curve.resolve(65.0), 40.0);
        assert_eq!(curve.resolve(69.9), 40.0);
    }

    #[test]
    fn test_below_minimum_clamps_to_lowest_point() {
        let curve = test_curve();
        assert_eq!(curve.resolve(25.0), 20.0);
        assert_eq!(curve.resolve(-40.0), 20.0);
    }

    #[test]
    fn test_above_maximum_uses_highest_point() {
        let curve = test_curve();
        assert_eq!(curve.resolve(90.0), 80.0);
        assert_eq!(curve.resolve(200.0), 80.0);
    }

    #[test]
    fn test_single_point_covers_everything() {
        let curve = FanCurve::new(vec![CurvePoint {
            threshold_c: 0.0,
            fan_percent: 100.0,
        }])
        .unwrap();
        assert_eq!(curve.resolve(-20.0), 100.0);
        assert_eq!(curve.resolve(85.0), 100.0);
    }

    #[test]
    fn test_unsorted_input_is_sorted() {
        let curve = FanCurve::new(vec![
            CurvePoint { threshold_c: 70.0, fan_percent: 80.0 },
            CurvePoint { threshold_c: 30.0, fan_percent: 20.0 },
            CurvePoint { threshold_c: 50.0, fan_percent: 40.0 },
        ])
        .unwrap();
        assert_eq!(curve.resolve(65.0), 40.0);
        assert_eq!(curve.points()[0].threshold_c, 30.0);
    }

    #[test]
    fn test_empty_curve_rejected() {
        let err = FanCurve::new(vec![]).unwrap_err();
        assert!(matches!(err, ZonefanError::Config(_)));
    }

    #[test]
    fn test_oversized_curve_rejected() {
        let points = (0..=limits::MAX_CURVE_POINTS)
            .map(|i| CurvePoint {
                threshold_c: i as f64,
                fan_percent: 50.0,
            })
            .collect();
        let err = FanCurve::new(points).unwrap_err();
        assert!(matches!(err, ZonefanError::Config(_)));
    }

    #[test]
    fn test_duplicate_threshold_rejected() {
        let err = FanCurve::new(vec![
            CurvePoint { threshold_c: 30.0, fan_percent: 20.0 },
            CurvePoint { threshold_c: 30.0, fan_percent: 40.0 },
        ])
        .unwrap_err();
        assert!(matches!(err, ZonefanError::Config(_)));
    }

    #[test]
    fn test_out_of_range_percent_rejected() {
        let err = FanCurve::new(vec![CurvePoint {
            threshold_c: 30.0,
            fan_percent: 150.0,
        }])
        .unwrap_err();
        assert!(matches!(err, ZonefanError::InvalidPercentage { .. }));
    }

    #[test]
    fn test_non_finite_threshold_rejected() {
        let err = FanCurve::new(vec![CurvePoint {
            threshold_c: f64::NAN,
            fan_percent: 50.0,
        }])
        .unwrap_err();
        assert!(matches!(err, ZonefanError::InvalidThreshold { .. }));
    }

    #[test]
    fn test_resolution_is_monotonic() {
        let curve = test_curve();
        let mut last = f64::NEG_INFINITY;
        for tenth in -100..1500 {
            let duty = curve.resolve(f64::from(tenth) / 10.0);
            assert!(duty >= last, "duty dropped as temperature rose");
            last = duty;
        }
    }
}
