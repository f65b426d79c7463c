//! Fit-quality diagnostics.

use dewarp_core::RowCol;
use serde::{Deserialize, Serialize};

use crate::{fit_tps, TpsError, TpsModel};

/// Mean, max and per-point Euclidean distances.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DistanceStats {
    pub mean: f64,
    pub max: f64,
    pub per_point: Vec<f64>,
}

impl DistanceStats {
    pub fn from_distances(per_point: Vec<f64>) -> Self {
        if per_point.is_empty() {
            return Self::default();
        }
        let mean = per_point.iter().sum::<f64>() / per_point.len() as f64;
        let max = per_point.iter().cloned().fold(0.0, f64::max);
        Self {
            mean,
            max,
            per_point,
        }
    }

    fn between(a: &[RowCol], b: &[RowCol]) -> Self {
        Self::from_distances(a.iter().zip(b).map(|(p, q)| p.distance(q)).collect())
    }
}

/// How far the forward (source → target) fit lands from each target.
///
/// Measures fit tightness on the control points themselves: `≈ 0` for
/// `regularization = 0`, growing with λ.
pub fn residual_error(
    source: &[RowCol],
    target: &[RowCol],
    regularization: f64,
) -> Result<DistanceStats, TpsError> {
    let forward = fit_tps(source, target, regularization)?;
    Ok(residual_error_with_model(&forward, target))
}

/// [`residual_error`] for an already fitted forward model.
pub fn residual_error_with_model(forward: &TpsModel, target: &[RowCol]) -> DistanceStats {
    let mapped = forward.apply_all(&forward.control_points);
    DistanceStats::between(&mapped, target)
}

/// Displacement between paired points, independent of any fit.
pub fn deformation_magnitude(source: &[RowCol], target: &[RowCol]) -> DistanceStats {
    DistanceStats::between(source, target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn pts(v: &[(f64, f64)]) -> Vec<RowCol> {
        v.iter().map(|&(r, c)| RowCol::new(r, c)).collect()
    }

    #[test]
    fn deformation_reports_displacements() {
        let source = pts(&[(0.0, 0.0), (10.0, 0.0), (0.0, 10.0)]);
        let target = pts(&[(3.0, 4.0), (10.0, 0.0), (0.0, 11.0)]);
        let d = deformation_magnitude(&source, &target);
        assert_eq!(d.per_point, vec![5.0, 0.0, 1.0]);
        assert_abs_diff_eq!(d.mean, 2.0);
        assert_eq!(d.max, 5.0);
    }

    #[test]
    fn residual_vanishes_without_regularization() {
        let source = pts(&[(20.0, 20.0), (20.0, 480.0), (480.0, 480.0), (480.0, 20.0), (240.0, 260.0)]);
        let target = pts(&[(25.0, 15.0), (12.0, 470.0), (486.0, 490.0), (470.0, 30.0), (250.0, 250.0)]);
        let r = residual_error(&source, &target, 0.0).expect("fit");
        assert_eq!(r.per_point.len(), 5);
        assert!(r.max < 1e-6);

        let relaxed = residual_error(&source, &target, 1e7).expect("fit");
        assert!(relaxed.mean > r.mean);
    }

    #[test]
    fn empty_stats_are_zero() {
        let d = deformation_magnitude(&[], &[]);
        assert_eq!(d, DistanceStats::default());
    }
}
