//! Thin-plate spline fitting and evaluation.
//!
//! The model maps `(row, col)` to `(row', col')`:
//!
//! ```text
//! f(p) = a0 + a1 * row + a2 * col + Σ w_i φ(|p - c_i|),   φ(r) = r² ln r
//! ```
//!
//! with one independent set of `(w, a)` per output channel.

use dewarp_core::{centroid, RowCol};
use log::{debug, warn};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::TpsError;

/// Relative singular value threshold for the rank check.
const SINGULAR_RTOL: f64 = 1e-12;

/// Radial basis `φ(r) = r² ln r`, with `φ(0) = 0`.
#[inline]
pub fn tps_kernel(r: f64) -> f64 {
    if r <= 0.0 {
        0.0
    } else {
        r * r * r.ln()
    }
}

/// Same kernel from a squared distance: `r² ln r = ½ r² ln r²`.
#[inline]
fn kernel_sq(r2: f64) -> f64 {
    if r2 <= 0.0 {
        0.0
    } else {
        0.5 * r2 * r2.ln()
    }
}

/// A fitted thin-plate spline.
///
/// Affine coefficients are ordered `[bias, row, col]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TpsModel {
    pub control_points: Vec<RowCol>,
    pub weights_row: Vec<f64>,
    pub weights_col: Vec<f64>,
    pub affine_row: [f64; 3],
    pub affine_col: [f64; 3],
}

impl TpsModel {
    pub fn num_control_points(&self) -> usize {
        self.control_points.len()
    }

    /// Map one point. Costs one kernel evaluation per control point.
    #[inline]
    pub fn apply(&self, p: RowCol) -> RowCol {
        let [ar0, ar1, ar2] = self.affine_row;
        let [ac0, ac1, ac2] = self.affine_col;
        let mut row = ar0 + ar1 * p.row + ar2 * p.col;
        let mut col = ac0 + ac1 * p.row + ac2 * p.col;
        for ((c, wr), wc) in self
            .control_points
            .iter()
            .zip(&self.weights_row)
            .zip(&self.weights_col)
        {
            let u = kernel_sq(p.distance_sq(c));
            row += wr * u;
            col += wc * u;
        }
        RowCol::new(row, col)
    }

    pub fn apply_all(&self, points: &[RowCol]) -> Vec<RowCol> {
        points.iter().map(|&p| self.apply(p)).collect()
    }

    /// `wᵀ K w` summed over both output channels.
    ///
    /// Zero for a purely affine fit; grows with how much the spline bends.
    pub fn bending_energy(&self) -> f64 {
        let n = self.control_points.len();
        let mut energy = 0.0;
        for i in 0..n {
            for j in 0..n {
                let k = kernel_sq(self.control_points[i].distance_sq(&self.control_points[j]));
                energy += k
                    * (self.weights_row[i] * self.weights_row[j]
                        + self.weights_col[i] * self.weights_col[j]);
            }
        }
        energy
    }
}

fn check_finite(which: &'static str, points: &[RowCol]) -> Result<(), TpsError> {
    match points
        .iter()
        .position(|p| !(p.row.is_finite() && p.col.is_finite()))
    {
        Some(index) => Err(TpsError::NonFinite { which, index }),
        None => Ok(()),
    }
}

/// Fit a spline taking each `source[i]` to `target[i]`.
///
/// `regularization` (λ) is added to the kernel diagonal; `0` interpolates
/// exactly, larger values trade exactness for smoothness. Duplicated control
/// points are only solvable with `λ > 0`; collinear ones never are.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(source, target), fields(n = source.len()))
)]
pub fn fit_tps(
    source: &[RowCol],
    target: &[RowCol],
    regularization: f64,
) -> Result<TpsModel, TpsError> {
    if source.len() != target.len() {
        return Err(TpsError::LengthMismatch {
            sources: source.len(),
            targets: target.len(),
        });
    }
    let n = source.len();
    if n < 3 {
        return Err(TpsError::TooFewPoints(n));
    }
    if !regularization.is_finite() || regularization < 0.0 {
        return Err(TpsError::InvalidRegularization(regularization));
    }
    check_finite("source", source)?;
    check_finite("target", target)?;
    warn_on_duplicates(source);

    // Solved in centered, unit-scale coordinates. With `Pᵀw = 0`, scaling the
    // kernel argument by `s` rescales `w` by `s²` and `λ` by `1 / s²` and
    // shifts the affine bias; the fitted function is the same.
    let (center, scale) = normalization(source);
    let normalized: Vec<RowCol> = source
        .iter()
        .map(|p| RowCol::new((p.row - center.row) / scale, (p.col - center.col) / scale))
        .collect();
    let lambda = regularization / (scale * scale);

    let size = n + 3;
    let mut system = DMatrix::<f64>::zeros(size, size);
    let mut rhs = DMatrix::<f64>::zeros(size, 2);
    for i in 0..n {
        for j in (i + 1)..n {
            let k = kernel_sq(normalized[i].distance_sq(&normalized[j]));
            system[(i, j)] = k;
            system[(j, i)] = k;
        }
        system[(i, i)] = lambda;

        let affine = [1.0, normalized[i].row, normalized[i].col];
        for (a, v) in affine.into_iter().enumerate() {
            system[(i, n + a)] = v;
            system[(n + a, i)] = v;
        }
        rhs[(i, 0)] = target[i].row;
        rhs[(i, 1)] = target[i].col;
    }

    let svd = system.svd(true, true);
    let eps = SINGULAR_RTOL * svd.singular_values.max();
    let rank = svd.rank(eps);
    if rank < size {
        return Err(TpsError::Singular { rank, size });
    }
    let solution = svd
        .solve(&rhs, eps)
        .map_err(|_| TpsError::Singular { rank, size })?;

    let denormalize = |ch: usize| -> (Vec<f64>, [f64; 3]) {
        let w: Vec<f64> = (0..n).map(|i| solution[(i, ch)]).collect();
        let [a0, a1, a2] = [solution[(n, ch)], solution[(n + 1, ch)], solution[(n + 2, ch)]];
        let offset: f64 = w
            .iter()
            .zip(&normalized)
            .map(|(wi, p)| wi * (p.row * p.row + p.col * p.col))
            .sum();
        let bias = a0 - offset * scale.ln() - (a1 * center.row + a2 * center.col) / scale;
        let weights = w.iter().map(|wi| wi / (scale * scale)).collect();
        (weights, [bias, a1 / scale, a2 / scale])
    };
    let (weights_row, affine_row) = denormalize(0);
    let (weights_col, affine_col) = denormalize(1);

    let model = TpsModel {
        control_points: source.to_vec(),
        weights_row,
        weights_col,
        affine_row,
        affine_col,
    };
    debug!(
        "fitted TPS on {n} points (lambda={regularization}), bending energy {:.3e}",
        model.bending_energy()
    );
    Ok(model)
}

/// Centroid and mean distance to it (`1` when all points coincide).
fn normalization(points: &[RowCol]) -> (RowCol, f64) {
    let center = centroid(points).unwrap_or_default();
    let mean_dist =
        points.iter().map(|p| p.distance(&center)).sum::<f64>() / points.len().max(1) as f64;
    let scale = if mean_dist > f64::EPSILON { mean_dist } else { 1.0 };
    (center, scale)
}

fn warn_on_duplicates(points: &[RowCol]) {
    for (i, p) in points.iter().enumerate() {
        if points[i + 1..].iter().any(|q| p.distance_sq(q) == 0.0) {
            warn!(
                "duplicate control point at ({:.2}, {:.2}); the fit needs regularization > 0",
                p.row, p.col
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn pts(v: &[(f64, f64)]) -> Vec<RowCol> {
        v.iter().map(|&(r, c)| RowCol::new(r, c)).collect()
    }

    fn source_points() -> Vec<RowCol> {
        pts(&[
            (20.0, 20.0),
            (20.0, 480.0),
            (480.0, 480.0),
            (480.0, 20.0),
            (250.0, 240.0),
            (130.0, 370.0),
        ])
    }

    #[test]
    fn kernel_values() {
        assert_eq!(tps_kernel(0.0), 0.0);
        assert_eq!(tps_kernel(1.0), 0.0);
        assert_abs_diff_eq!(tps_kernel(2.0), 4.0 * 2f64.ln(), epsilon = 1e-12);
        assert_abs_diff_eq!(kernel_sq(9.0), tps_kernel(3.0), epsilon = 1e-12);
    }

    #[test]
    fn kernel_is_symmetric_in_point_order() {
        let p = source_points();
        for a in &p {
            for b in &p {
                assert_eq!(kernel_sq(a.distance_sq(b)), kernel_sq(b.distance_sq(a)));
            }
        }
    }

    #[test]
    fn interpolates_control_points_exactly() {
        let source = source_points();
        let target = pts(&[
            (25.0, 18.0),
            (14.0, 470.0),
            (490.0, 475.0),
            (470.0, 31.0),
            (262.0, 236.0),
            (120.0, 380.0),
        ]);
        let model = fit_tps(&source, &target, 0.0).expect("well posed");
        for (s, t) in source.iter().zip(&target) {
            let m = model.apply(*s);
            assert_abs_diff_eq!(m.row, t.row, epsilon = 1e-6);
            assert_abs_diff_eq!(m.col, t.col, epsilon = 1e-6);
        }
        assert!(model.bending_energy() > 0.0);
    }

    #[test]
    fn affine_data_collapses_spline_term() {
        // target = A * source + b
        let (a11, a12, a21, a22) = (1.1, 0.2, -0.15, 0.9);
        let (b_row, b_col) = (7.0, -12.0);
        let source = source_points();
        let target: Vec<RowCol> = source
            .iter()
            .map(|p| {
                RowCol::new(
                    b_row + a11 * p.row + a12 * p.col,
                    b_col + a21 * p.row + a22 * p.col,
                )
            })
            .collect();
        let model = fit_tps(&source, &target, 0.0).expect("well posed");
        for w in model.weights_row.iter().chain(&model.weights_col) {
            assert_abs_diff_eq!(*w, 0.0, epsilon = 1e-9);
        }
        assert_abs_diff_eq!(model.affine_row[0], b_row, epsilon = 1e-6);
        assert_abs_diff_eq!(model.affine_row[1], a11, epsilon = 1e-8);
        assert_abs_diff_eq!(model.affine_row[2], a12, epsilon = 1e-8);
        assert_abs_diff_eq!(model.affine_col[0], b_col, epsilon = 1e-6);
        assert_abs_diff_eq!(model.affine_col[1], a21, epsilon = 1e-8);
        assert_abs_diff_eq!(model.affine_col[2], a22, epsilon = 1e-8);
        assert_abs_diff_eq!(model.bending_energy(), 0.0, epsilon = 1e-6);

        let q = model.apply(RowCol::new(300.0, 100.0));
        assert_abs_diff_eq!(q.row, b_row + a11 * 300.0 + a12 * 100.0, epsilon = 1e-6);
        assert_abs_diff_eq!(q.col, b_col + a21 * 300.0 + a22 * 100.0, epsilon = 1e-6);
    }

    #[test]
    fn rejects_bad_inputs() {
        let p = source_points();
        assert_eq!(
            fit_tps(&p[..2], &p[..2], 0.0),
            Err(TpsError::TooFewPoints(2))
        );
        assert_eq!(
            fit_tps(&p, &p[..4], 0.0),
            Err(TpsError::LengthMismatch {
                sources: 6,
                targets: 4
            })
        );
        assert_eq!(
            fit_tps(&p, &p, -1.0),
            Err(TpsError::InvalidRegularization(-1.0))
        );
        assert!(matches!(
            fit_tps(&p, &p, f64::NAN),
            Err(TpsError::InvalidRegularization(_))
        ));
    }

    #[test]
    fn rejects_non_finite_points() {
        let square = pts(&[(0.0, 0.0), (0.0, 10.0), (10.0, 10.0), (10.0, 0.0)]);
        let mut bad = square.clone();
        bad[2] = RowCol::new(f64::NAN, 10.0);
        assert_eq!(
            fit_tps(&square, &bad, 0.0),
            Err(TpsError::NonFinite {
                which: "target",
                index: 2
            })
        );
        bad[2] = RowCol::new(10.0, f64::INFINITY);
        assert_eq!(
            fit_tps(&bad, &square, 0.0),
            Err(TpsError::NonFinite {
                which: "source",
                index: 2
            })
        );
        let all_nan = vec![RowCol::new(f64::NAN, f64::NAN); 4];
        assert!(matches!(
            fit_tps(&all_nan, &square, 1.0),
            Err(TpsError::NonFinite { .. })
        ));
    }

    #[test]
    fn duplicates_need_regularization() {
        let source = pts(&[(0.0, 0.0), (0.0, 100.0), (100.0, 0.0), (100.0, 100.0), (100.0, 100.0)]);
        let target = pts(&[(1.0, 1.0), (0.0, 99.0), (101.0, 0.0), (99.0, 102.0), (100.0, 98.0)]);
        assert!(matches!(
            fit_tps(&source, &target, 0.0),
            Err(TpsError::Singular { .. })
        ));
        let model = fit_tps(&source, &target, 1.0).expect("regularized");
        let m = model.apply(RowCol::new(0.0, 0.0));
        assert!(m.distance(&RowCol::new(1.0, 1.0)) < 5.0);
    }

    #[test]
    fn collinear_points_are_singular() {
        let source = pts(&[(0.0, 0.0), (10.0, 10.0), (20.0, 20.0), (30.0, 30.0)]);
        assert!(matches!(
            fit_tps(&source, &source, 0.5),
            Err(TpsError::Singular { .. })
        ));
    }

    #[test]
    fn regularization_relaxes_interpolation() {
        let source = source_points();
        let mut target = source.clone();
        target[4] = RowCol::new(270.0, 260.0);
        let exact = fit_tps(&source, &target, 0.0).expect("well posed");
        let smooth = fit_tps(&source, &target, 1e6).expect("well posed");
        let exact_err = exact.apply(source[4]).distance(&target[4]);
        let smooth_err = smooth.apply(source[4]).distance(&target[4]);
        assert!(exact_err < 1e-6);
        assert!(smooth_err > exact_err);
        assert!(smooth.bending_energy() < exact.bending_energy());
    }
}
