//! `(row, col)` points and the closed-form 2×2 symmetric eigensolver used for
//! per-component principal axes.

use std::ops::{Add, Sub};

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

/// A pixel-space location, `row` down and `col` right.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RowCol {
    pub row: f64,
    pub col: f64,
}

impl RowCol {
    #[inline]
    pub const fn new(row: f64, col: f64) -> Self {
        Self { row, col }
    }

    #[inline]
    pub fn distance_sq(&self, other: &RowCol) -> f64 {
        let dr = self.row - other.row;
        let dc = self.col - other.col;
        dr * dr + dc * dc
    }

    #[inline]
    pub fn distance(&self, other: &RowCol) -> f64 {
        self.distance_sq(other).sqrt()
    }

    #[inline]
    pub fn to_vector(self) -> Vector2<f64> {
        Vector2::new(self.row, self.col)
    }

    #[inline]
    pub fn from_vector(v: Vector2<f64>) -> Self {
        Self::new(v[0], v[1])
    }
}

impl From<[f64; 2]> for RowCol {
    fn from([row, col]: [f64; 2]) -> Self {
        Self { row, col }
    }
}

impl From<RowCol> for [f64; 2] {
    fn from(p: RowCol) -> Self {
        [p.row, p.col]
    }
}

impl Add for RowCol {
    type Output = RowCol;
    fn add(self, rhs: RowCol) -> RowCol {
        RowCol::new(self.row + rhs.row, self.col + rhs.col)
    }
}

impl Sub for RowCol {
    type Output = RowCol;
    fn sub(self, rhs: RowCol) -> RowCol {
        RowCol::new(self.row - rhs.row, self.col - rhs.col)
    }
}

/// Mean of a point set.
pub fn centroid(points: &[RowCol]) -> Option<RowCol> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    let (sr, sc) = points
        .iter()
        .fold((0.0, 0.0), |(sr, sc), p| (sr + p.row, sc + p.col));
    Some(RowCol::new(sr / n, sc / n))
}

/// Axis-aligned `(min, max)` corners of a point set.
pub fn bounding_box(points: &[RowCol]) -> Option<(RowCol, RowCol)> {
    let first = *points.first()?;
    Some(points.iter().fold((first, first), |(lo, hi), p| {
        (
            RowCol::new(lo.row.min(p.row), lo.col.min(p.col)),
            RowCol::new(hi.row.max(p.row), hi.col.max(p.col)),
        )
    }))
}

/// Relative eigenvalue gap below which a 2×2 matrix is treated as isotropic.
const ISOTROPY_RTOL: f64 = 1e-12;

/// Eigen-decomposition of a symmetric 2×2 matrix.
///
/// `values[0] >= values[1]`; `vectors[k]` is the unit eigenvector of
/// `values[k]`, and the two vectors are orthonormal.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SymmetricEigen2 {
    pub values: [f64; 2],
    pub vectors: [Vector2<f64>; 2],
}

/// Closed-form eigensolver for `[[a, b], [b, c]]`.
///
/// A (numerically) isotropic matrix has no preferred axis; the coordinate
/// axes are returned, `row` first.
pub fn symmetric_eigen2(a: f64, b: f64, c: f64) -> SymmetricEigen2 {
    let mean = 0.5 * (a + c);
    let half_diff = 0.5 * (a - c);
    let disc = (half_diff * half_diff + b * b).sqrt();
    let l0 = mean + disc;
    let l1 = mean - disc;

    if disc <= ISOTROPY_RTOL * (a.abs() + c.abs()) {
        return SymmetricEigen2 {
            values: [l0, l1],
            vectors: [Vector2::new(1.0, 0.0), Vector2::new(0.0, 1.0)],
        };
    }

    // (A - l0 I) v = 0; pick the better conditioned of the two row equations.
    let v = if a >= c {
        Vector2::new(l0 - c, b)
    } else {
        Vector2::new(b, l0 - a)
    };
    let v0 = v / v.norm();
    let v1 = Vector2::new(-v0[1], v0[0]);

    SymmetricEigen2 {
        values: [l0, l1],
        vectors: [v0, v1],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Matrix2;

    #[test]
    fn eigen_pairs_satisfy_definition() {
        for &(a, b, c) in &[
            (4.0, 1.0, 2.0),
            (1.0, -3.0, 1.0),
            (0.5, 0.0, 7.0),
            (9.0, 0.0, 0.5),
            (2.0, 2.0, 2.0),
        ] {
            let m = Matrix2::new(a, b, b, c);
            let e = symmetric_eigen2(a, b, c);
            assert!(e.values[0] >= e.values[1]);
            for k in 0..2 {
                let mv = m * e.vectors[k];
                let lv = e.vectors[k] * e.values[k];
                assert_relative_eq!(mv, lv, epsilon = 1e-9);
                assert_relative_eq!(e.vectors[k].norm(), 1.0, epsilon = 1e-12);
            }
            assert_relative_eq!(e.vectors[0].dot(&e.vectors[1]), 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn isotropic_falls_back_to_first_axis() {
        let e = symmetric_eigen2(3.0, 0.0, 3.0);
        assert_eq!(e.values, [3.0, 3.0]);
        assert_eq!(e.vectors[0], Vector2::new(1.0, 0.0));
    }

    #[test]
    fn centroid_and_bbox() {
        let pts = [
            RowCol::new(0.0, 0.0),
            RowCol::new(2.0, 4.0),
            RowCol::new(4.0, 2.0),
        ];
        assert_eq!(centroid(&pts), Some(RowCol::new(2.0, 2.0)));
        assert_eq!(
            bounding_box(&pts),
            Some((RowCol::new(0.0, 0.0), RowCol::new(4.0, 4.0)))
        );
        assert!(centroid(&[]).is_none());
        assert_relative_eq!(pts[0].distance(&pts[1]), 20f64.sqrt());
    }
}
