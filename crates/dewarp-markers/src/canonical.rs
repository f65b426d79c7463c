//! Idealized target positions for detected markers.

use std::fmt;
use std::str::FromStr;

use dewarp_core::{bounding_box, RowCol};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{LayoutError, MarkerInfo};

/// Canonical layout template.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CanonicalMode {
    /// Four positions at the margin-inset corners of the frame.
    #[default]
    #[serde(rename = "corners_4")]
    Corners4,
    #[serde(rename = "grid_2x2")]
    Grid2x2,
    #[serde(rename = "grid_3x3")]
    Grid3x3,
    /// Snap detected centroids onto an inferred regular grid.
    #[serde(rename = "auto")]
    Auto,
    /// Min-max normalize detected centroids into the inset frame.
    #[serde(rename = "preserve_relative")]
    PreserveRelative,
}

impl CanonicalMode {
    pub const ALL: [CanonicalMode; 5] = [
        CanonicalMode::Corners4,
        CanonicalMode::Grid2x2,
        CanonicalMode::Grid3x3,
        CanonicalMode::Auto,
        CanonicalMode::PreserveRelative,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CanonicalMode::Corners4 => "corners_4",
            CanonicalMode::Grid2x2 => "grid_2x2",
            CanonicalMode::Grid3x3 => "grid_3x3",
            CanonicalMode::Auto => "auto",
            CanonicalMode::PreserveRelative => "preserve_relative",
        }
    }
}

impl fmt::Display for CanonicalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CanonicalMode {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CanonicalMode::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| LayoutError::UnknownMode(s.to_string()))
    }
}

/// Frame and spacing settings for [`define_canonical_positions`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanonicalParams {
    /// Target frame as `(rows, cols)`. Defaults to the centroid bounding box
    /// extended by `margin`.
    pub image_size: Option<(usize, usize)>,
    /// Inset from the frame border, in pixels.
    pub margin: f64,
    /// Grid pitch for the grid and `auto` modes; derived when `None`.
    pub spacing: Option<f64>,
}

impl Default for CanonicalParams {
    fn default() -> Self {
        Self {
            image_size: None,
            margin: 50.0,
            spacing: None,
        }
    }
}

impl CanonicalParams {
    /// Check `margin` and `spacing` independently of the frame.
    pub fn validate(&self) -> Result<(), LayoutError> {
        if !self.margin.is_finite() || self.margin < 0.0 {
            return Err(LayoutError::InvalidMargin(self.margin));
        }
        match self.spacing {
            Some(s) if !(s.is_finite() && s > 0.0) => Err(LayoutError::InvalidSpacing(s)),
            _ => Ok(()),
        }
    }
}

/// Produce target `(row, col)` positions for `markers` under `mode`.
///
/// Template modes (`corners_4`, grids) return a fixed number of slots
/// regardless of how many markers were found; the mismatch is reported and
/// left to correspondence, which truncates to the shorter list.
pub fn define_canonical_positions(
    markers: &[MarkerInfo],
    mode: CanonicalMode,
    params: &CanonicalParams,
) -> Result<Vec<RowCol>, LayoutError> {
    params.validate()?;
    let positions = match mode {
        CanonicalMode::Corners4 => {
            if markers.len() != 4 {
                warn!(
                    "corners_4 expects 4 markers, got {}; extra markers are dropped",
                    markers.len()
                );
            }
            let (h, w) = resolve_frame(markers, params)?;
            let m = params.margin;
            vec![
                RowCol::new(m, m),
                RowCol::new(m, w - m),
                RowCol::new(h - m, w - m),
                RowCol::new(h - m, m),
            ]
        }
        CanonicalMode::Grid2x2 => grid_positions(markers, 2, params)?,
        CanonicalMode::Grid3x3 => grid_positions(markers, 3, params)?,
        CanonicalMode::Auto => snap_to_grid(markers, params.spacing)?,
        CanonicalMode::PreserveRelative => preserve_relative(markers, params)?,
    };
    debug!("{} canonical positions for mode {}", positions.len(), mode);
    Ok(positions)
}

/// Frame `(height, width)` with a validated margin.
fn resolve_frame(markers: &[MarkerInfo], params: &CanonicalParams) -> Result<(f64, f64), LayoutError> {
    let margin = params.margin;
    let (h, w) = match params.image_size {
        Some((rows, cols)) => (rows as f64, cols as f64),
        None => {
            let centroids: Vec<RowCol> = markers.iter().map(|m| m.centroid).collect();
            let (_, hi) = bounding_box(&centroids).ok_or(LayoutError::NoMarkers)?;
            (hi.row + margin, hi.col + margin)
        }
    };
    if !margin.is_finite() || margin < 0.0 || 2.0 * margin >= h || 2.0 * margin >= w {
        return Err(LayoutError::InvalidFrame {
            height: h,
            width: w,
            margin,
        });
    }
    Ok((h, w))
}

fn grid_positions(
    markers: &[MarkerInfo],
    n: usize,
    params: &CanonicalParams,
) -> Result<Vec<RowCol>, LayoutError> {
    if markers.len() != n * n {
        warn!(
            "grid_{n}x{n} expects {} markers, got {}",
            n * n,
            markers.len()
        );
    }
    let m = params.margin;
    let (row_step, col_step) = match params.spacing {
        Some(s) => (s, s),
        None => {
            let (h, w) = resolve_frame(markers, params)?;
            let cells = (n - 1) as f64;
            ((h - 2.0 * m) / cells, (w - 2.0 * m) / cells)
        }
    };
    let mut out = Vec::with_capacity(n * n);
    for i in 0..n {
        for j in 0..n {
            out.push(RowCol::new(
                m + i as f64 * row_step,
                m + j as f64 * col_step,
            ));
        }
    }
    Ok(out)
}

/// Gap between sorted coordinates that starts a new grid line, as a
/// fraction of the largest observed gap.
const LINE_GAP_FRACTION: f64 = 0.5;

/// Estimate grid pitch along one axis from sorted centroid coordinates.
///
/// Consecutive coordinates closer than `min_gap` (or than half of the
/// largest gap) belong to the same line. Returns `None` for a single line.
fn estimate_line_spacing(values: &[f64], min_gap: f64) -> Option<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let gaps: Vec<f64> = sorted.windows(2).map(|w| w[1] - w[0]).collect();
    let max_gap = gaps.iter().cloned().fold(0.0, f64::max);
    let threshold = (LINE_GAP_FRACTION * max_gap).max(min_gap);
    let mut line_gaps: Vec<f64> = gaps.into_iter().filter(|&g| g > threshold).collect();
    if line_gaps.is_empty() {
        return None;
    }
    line_gaps.sort_by(f64::total_cmp);
    Some(line_gaps[line_gaps.len() / 2])
}

/// Snap coordinates to `anchor + k * step`.
///
/// Line indices `k` come from `step`; with `refine` the pitch is then
/// re-fitted by least squares over all coordinates. The anchor is always
/// fitted.
fn snap_axis(values: &[f64], step: Option<f64>, refine: bool) -> Vec<f64> {
    let n = values.len() as f64;
    let lo = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let ks: Vec<f64> = match step {
        Some(s) if s > 0.0 => values.iter().map(|v| ((v - lo) / s).round()).collect(),
        _ => vec![0.0; values.len()],
    };
    let mut s = step.unwrap_or(0.0);

    let k_mean = ks.iter().sum::<f64>() / n;
    let v_mean = values.iter().sum::<f64>() / n;
    if refine {
        let (num, den) = values
            .iter()
            .zip(&ks)
            .fold((0.0, 0.0), |(num, den), (v, k)| {
                (num + (k - k_mean) * (v - v_mean), den + (k - k_mean) * (k - k_mean))
            });
        if den > 0.0 {
            s = num / den;
        }
    }
    let anchor = v_mean - s * k_mean;
    ks.iter().map(|k| anchor + k * s).collect()
}

fn snap_to_grid(markers: &[MarkerInfo], spacing: Option<f64>) -> Result<Vec<RowCol>, LayoutError> {
    if markers.is_empty() {
        return Err(LayoutError::NoMarkers);
    }
    let rows: Vec<f64> = markers.iter().map(|m| m.centroid.row).collect();
    let cols: Vec<f64> = markers.iter().map(|m| m.centroid.col).collect();

    // Centroids closer than one marker side are on the same line.
    let mut sizes: Vec<usize> = markers.iter().map(|m| m.size).collect();
    sizes.sort_unstable();
    let marker_side = (sizes[sizes.len() / 2] as f64).sqrt();

    let row_step = spacing.or_else(|| estimate_line_spacing(&rows, marker_side));
    let col_step = spacing.or_else(|| estimate_line_spacing(&cols, marker_side));
    debug!("auto grid pitch rows={row_step:?} cols={col_step:?}");

    let refine = spacing.is_none();
    let snapped_rows = snap_axis(&rows, row_step, refine);
    let snapped_cols = snap_axis(&cols, col_step, refine);
    Ok(snapped_rows
        .into_iter()
        .zip(snapped_cols)
        .map(|(r, c)| RowCol::new(r, c))
        .collect())
}

fn preserve_relative(
    markers: &[MarkerInfo],
    params: &CanonicalParams,
) -> Result<Vec<RowCol>, LayoutError> {
    let centroids: Vec<RowCol> = markers.iter().map(|m| m.centroid).collect();
    let (lo, hi) = bounding_box(&centroids).ok_or(LayoutError::NoMarkers)?;
    let (h, w) = resolve_frame(markers, params)?;
    let m = params.margin;

    let normalize = |v: f64, lo: f64, hi: f64, extent: f64| {
        let span = extent - 2.0 * m;
        if hi - lo <= f64::EPSILON {
            m + 0.5 * span
        } else {
            m + (v - lo) / (hi - lo) * span
        }
    };
    Ok(centroids
        .iter()
        .map(|p| {
            RowCol::new(
                normalize(p.row, lo.row, hi.row, h),
                normalize(p.col, lo.col, hi.col, w),
            )
        })
        .collect())
}
