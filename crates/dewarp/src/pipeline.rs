//! End-to-end dewarping: detect → canonical layout → correspond → fit → warp.

use dewarp_core::{BitMatrix, ImageError, RgbImage, RgbImageView, RowCol};
use dewarp_markers::{
    define_canonical_positions, detect_markers, establish_correspondence, CanonicalMode,
    CanonicalParams, Correspondence, DetectParams, LayoutError, MarkerInfo, MatchMethod,
};
use dewarp_tps::{
    deformation_magnitude, fit_tps, residual_error_with_model, warp_image_with_model,
    warp_mask_with_model, DistanceStats, TpsError,
};
use log::{info, warn};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Errors that abort the pipeline. There is no partial result.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum DewarpError {
    #[error("no markers detected")]
    NoMarkers,
    #[error("mask is {mask_rows}x{mask_cols} but image is {rows}x{cols}")]
    MaskShape {
        mask_rows: usize,
        mask_cols: usize,
        rows: usize,
        cols: usize,
    },
    #[error(transparent)]
    Image(#[from] ImageError),
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error(transparent)]
    Tps(#[from] TpsError),
}

/// Everything one [`dewarp`] call needs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DewarpParams {
    pub detect: DetectParams,
    pub canonical_mode: CanonicalMode,
    pub canonical: CanonicalParams,
    pub method: MatchMethod,
    /// TPS regularization λ; `0` interpolates the markers exactly.
    pub regularization: f64,
    /// Output `(rows, cols)`; defaults to the input shape.
    pub output_size: Option<(usize, usize)>,
    /// Colour for output pixels that map outside the input.
    pub fill: [f32; 3],
    pub want_diagnostics: bool,
}

impl Default for DewarpParams {
    fn default() -> Self {
        Self {
            detect: DetectParams::default(),
            canonical_mode: CanonicalMode::default(),
            canonical: CanonicalParams::default(),
            method: MatchMethod::default(),
            regularization: 0.0,
            output_size: None,
            fill: [0.0; 3],
            want_diagnostics: true,
        }
    }
}

/// Fit-quality summary of the forward (measured → canonical) spline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DewarpDiagnostics {
    pub residual: DistanceStats,
    pub deformation: DistanceStats,
    pub bending_energy: f64,
}

#[derive(Clone, Debug)]
pub struct DewarpOutput {
    pub image: RgbImage,
    /// Warped companion mask, from [`dewarp_with_mask`].
    pub mask: Option<BitMatrix>,
    pub markers: Vec<MarkerInfo>,
    pub canonical: Vec<RowCol>,
    pub correspondence: Correspondence,
    pub diagnostics: Option<DewarpDiagnostics>,
}

/// Dewarp `image` so that its detected markers land on canonical positions.
pub fn dewarp(image: &RgbImageView<'_>, params: &DewarpParams) -> Result<DewarpOutput, DewarpError> {
    run(image, None, params)
}

/// [`dewarp`], also warping `mask` through the same transform.
///
/// The mask must have the image's shape.
pub fn dewarp_with_mask(
    image: &RgbImageView<'_>,
    mask: &BitMatrix,
    params: &DewarpParams,
) -> Result<DewarpOutput, DewarpError> {
    if mask.width != image.width || mask.height != image.height {
        return Err(DewarpError::MaskShape {
            mask_rows: mask.height,
            mask_cols: mask.width,
            rows: image.height,
            cols: image.width,
        });
    }
    run(image, Some(mask), params)
}

#[cfg_attr(
    feature = "tracing",
    instrument(
        level = "info",
        skip(image, mask, params),
        fields(width = image.width, height = image.height, mode = %params.canonical_mode)
    )
)]
fn run(
    image: &RgbImageView<'_>,
    mask: Option<&BitMatrix>,
    params: &DewarpParams,
) -> Result<DewarpOutput, DewarpError> {
    let markers = detect_markers(image, &params.detect)?;
    if markers.is_empty() {
        warn!("no markers detected; nothing to dewarp");
        return Err(DewarpError::NoMarkers);
    }

    let canonical = define_canonical_positions(&markers, params.canonical_mode, &params.canonical)?;
    info!(
        "canonical layout {}: {} positions",
        params.canonical_mode,
        canonical.len()
    );

    let correspondence = establish_correspondence(&markers, &canonical, params.method);
    info!(
        "matched {} marker pairs via {}",
        correspondence.len(),
        params.method
    );

    let diagnostics = if params.want_diagnostics {
        let forward = fit_tps(
            &correspondence.source,
            &correspondence.target,
            params.regularization,
        )?;
        let diag = DewarpDiagnostics {
            residual: residual_error_with_model(&forward, &correspondence.target),
            deformation: deformation_magnitude(&correspondence.source, &correspondence.target),
            bending_energy: forward.bending_energy(),
        };
        info!(
            "residual mean {:.3} px (max {:.3}), deformation mean {:.3} px (max {:.3})",
            diag.residual.mean, diag.residual.max, diag.deformation.mean, diag.deformation.max
        );
        Some(diag)
    } else {
        None
    };

    let inverse = fit_tps(
        &correspondence.target,
        &correspondence.source,
        params.regularization,
    )?;
    let warped = warp_image_with_model(image, &inverse, params.output_size, params.fill)?;
    let warped_mask = mask
        .map(|m| warp_mask_with_model(m, &inverse, params.output_size))
        .transpose()?;
    info!("warped to {}x{}", warped.height, warped.width);

    Ok(DewarpOutput {
        image: warped,
        mask: warped_mask,
        markers,
        canonical,
        correspondence,
        diagnostics,
    })
}
