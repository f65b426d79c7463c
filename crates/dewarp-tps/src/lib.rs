//! Thin-plate spline engine.
//!
//! - [`fit_tps`] solves the `(N + 3) × (N + 3)` spline system for paired
//!   control points, with optional diagonal regularization.
//! - [`TpsModel::apply`] maps arbitrary points.
//! - [`warp_image`] / [`warp_mask`] resample a whole image or binary mask by
//!   inverse mapping (bilinear resp. nearest neighbour).
//! - [`residual_error`] and [`deformation_magnitude`] summarize a fit.
//!
//! Enable the `rayon` feature to warp rows in parallel; results do not change.

mod diagnostics;
mod error;
mod tps;
mod warp;

pub use diagnostics::{
    deformation_magnitude, residual_error, residual_error_with_model, DistanceStats,
};
pub use error::TpsError;
pub use tps::{fit_tps, tps_kernel, TpsModel};
pub use warp::{warp_image, warp_image_with_model, warp_mask, warp_mask_with_model};
