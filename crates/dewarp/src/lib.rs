//! High-level facade crate for the `dewarp-*` workspace.
//!
//! This crate provides:
//! - re-exports of the underlying crates (`core`, `markers`, `tps`)
//! - the end-to-end [`dewarp`] pipeline: detect white markers, map them onto a
//!   canonical layout, fit a thin-plate spline and warp the image
//! - JSON config/report helpers ([`io`]) and, with the `image` feature,
//!   file adapters ([`image_io`])
//!
//! ## Quickstart
//!
//! ```no_run
//! use dewarp::image_io::{load_rgb, save_rgb};
//! use dewarp::{dewarp, CanonicalMode, DewarpParams};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let img = load_rgb("photo.png")?;
//! let mut params = DewarpParams::default();
//! params.canonical_mode = CanonicalMode::Corners4;
//! params.canonical.image_size = Some((img.height, img.width));
//!
//! let out = dewarp(&img.view(), &params)?;
//! if let Some(d) = &out.diagnostics {
//!     println!("residual {:.3} px, deformation {:.3} px", d.residual.mean, d.deformation.mean);
//! }
//! save_rgb(&out.image, "dewarped.png")?;
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `dewarp::core`: image/mask containers, thresholding, morphology, labeling.
//! - `dewarp::markers`: marker detection, canonical layouts, correspondence.
//! - `dewarp::tps`: spline fitting, warping and diagnostics.
//! - `dewarp::image_io` (feature `image`): load/save through the `image` crate.

pub use dewarp_core as core;
pub use dewarp_markers as markers;
pub use dewarp_tps as tps;

pub use dewarp_core::{BitMatrix, RgbImage, RgbImageView, RowCol};
pub use dewarp_markers::{
    CanonicalMode, CanonicalParams, Correspondence, DetectParams, MarkerInfo, MatchMethod,
};
pub use dewarp_tps::{DistanceStats, TpsModel};

mod pipeline;

pub use pipeline::{
    dewarp, dewarp_with_mask, DewarpDiagnostics, DewarpError, DewarpOutput, DewarpParams,
};

pub mod io;

#[cfg(feature = "image")]
pub mod image_io;
