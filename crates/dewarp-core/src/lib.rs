//! Core types and utilities for marker-based dewarping.
//!
//! This crate is intentionally small. It owns the pixel containers
//! ([`RgbImage`], [`BitMatrix`], [`LabelMatrix`]), the mask preprocessing
//! primitives consumed by marker detection (thresholding, morphology,
//! connected-component labeling) and a handful of `(row, col)` geometry
//! helpers. It knows nothing about markers or splines.

mod error;
mod geometry;
mod image;
mod labeling;
mod logger;
mod mask;
mod morphology;
mod threshold;

pub use error::ImageError;
pub use geometry::{bounding_box, centroid, symmetric_eigen2, RowCol, SymmetricEigen2};
pub use image::{sample_bilinear_rgb, RgbImage, RgbImageView, BORDER_TOLERANCE};
pub use labeling::{label_components, Connectivity, LabelMatrix};
pub use mask::BitMatrix;
pub use morphology::{close, dilate, erode, open};
pub use threshold::{white_mask, Region};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
