//! Inverse-mapped image and mask warping.
//!
//! Every output pixel is mapped back into the input through the inverse
//! (target → source) spline and sampled there, so the output has no holes.
//! Rows are independent; with the `rayon` feature they run in parallel.

use dewarp_core::{sample_bilinear_rgb, BitMatrix, RgbImage, RgbImageView, RowCol};
use log::debug;

#[cfg(feature = "rayon")]
use rayon::prelude::*;
#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{fit_tps, TpsError, TpsModel};

/// Resolve `(rows, cols)` of the output, defaulting to the input shape.
fn output_shape(
    output_size: Option<(usize, usize)>,
    height: usize,
    width: usize,
) -> Result<(usize, usize), TpsError> {
    let (rows, cols) = output_size.unwrap_or((height, width));
    if rows == 0 || cols == 0 {
        return Err(TpsError::EmptyOutput { rows, cols });
    }
    Ok((rows, cols))
}

/// Run `kernel(row, row_slice)` over consecutive `stride`-long rows.
fn for_each_row<T, F>(data: &mut [T], stride: usize, kernel: F)
where
    T: Send,
    F: Fn(usize, &mut [T]) + Send + Sync,
{
    #[cfg(feature = "rayon")]
    data.par_chunks_mut(stride)
        .enumerate()
        .for_each(|(row, chunk)| kernel(row, chunk));

    #[cfg(not(feature = "rayon"))]
    data.chunks_mut(stride)
        .enumerate()
        .for_each(|(row, chunk)| kernel(row, chunk));
}

/// Warp `image` so that `source[i]` lands on `target[i]`.
///
/// Fits the inverse spline internally; `output_size` is `(rows, cols)` and
/// defaults to the input shape. Pixels whose pre-image falls outside the
/// input get `fill`.
pub fn warp_image(
    image: &RgbImageView<'_>,
    source: &[RowCol],
    target: &[RowCol],
    output_size: Option<(usize, usize)>,
    regularization: f64,
    fill: [f32; 3],
) -> Result<RgbImage, TpsError> {
    let inverse = fit_tps(target, source, regularization)?;
    warp_image_with_model(image, &inverse, output_size, fill)
}

/// Warp `image` with an already fitted inverse (output → input) model.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(image, inverse), fields(n = inverse.num_control_points()))
)]
pub fn warp_image_with_model(
    image: &RgbImageView<'_>,
    inverse: &TpsModel,
    output_size: Option<(usize, usize)>,
    fill: [f32; 3],
) -> Result<RgbImage, TpsError> {
    image.validate()?;
    let (rows, cols) = output_shape(output_size, image.height, image.width)?;

    let mut out = RgbImage::new(cols, rows);
    for_each_row(&mut out.data, cols * 3, |row, dst| {
        for (col, px) in dst.chunks_exact_mut(3).enumerate() {
            let p = inverse.apply(RowCol::new(row as f64, col as f64));
            let rgb = sample_bilinear_rgb(image, p.row, p.col).unwrap_or(fill);
            px.copy_from_slice(&rgb);
        }
    });
    debug!("warped {}x{} image to {rows}x{cols}", image.height, image.width);
    Ok(out)
}

/// Warp a binary mask so that `source[i]` lands on `target[i]`.
///
/// Same inverse mapping as [`warp_image`], with nearest-neighbour sampling;
/// pixels mapped outside the input are `false`.
pub fn warp_mask(
    mask: &BitMatrix,
    source: &[RowCol],
    target: &[RowCol],
    output_size: Option<(usize, usize)>,
    regularization: f64,
) -> Result<BitMatrix, TpsError> {
    let inverse = fit_tps(target, source, regularization)?;
    warp_mask_with_model(mask, &inverse, output_size)
}

/// Warp a binary mask with an already fitted inverse model.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(mask, inverse), fields(n = inverse.num_control_points()))
)]
pub fn warp_mask_with_model(
    mask: &BitMatrix,
    inverse: &TpsModel,
    output_size: Option<(usize, usize)>,
) -> Result<BitMatrix, TpsError> {
    let (rows, cols) = output_shape(output_size, mask.height, mask.width)?;

    let mut out = BitMatrix::new(cols, rows);
    for_each_row(&mut out.data, cols, |row, dst| {
        for (col, bit) in dst.iter_mut().enumerate() {
            let p = inverse.apply(RowCol::new(row as f64, col as f64));
            *bit = sample_nearest(mask, p);
        }
    });
    debug!(
        "warped {}x{} mask to {rows}x{cols} ({} set)",
        mask.height,
        mask.width,
        out.count_ones()
    );
    Ok(out)
}

#[inline]
fn sample_nearest(mask: &BitMatrix, p: RowCol) -> bool {
    let (r, c) = (p.row.round(), p.col.round());
    if !(r >= 0.0 && c >= 0.0 && r < mask.height as f64 && c < mask.width as f64) {
        return false;
    }
    mask.get(r as usize, c as usize)
}
