//! Marker detection by per-component principal-axis analysis.
//!
//! 1. Threshold the RGB image into a "white" mask (optionally gated by a region).
//! 2. Close then open the mask to merge fragments and drop speckle.
//! 3. Label connected components.
//! 4. For each component above `min_area`: centroid, covariance, principal
//!    axes, oriented bounding box, angle, aspect ratio and density.
//! 5. Sort by area (largest first) and keep at most `max_markers`.

use dewarp_core::{
    close, label_components, open, symmetric_eigen2, white_mask, BitMatrix, ImageError,
    RgbImageView, RowCol,
};
use log::{debug, info};
use nalgebra::Vector2;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::types::{DetectParams, MarkerInfo, MarkerMask};

/// Detect white markers in `image`.
///
/// Returns an empty vector when no component survives the filters, and an
/// error only when the view's buffer does not match its dimensions.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(image, params), fields(width = image.width, height = image.height))
)]
pub fn detect_markers(
    image: &RgbImageView<'_>,
    params: &DetectParams,
) -> Result<Vec<MarkerInfo>, ImageError> {
    image.validate()?;
    let mut mask = white_mask(image, params.threshold, params.region.as_ref());
    if params.morph_kernel_size > 0 {
        let radius = params.morph_kernel_size / 2;
        mask = open(&close(&mask, radius), radius);
        if let Some(region) = params.region.as_ref() {
            gate_to_region(&mut mask, region);
        }
    }

    let labels = label_components(&mask, params.connectivity);
    debug!("{} connected components", labels.num_labels);

    let mut markers = Vec::new();
    let mut too_small = 0usize;
    let mut bad_shape = 0usize;
    for pixels in labels.component_pixels() {
        if pixels.len() < params.min_area {
            too_small += 1;
            continue;
        }
        let Some(marker) = describe_component(&pixels) else {
            continue;
        };
        if params.enforce_aspect_ratio
            && (marker.aspect_ratio < params.min_aspect_ratio
                || marker.aspect_ratio > params.max_aspect_ratio)
        {
            bad_shape += 1;
            continue;
        }
        markers.push(marker);
    }

    markers.sort_by(|a, b| {
        b.size
            .cmp(&a.size)
            .then_with(|| a.centroid.row.total_cmp(&b.centroid.row))
            .then_with(|| a.centroid.col.total_cmp(&b.centroid.col))
    });
    markers.truncate(params.max_markers);

    debug!(
        "rejected {} small and {} badly shaped components",
        too_small, bad_shape
    );
    info!("detected {} markers", markers.len());
    Ok(markers)
}

fn gate_to_region(mask: &mut BitMatrix, region: &dewarp_core::Region) {
    let Some((rows, cols)) = region.clamp_to(mask.width, mask.height) else {
        mask.data.iter_mut().for_each(|v| *v = false);
        return;
    };
    for row in 0..mask.height {
        for col in 0..mask.width {
            if !rows.contains(&row) || !cols.contains(&col) {
                mask.set(row, col, false);
            }
        }
    }
}

/// PCA descriptor of one component given its `(row, col)` pixels.
pub fn describe_component(pixels: &[(usize, usize)]) -> Option<MarkerInfo> {
    if pixels.is_empty() {
        return None;
    }
    let n = pixels.len() as f64;

    let (mut sr, mut sc) = (0.0, 0.0);
    let (mut rmin, mut rmax) = (usize::MAX, 0usize);
    let (mut cmin, mut cmax) = (usize::MAX, 0usize);
    for &(r, c) in pixels {
        sr += r as f64;
        sc += c as f64;
        rmin = rmin.min(r);
        rmax = rmax.max(r);
        cmin = cmin.min(c);
        cmax = cmax.max(c);
    }
    let centroid = RowCol::new(sr / n, sc / n);

    let (mut crr, mut crc, mut ccc) = (0.0, 0.0, 0.0);
    for &(r, c) in pixels {
        let dr = r as f64 - centroid.row;
        let dc = c as f64 - centroid.col;
        crr += dr * dr;
        crc += dr * dc;
        ccc += dc * dc;
    }
    let eig = symmetric_eigen2(crr / n, crc / n, ccc / n);
    let [major, minor] = eig.vectors;

    let (mut lo0, mut hi0) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut lo1, mut hi1) = (f64::INFINITY, f64::NEG_INFINITY);
    for &(r, c) in pixels {
        let d = Vector2::new(r as f64 - centroid.row, c as f64 - centroid.col);
        let p0 = d.dot(&major);
        let p1 = d.dot(&minor);
        lo0 = lo0.min(p0);
        hi0 = hi0.max(p0);
        lo1 = lo1.min(p1);
        hi1 = hi1.max(p1);
    }

    // Extents cover whole pixels, not just their centers.
    let (lo0, hi0, lo1, hi1) = (lo0 - 0.5, hi0 + 0.5, lo1 - 0.5, hi1 + 0.5);
    let len0 = hi0 - lo0;
    let len1 = hi1 - lo1;

    let c = centroid.to_vector();
    let mut corners = [0.0f64; 8];
    for (k, (p0, p1)) in [(lo0, lo1), (hi0, lo1), (hi0, hi1), (lo0, hi1)]
        .into_iter()
        .enumerate()
    {
        let q = c + major * p0 + minor * p1;
        corners[2 * k] = q[0];
        corners[2 * k + 1] = q[1];
    }

    let aspect_ratio = len0.max(len1) / len0.min(len1);
    let density = (n / (len0 * len1)).min(1.0);
    let angle = major[0].atan2(major[1]);

    let mut bits = BitMatrix::new(cmax - cmin + 1, rmax - rmin + 1);
    for &(r, c) in pixels {
        bits.set(r - rmin, c - cmin, true);
    }

    Some(MarkerInfo {
        centroid,
        corners,
        mask: MarkerMask {
            origin_row: rmin,
            origin_col: cmin,
            bits,
        },
        size: pixels.len(),
        angle,
        aspect_ratio,
        density,
    })
}
