use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::{BitMatrix, RgbImageView};

/// Inclusive pixel rectangle `[row_min, row_max] × [col_min, col_max]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub row_min: usize,
    pub row_max: usize,
    pub col_min: usize,
    pub col_max: usize,
}

impl Region {
    /// Clamp into a `width × height` image, returning half-open row/col ranges.
    ///
    /// Returns `None` when nothing of the region remains inside the image.
    pub fn clamp_to(&self, width: usize, height: usize) -> Option<(Range<usize>, Range<usize>)> {
        if width == 0 || height == 0 {
            return None;
        }
        let r0 = self.row_min.min(height - 1);
        let r1 = self.row_max.min(height - 1);
        let c0 = self.col_min.min(width - 1);
        let c1 = self.col_max.min(width - 1);
        if r0 > r1 || c0 > c1 || self.row_min >= height || self.col_min >= width {
            return None;
        }
        Some((r0..r1 + 1, c0..c1 + 1))
    }
}

/// Pixels whose three channels are all `>= threshold`.
///
/// With a `region`, pixels outside it are forced to `false`.
pub fn white_mask(image: &RgbImageView<'_>, threshold: f32, region: Option<&Region>) -> BitMatrix {
    let mut mask = BitMatrix::new(image.width, image.height);
    let (rows, cols) = match region {
        Some(region) => match region.clamp_to(image.width, image.height) {
            Some(ranges) => ranges,
            None => return mask,
        },
        None => (0..image.height, 0..image.width),
    };
    for row in rows {
        for col in cols.clone() {
            let [r, g, b] = image.pixel(row, col);
            if r >= threshold && g >= threshold && b >= threshold {
                mask.set(row, col, true);
            }
        }
    }
    mask
}
