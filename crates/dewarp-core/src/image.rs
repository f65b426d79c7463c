use crate::ImageError;

/// Sample locations within this distance (in pixels) of a pixel center snap
/// onto it, which also keeps locations just outside the border in bounds.
pub const BORDER_TOLERANCE: f64 = 1e-6;

/// Borrowed RGB image, row-major with interleaved `R, G, B` floats in `[0, 1]`.
#[derive(Clone, Copy, Debug)]
pub struct RgbImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [f32], // len = w*h*3
}

/// Owned RGB image, row-major with interleaved `R, G, B` floats in `[0, 1]`.
#[derive(Clone, Debug, PartialEq)]
pub struct RgbImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<f32>,
}

impl RgbImage {
    /// Black image of the given size.
    pub fn new(width: usize, height: usize) -> Self {
        Self::filled(width, height, [0.0; 3])
    }

    pub fn filled(width: usize, height: usize, rgb: [f32; 3]) -> Self {
        let mut data = Vec::with_capacity(width * height * 3);
        for _ in 0..width * height {
            data.extend_from_slice(&rgb);
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Wrap an existing interleaved float buffer.
    pub fn from_raw(width: usize, height: usize, data: Vec<f32>) -> Result<Self, ImageError> {
        let expected = width * height * 3;
        if data.len() != expected {
            return Err(ImageError::BufferLength {
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Build from an 8-bit interleaved RGB buffer, normalizing to `[0, 1]`.
    pub fn from_rgb8(width: usize, height: usize, rgb: &[u8]) -> Result<Self, ImageError> {
        let expected = width * height * 3;
        if rgb.len() != expected {
            return Err(ImageError::BufferLength {
                expected,
                got: rgb.len(),
            });
        }
        let data = rgb.iter().map(|&v| v as f32 / 255.0).collect();
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Quantize back to 8-bit interleaved RGB.
    pub fn to_rgb8(&self) -> Vec<u8> {
        self.data
            .iter()
            .map(|&v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
            .collect()
    }

    pub fn view(&self) -> RgbImageView<'_> {
        RgbImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }

    #[inline]
    pub fn pixel(&self, row: usize, col: usize) -> [f32; 3] {
        self.view().pixel(row, col)
    }

    #[inline]
    pub fn set_pixel(&mut self, row: usize, col: usize, rgb: [f32; 3]) {
        let idx = (row * self.width + col) * 3;
        self.data[idx..idx + 3].copy_from_slice(&rgb);
    }

    /// Paint an axis-aligned rectangle, clipped to the image.
    pub fn fill_rect(&mut self, row0: usize, col0: usize, rows: usize, cols: usize, rgb: [f32; 3]) {
        let row1 = (row0 + rows).min(self.height);
        let col1 = (col0 + cols).min(self.width);
        for row in row0..row1 {
            for col in col0..col1 {
                self.set_pixel(row, col, rgb);
            }
        }
    }
}

impl RgbImageView<'_> {
    #[inline]
    pub fn pixel(&self, row: usize, col: usize) -> [f32; 3] {
        let idx = (row * self.width + col) * 3;
        [self.data[idx], self.data[idx + 1], self.data[idx + 2]]
    }

    /// Check that `data` matches the declared dimensions.
    pub fn validate(&self) -> Result<(), ImageError> {
        let expected = self.width * self.height * 3;
        if self.data.len() != expected {
            return Err(ImageError::BufferLength {
                expected,
                got: self.data.len(),
            });
        }
        Ok(())
    }
}

/// Bilinear RGB sample at a fractional `(row, col)` location.
///
/// Returns `None` when the location lies outside `[0, h-1] × [0, w-1]`
/// (beyond [`BORDER_TOLERANCE`]). Locations within the tolerance of a pixel
/// center reproduce the stored pixel exactly.
#[inline]
pub fn sample_bilinear_rgb(src: &RgbImageView<'_>, row: f64, col: f64) -> Option<[f32; 3]> {
    if src.width == 0 || src.height == 0 || !row.is_finite() || !col.is_finite() {
        return None;
    }
    let row = snap_to_pixel(row);
    let col = snap_to_pixel(col);
    let max_r = (src.height - 1) as f64;
    let max_c = (src.width - 1) as f64;
    if row < -BORDER_TOLERANCE
        || col < -BORDER_TOLERANCE
        || row > max_r + BORDER_TOLERANCE
        || col > max_c + BORDER_TOLERANCE
    {
        return None;
    }
    let row = row.clamp(0.0, max_r);
    let col = col.clamp(0.0, max_c);

    let r0 = row.floor() as usize;
    let c0 = col.floor() as usize;
    let r1 = (r0 + 1).min(src.height - 1);
    let c1 = (c0 + 1).min(src.width - 1);
    let fr = (row - r0 as f64) as f32;
    let fc = (col - c0 as f64) as f32;

    let p00 = src.pixel(r0, c0);
    let p01 = src.pixel(r0, c1);
    let p10 = src.pixel(r1, c0);
    let p11 = src.pixel(r1, c1);

    let mut out = [0.0f32; 3];
    for ch in 0..3 {
        let top = p00[ch] + fc * (p01[ch] - p00[ch]);
        let bottom = p10[ch] + fc * (p11[ch] - p10[ch]);
        out[ch] = top + fr * (bottom - top);
    }
    Some(out)
}

#[inline]
fn snap_to_pixel(v: f64) -> f64 {
    let r = v.round();
    if (v - r).abs() <= BORDER_TOLERANCE {
        r
    } else {
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn gradient(width: usize, height: usize) -> RgbImage {
        let mut img = RgbImage::new(width, height);
        for row in 0..height {
            for col in 0..width {
                let v = (row * width + col) as f32 / (width * height) as f32;
                img.set_pixel(row, col, [v, 1.0 - v, 0.5]);
            }
        }
        img
    }

    #[test]
    fn integer_samples_match_pixels() {
        let img = gradient(7, 5);
        let view = img.view();
        for row in 0..5 {
            for col in 0..7 {
                let s = sample_bilinear_rgb(&view, row as f64, col as f64).expect("in bounds");
                assert_eq!(s, img.pixel(row, col));
            }
        }
    }

    #[test]
    fn midpoint_averages_neighbours() {
        let mut img = RgbImage::new(2, 1);
        img.set_pixel(0, 0, [0.0, 0.2, 1.0]);
        img.set_pixel(0, 1, [1.0, 0.4, 0.0]);
        let s = sample_bilinear_rgb(&img.view(), 0.0, 0.5).expect("in bounds");
        assert_abs_diff_eq!(s[0], 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(s[1], 0.3, epsilon = 1e-6);
        assert_abs_diff_eq!(s[2], 0.5, epsilon = 1e-6);
    }

    #[test]
    fn out_of_bounds_is_none_but_border_noise_is_tolerated() {
        let img = gradient(4, 4);
        let view = img.view();
        assert!(sample_bilinear_rgb(&view, -0.5, 1.0).is_none());
        assert!(sample_bilinear_rgb(&view, 1.0, 3.5).is_none());
        assert!(sample_bilinear_rgb(&view, f64::NAN, 1.0).is_none());
        let edge = sample_bilinear_rgb(&view, 3.0 + 1e-9, -1e-9).expect("tolerated");
        assert_eq!(edge, img.pixel(3, 0));
        let interior = sample_bilinear_rgb(&view, 2.0 - 1e-9, 1.0 + 1e-9).expect("in bounds");
        assert_eq!(interior, img.pixel(2, 1));
    }

    #[test]
    fn rgb8_round_trip_and_length_check() {
        let raw = vec![0u8, 128, 255, 10, 20, 30];
        let img = RgbImage::from_rgb8(2, 1, &raw).expect("valid buffer");
        assert_eq!(img.to_rgb8(), raw);
        assert_eq!(
            RgbImage::from_rgb8(2, 2, &raw),
            Err(ImageError::BufferLength {
                expected: 12,
                got: 6
            })
        );
    }
}
