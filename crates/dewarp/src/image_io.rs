//! Adapters between `image` crate buffers and the workspace containers.

use std::path::Path;

use ::image::{GrayImage, Luma};
use dewarp_core::{BitMatrix, ImageError, RgbImage};

use crate::io::IoError;

/// Luma values above this count as `true` when loading a mask.
const MASK_LUMA_THRESHOLD: u8 = 127;

/// Convert an 8-bit RGB buffer into a `[0, 1]` float image.
pub fn rgb_from_image(img: &::image::RgbImage) -> RgbImage {
    RgbImage {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw().iter().map(|&v| v as f32 / 255.0).collect(),
    }
}

/// Convert back to 8-bit, rounding and clamping each channel.
pub fn image_from_rgb(img: &RgbImage) -> Result<::image::RgbImage, ImageError> {
    let raw = img.to_rgb8();
    let got = raw.len();
    ::image::RgbImage::from_raw(img.width as u32, img.height as u32, raw).ok_or(
        ImageError::BufferLength {
            expected: img.width * img.height * 3,
            got,
        },
    )
}

/// Decode any supported image file as RGB.
pub fn load_rgb(path: impl AsRef<Path>) -> Result<RgbImage, IoError> {
    let img = ::image::open(path)?.to_rgb8();
    Ok(rgb_from_image(&img))
}

/// Encode; the format follows the file extension.
pub fn save_rgb(img: &RgbImage, path: impl AsRef<Path>) -> Result<(), IoError> {
    image_from_rgb(img)?.save(path)?;
    Ok(())
}

/// Load a mask image; pixels with luma above 127 are set.
pub fn load_mask(path: impl AsRef<Path>) -> Result<BitMatrix, IoError> {
    let gray = ::image::open(path)?.to_luma8();
    Ok(BitMatrix::from_fn(
        gray.width() as usize,
        gray.height() as usize,
        |row, col| gray.get_pixel(col as u32, row as u32)[0] > MASK_LUMA_THRESHOLD,
    ))
}

/// Save a mask as a black/white 8-bit image.
pub fn save_mask(mask: &BitMatrix, path: impl AsRef<Path>) -> Result<(), IoError> {
    let gray = GrayImage::from_fn(mask.width as u32, mask.height as u32, |x, y| {
        Luma([if mask.get(y as usize, x as usize) { 255 } else { 0 }])
    });
    gray.save(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb_survives_png_round_trip() {
        let mut img = RgbImage::new(5, 3);
        img.set_pixel(1, 2, [1.0, 0.5, 0.0]);
        img.set_pixel(2, 4, [0.2, 0.4, 0.6]);
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("rgb.png");
        save_rgb(&img, &path).expect("save");
        let back = load_rgb(&path).expect("load");
        assert_eq!((back.width, back.height), (5, 3));
        assert_eq!(back.to_rgb8(), img.to_rgb8());
    }

    #[test]
    fn mask_survives_png_round_trip() {
        let mask = BitMatrix::from_fn(7, 4, |r, c| (r + c) % 3 == 0);
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("mask.png");
        save_mask(&mask, &path).expect("save");
        assert_eq!(load_mask(&path).expect("load"), mask);
    }
}
