use serde::{Deserialize, Serialize};

use dewarp_core::{BitMatrix, Connectivity, Region, RowCol};

/// Pixels of one marker's connected component, cropped to its
/// axis-aligned bounding box.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerMask {
    pub origin_row: usize,
    pub origin_col: usize,
    pub bits: BitMatrix,
}

impl MarkerMask {
    /// Whether image pixel `(row, col)` belongs to the component.
    pub fn contains(&self, row: usize, col: usize) -> bool {
        if row < self.origin_row || col < self.origin_col {
            return false;
        }
        let (r, c) = (row - self.origin_row, col - self.origin_col);
        r < self.bits.height && c < self.bits.width && self.bits.get(r, c)
    }

    /// Expand into an image-sized mask.
    pub fn to_full(&self, width: usize, height: usize) -> BitMatrix {
        let mut out = BitMatrix::new(width, height);
        for (r, c) in self.bits.iter_ones() {
            let (row, col) = (r + self.origin_row, c + self.origin_col);
            if row < height && col < width {
                out.set(row, col, true);
            }
        }
        out
    }
}

/// One detected physical marker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkerInfo {
    /// Pixel-space center of mass.
    pub centroid: RowCol,
    /// Oriented bounding box corners as flattened `(row, col)` pairs.
    pub corners: [f64; 8],
    pub mask: MarkerMask,
    /// Region area in pixels.
    pub size: usize,
    /// Principal axis rotation in radians, `atan2(v_row, v_col)`.
    pub angle: f64,
    /// Long side over short side of the oriented box, `>= 1`.
    pub aspect_ratio: f64,
    /// `size` over oriented box area, in `(0, 1]`.
    pub density: f64,
}

impl MarkerInfo {
    /// Corner `k` (0..4) of the oriented bounding box.
    pub fn corner(&self, k: usize) -> RowCol {
        RowCol::new(self.corners[2 * k], self.corners[2 * k + 1])
    }
}

/// Marker detection settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectParams {
    /// Per-channel minimum for a pixel to count as white, in `[0, 1]`.
    pub threshold: f32,
    /// Components smaller than this many pixels are discarded.
    pub min_area: usize,
    /// Keep at most this many markers (largest first).
    pub max_markers: usize,
    pub min_aspect_ratio: f64,
    pub max_aspect_ratio: f64,
    /// Reject markers outside `[min_aspect_ratio, max_aspect_ratio]`.
    ///
    /// Off by default: the ratios are always computed and reported, but
    /// unusually shaped markers are still accepted.
    pub enforce_aspect_ratio: bool,
    /// Side of the square close/open element; `0` skips morphology.
    pub morph_kernel_size: usize,
    pub connectivity: Connectivity,
    /// Restrict the search to this inclusive pixel rectangle.
    pub region: Option<Region>,
}

impl Default for DetectParams {
    fn default() -> Self {
        Self {
            threshold: 0.8,
            min_area: 50,
            max_markers: 20,
            min_aspect_ratio: 1.0,
            max_aspect_ratio: 4.0,
            enforce_aspect_ratio: false,
            morph_kernel_size: 3,
            connectivity: Connectivity::Eight,
            region: None,
        }
    }
}
