//! Connected-component labeling of binary masks.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::BitMatrix;

/// Pixel neighbourhood used when growing components.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Connectivity {
    /// Edge neighbours only.
    Four,
    /// Edge and diagonal neighbours.
    #[default]
    Eight,
}

const N4: [(isize, isize); 4] = [(-1, 0), (0, -1), (0, 1), (1, 0)];
const N8: [(isize, isize); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

impl Connectivity {
    fn offsets(self) -> &'static [(isize, isize)] {
        match self {
            Connectivity::Four => &N4,
            Connectivity::Eight => &N8,
        }
    }
}

/// Per-pixel component ids: `0` is background, `1..=num_labels` are regions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelMatrix {
    pub width: usize,
    pub height: usize,
    pub labels: Vec<u32>,
    pub num_labels: u32,
}

impl LabelMatrix {
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> u32 {
        self.labels[row * self.width + col]
    }

    /// Gather `(row, col)` pixels of every component in one pass.
    ///
    /// Entry `k` holds the pixels of label `k + 1`, in raster order.
    pub fn component_pixels(&self) -> Vec<Vec<(usize, usize)>> {
        let mut out = vec![Vec::new(); self.num_labels as usize];
        for (idx, &label) in self.labels.iter().enumerate() {
            if label > 0 {
                out[label as usize - 1].push((idx / self.width, idx % self.width));
            }
        }
        out
    }
}

/// Label each maximal connected region of `mask`.
///
/// Labels are assigned in raster order of each region's first pixel.
pub fn label_components(mask: &BitMatrix, connectivity: Connectivity) -> LabelMatrix {
    let (w, h) = (mask.width, mask.height);
    let mut labels = vec![0u32; w * h];
    let mut next = 0u32;
    let mut queue = VecDeque::new();

    for start in 0..w * h {
        if !mask.data[start] || labels[start] != 0 {
            continue;
        }
        next += 1;
        labels[start] = next;
        queue.push_back(start);

        while let Some(idx) = queue.pop_front() {
            let row = (idx / w) as isize;
            let col = (idx % w) as isize;
            for &(dr, dc) in connectivity.offsets() {
                let r = row + dr;
                let c = col + dc;
                if r < 0 || c < 0 || r >= h as isize || c >= w as isize {
                    continue;
                }
                let n = r as usize * w + c as usize;
                if mask.data[n] && labels[n] == 0 {
                    labels[n] = next;
                    queue.push_back(n);
                }
            }
        }
    }

    LabelMatrix {
        width: w,
        height: h,
        labels,
        num_labels: next,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_from_rows(rows: &[&str]) -> BitMatrix {
        let h = rows.len();
        let w = rows[0].len();
        BitMatrix::from_fn(w, h, |r, c| rows[r].as_bytes()[c] == b'#')
    }

    #[test]
    fn diagonal_touch_depends_on_connectivity() {
        let mask = mask_from_rows(&["#..", ".#.", "..#"]);
        assert_eq!(label_components(&mask, Connectivity::Four).num_labels, 3);
        assert_eq!(label_components(&mask, Connectivity::Eight).num_labels, 1);
    }

    #[test]
    fn labels_follow_raster_order() {
        let mask = mask_from_rows(&["..##", "....", "#..."]);
        let labels = label_components(&mask, Connectivity::Eight);
        assert_eq!(labels.num_labels, 2);
        assert_eq!(labels.get(0, 2), 1);
        assert_eq!(labels.get(2, 0), 2);
        assert_eq!(labels.get(1, 1), 0);

        let pixels = labels.component_pixels();
        assert_eq!(pixels[0], vec![(0, 2), (0, 3)]);
        assert_eq!(pixels[1], vec![(2, 0)]);
    }

    #[test]
    fn empty_mask_has_no_labels() {
        let mask = BitMatrix::new(5, 5);
        let labels = label_components(&mask, Connectivity::Eight);
        assert_eq!(labels.num_labels, 0);
        assert!(labels.component_pixels().is_empty());
    }
}
