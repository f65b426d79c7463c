//! Binary morphology with a square structuring element of side `2 * radius + 1`.
//!
//! The square element is separable, so every operator runs as a horizontal
//! pass followed by a vertical pass using running counts. Pixels outside the
//! image are ignored: a region touching the border is not eroded by it.

use crate::BitMatrix;

#[derive(Clone, Copy)]
enum Op {
    Dilate,
    Erode,
}

/// One separable pass over `len` samples spaced `stride` apart.
fn pass_line(
    src: &[bool],
    dst: &mut [bool],
    start: usize,
    stride: usize,
    len: usize,
    radius: usize,
    op: Op,
) {
    // prefix[i] = number of set samples among the first i
    let mut prefix = Vec::with_capacity(len + 1);
    prefix.push(0usize);
    for i in 0..len {
        let v = src[start + i * stride] as usize;
        prefix.push(prefix[i] + v);
    }
    for i in 0..len {
        let lo = i.saturating_sub(radius);
        let hi = (i + radius + 1).min(len);
        let ones = prefix[hi] - prefix[lo];
        dst[start + i * stride] = match op {
            Op::Dilate => ones > 0,
            Op::Erode => ones == hi - lo,
        };
    }
}

fn apply(mask: &BitMatrix, radius: usize, op: Op) -> BitMatrix {
    if radius == 0 || mask.data.is_empty() {
        return mask.clone();
    }
    let (w, h) = (mask.width, mask.height);
    let mut tmp = vec![false; w * h];
    for row in 0..h {
        pass_line(&mask.data, &mut tmp, row * w, 1, w, radius, op);
    }
    let mut out = vec![false; w * h];
    for col in 0..w {
        pass_line(&tmp, &mut out, col, w, h, radius, op);
    }
    BitMatrix {
        width: w,
        height: h,
        data: out,
    }
}

pub fn dilate(mask: &BitMatrix, radius: usize) -> BitMatrix {
    apply(mask, radius, Op::Dilate)
}

pub fn erode(mask: &BitMatrix, radius: usize) -> BitMatrix {
    apply(mask, radius, Op::Erode)
}

/// Dilate then erode: bridges gaps narrower than the element.
pub fn close(mask: &BitMatrix, radius: usize) -> BitMatrix {
    erode(&dilate(mask, radius), radius)
}

/// Erode then dilate: removes specks smaller than the element.
pub fn open(mask: &BitMatrix, radius: usize) -> BitMatrix {
    dilate(&erode(mask, radius), radius)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(w: usize, h: usize, r0: usize, c0: usize, side: usize) -> BitMatrix {
        BitMatrix::from_fn(w, h, |r, c| {
            r >= r0 && r < r0 + side && c >= c0 && c < c0 + side
        })
    }

    #[test]
    fn open_removes_isolated_speck_and_keeps_square() {
        let mut mask = square(20, 20, 5, 5, 6);
        mask.set(15, 15, true);
        let opened = open(&mask, 1);
        assert!(!opened.get(15, 15));
        assert_eq!(opened.count_ones(), 36);
    }

    #[test]
    fn close_bridges_one_pixel_gap() {
        let mut mask = BitMatrix::new(12, 5);
        for c in 0..12 {
            if c != 6 {
                mask.set(2, c, true);
            }
        }
        let closed = close(&mask, 1);
        assert!(closed.get(2, 6));
    }

    #[test]
    fn border_does_not_erode() {
        let mask = square(8, 8, 0, 0, 4);
        let eroded = erode(&mask, 1);
        assert!(eroded.get(0, 0));
        assert!(!eroded.get(3, 3));
        assert_eq!(eroded.count_ones(), 9);
    }

    #[test]
    fn zero_radius_is_identity() {
        let mask = square(6, 6, 1, 1, 2);
        assert_eq!(dilate(&mask, 0), mask);
        assert_eq!(erode(&mask, 0), mask);
    }
}
