use serde::{Deserialize, Serialize};

use crate::ImageError;

/// Row-major binary mask.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitMatrix {
    pub width: usize,
    pub height: usize,
    pub data: Vec<bool>, // len = w*h
}

impl BitMatrix {
    /// All-false mask.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![false; width * height],
        }
    }

    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> bool) -> Self {
        let mut data = Vec::with_capacity(width * height);
        for row in 0..height {
            for col in 0..width {
                data.push(f(row, col));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    pub fn from_raw(width: usize, height: usize, data: Vec<bool>) -> Result<Self, ImageError> {
        if data.len() != width * height {
            return Err(ImageError::BufferLength {
                expected: width * height,
                got: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> bool {
        self.data[row * self.width + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: bool) {
        self.data[row * self.width + col] = value;
    }

    pub fn count_ones(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }

    pub fn is_empty(&self) -> bool {
        !self.data.iter().any(|&v| v)
    }

    /// `(row, col)` of every set pixel in raster order.
    pub fn iter_ones(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let w = self.width.max(1);
        self.data
            .iter()
            .enumerate()
            .filter(|(_, &v)| v)
            .map(move |(idx, _)| (idx / w, idx % w))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iter_ones_reports_row_col() {
        let mut m = BitMatrix::new(4, 3);
        m.set(0, 3, true);
        m.set(2, 1, true);
        let ones: Vec<_> = m.iter_ones().collect();
        assert_eq!(ones, vec![(0, 3), (2, 1)]);
        assert_eq!(m.count_ones(), 2);
        assert!(!m.is_empty());
    }

    #[test]
    fn from_raw_checks_length() {
        assert!(BitMatrix::from_raw(2, 2, vec![true; 3]).is_err());
        let m = BitMatrix::from_raw(2, 2, vec![false, true, false, false]).expect("valid");
        assert!(m.get(0, 1));
    }
}
