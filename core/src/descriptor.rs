use crate::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Element type of a descriptor matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DescriptorKind {
    /// Bit-packed rows, one `u8` per 8 bits (ORB, BRISK, AKAZE).
    Binary,
    /// Real-valued rows (SIFT gradient histograms).
    Float,
}

impl fmt::Display for DescriptorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DescriptorKind::Binary => f.write_str("binary"),
            DescriptorKind::Float => f.write_str("float"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum DescriptorData {
    Binary(Vec<u8>),
    Float(Vec<f32>),
}

/// Row-major descriptor matrix; row `i` describes keypoint `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct DescriptorMatrix {
    rows: usize,
    cols: usize,
    data: DescriptorData,
}

/// Borrowed view of one descriptor row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DescriptorRow<'a> {
    Binary(&'a [u8]),
    Float(&'a [f32]),
}

impl DescriptorMatrix {
    pub fn binary(rows: usize, cols: usize, data: Vec<u8>) -> Result<Self> {
        check_len(rows, cols, data.len())?;
        Ok(Self {
            rows,
            cols,
            data: DescriptorData::Binary(data),
        })
    }

    pub fn float(rows: usize, cols: usize, data: Vec<f32>) -> Result<Self> {
        check_len(rows, cols, data.len())?;
        Ok(Self {
            rows,
            cols,
            data: DescriptorData::Float(data),
        })
    }

    /// Zero-row matrix that still remembers its kind and row width.
    pub fn empty(kind: DescriptorKind, cols: usize) -> Self {
        let data = match kind {
            DescriptorKind::Binary => DescriptorData::Binary(Vec::new()),
            DescriptorKind::Float => DescriptorData::Float(Vec::new()),
        };
        Self {
            rows: 0,
            cols,
            data,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn kind(&self) -> DescriptorKind {
        match self.data {
            DescriptorData::Binary(_) => DescriptorKind::Binary,
            DescriptorData::Float(_) => DescriptorKind::Float,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn as_binary(&self) -> Option<&[u8]> {
        match &self.data {
            DescriptorData::Binary(d) => Some(d),
            DescriptorData::Float(_) => None,
        }
    }

    pub fn as_float(&self) -> Option<&[f32]> {
        match &self.data {
            DescriptorData::Float(d) => Some(d),
            DescriptorData::Binary(_) => None,
        }
    }

    pub fn row(&self, idx: usize) -> Option<DescriptorRow<'_>> {
        if idx >= self.rows {
            return None;
        }
        let range = idx * self.cols..(idx + 1) * self.cols;
        Some(match &self.data {
            DescriptorData::Binary(d) => DescriptorRow::Binary(&d[range]),
            DescriptorData::Float(d) => DescriptorRow::Float(&d[range]),
        })
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = DescriptorRow<'_>> {
        (0..self.rows).filter_map(move |i| self.row(i))
    }
}

impl<'a> DescriptorRow<'a> {
    /// Number of differing bits; `None` unless both rows are binary of equal width.
    pub fn hamming_distance(&self, other: &DescriptorRow<'_>) -> Option<u32> {
        match (self, other) {
            (DescriptorRow::Binary(a), DescriptorRow::Binary(b)) if a.len() == b.len() => Some(
                a.iter()
                    .zip(b.iter())
                    .map(|(x, y)| (x ^ y).count_ones())
                    .sum(),
            ),
            _ => None,
        }
    }

    /// Euclidean distance; `None` unless both rows are float of equal width.
    pub fn l2_distance(&self, other: &DescriptorRow<'_>) -> Option<f32> {
        match (self, other) {
            (DescriptorRow::Float(a), DescriptorRow::Float(b)) if a.len() == b.len() => Some(
                a.iter()
                    .zip(b.iter())
                    .map(|(x, y)| (x - y) * (x - y))
                    .sum::<f32>()
                    .sqrt(),
            ),
            _ => None,
        }
    }
}

fn check_len(rows: usize, cols: usize, len: usize) -> Result<()> {
    if rows.checked_mul(cols) != Some(len) {
        return Err(CoreError::ShapeMismatch(format!(
            "descriptor data has {len} elements, expected {rows}x{cols}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_rows_are_sliced_row_major() {
        let m = DescriptorMatrix::binary(2, 3, vec![1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(m.kind(), DescriptorKind::Binary);
        assert_eq!(m.row(1), Some(DescriptorRow::Binary(&[4, 5, 6])));
        assert!(m.row(2).is_none());
        assert_eq!(m.iter_rows().count(), 2);
    }

    #[test]
    fn length_mismatch_is_rejected() {
        let err = DescriptorMatrix::float(2, 4, vec![0.0; 7]).unwrap_err();
        assert!(matches!(err, CoreError::ShapeMismatch(_)));
    }

    #[test]
    fn overflowing_shape_is_rejected() {
        let err = DescriptorMatrix::binary(1 << 33, 1 << 31, Vec::new()).unwrap_err();
        assert!(matches!(err, CoreError::ShapeMismatch(_)));
        let err = DescriptorMatrix::float(usize::MAX, 2, Vec::new()).unwrap_err();
        assert!(matches!(err, CoreError::ShapeMismatch(_)));
    }

    #[test]
    fn empty_matrix_keeps_kind_and_width() {
        let m = DescriptorMatrix::empty(DescriptorKind::Float, 128);
        assert!(m.is_empty());
        assert_eq!(m.rows(), 0);
        assert_eq!(m.cols(), 128);
        assert_eq!(m.as_float(), Some(&[][..]));
        assert!(m.as_binary().is_none());
    }

    #[test]
    fn hamming_counts_differing_bits() {
        let a = DescriptorRow::Binary(&[0xFF, 0x00, 0b1010_1010]);
        let b = DescriptorRow::Binary(&[0x00, 0x00, 0b0101_0101]);
        assert_eq!(a.hamming_distance(&b), Some(16));
        assert_eq!(a.hamming_distance(&a), Some(0));
    }

    #[test]
    fn distances_require_matching_kinds() {
        let bin = DescriptorRow::Binary(&[1, 2]);
        let float = DescriptorRow::Float(&[1.0, 2.0]);
        assert!(bin.hamming_distance(&float).is_none());
        assert!(float.l2_distance(&bin).is_none());
        let other = DescriptorRow::Float(&[4.0, 6.0]);
        assert_eq!(float.l2_distance(&other), Some(5.0));
    }
}
