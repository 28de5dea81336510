//! Row tiling and the row descriptor encoder feeding the segmenter

use std::ops::Range;

use rowlane_core::{Csr, Result, RowDescriptor};

use crate::util::{nnz_to_u32, row_to_u32};

/// Split the rows of `a` into exactly `tiles` contiguous ranges, greedily balanced by nnz.
///
/// A range closes once it holds at least `nnz / tiles` entries; trailing ranges may be empty
/// when a few rows carry most of the entries.
#[must_use]
pub fn partition_rows(a: &Csr<f64, i64>, tiles: usize) -> Vec<Range<usize>> {
    if tiles == 0 {
        return Vec::new();
    }
    let target = (a.nnz() / tiles).max(1);
    let mut ranges: Vec<Range<usize>> = Vec::with_capacity(tiles);
    let mut acc = 0usize;
    let mut r0 = 0usize;
    for i in 0..a.nrows {
        acc += a.row_nnz(i);
        if acc >= target && ranges.len() + 1 < tiles {
            ranges.push(r0..i + 1);
            r0 = i + 1;
            acc = 0;
        }
    }
    ranges.push(r0..a.nrows);
    ranges.resize(tiles, a.nrows..a.nrows);
    ranges
}

/// Descriptors for one run: per tile, one descriptor per non-empty row, then a tile end.
///
/// Empty rows are skipped; they never produce a partial sum and keep their output at zero.
///
/// # Errors
/// [`rowlane_core::RowlaneError::InvalidMatrix`] when a row index or length does not fit the
/// stream encoding.
pub fn encode_descriptors(
    a: &Csr<f64, i64>,
    ranges: &[Range<usize>],
) -> Result<Vec<RowDescriptor>> {
    let mut out = Vec::with_capacity(a.nrows + ranges.len());
    for range in ranges {
        for i in range.clone() {
            let nnz = a.row_nnz(i);
            if nnz > 0 {
                out.push(RowDescriptor::new(row_to_u32(i)?, nnz_to_u32(nnz)?));
            }
        }
        out.push(RowDescriptor::tile_end());
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lens_csr(lens: &[usize]) -> Csr<f64, i64> {
        let mut indptr = vec![0i64];
        let mut indices = Vec::new();
        for &n in lens {
            indices.extend((0..n).map(|j| i64::try_from(j).unwrap()));
            indptr.push(i64::try_from(indices.len()).unwrap());
        }
        let data = vec![1.0; indices.len()];
        let ncols = lens.iter().copied().max().unwrap_or(0).max(1);
        Csr::from_parts(lens.len(), ncols, indptr, indices, data, true).unwrap()
    }

    #[test]
    fn partitions_cover_all_rows() {
        let a = lens_csr(&[3, 2, 5, 1, 1, 4]);
        let ranges = partition_rows(&a, 3);
        assert_eq!(ranges.len(), 3);
        assert_eq!(ranges[0].start, 0);
        assert_eq!(ranges[2].end, 6);
        for w in ranges.windows(2) {
            assert_eq!(w[0].end, w[1].start);
        }
        assert_eq!(ranges, vec![0..2, 2..3, 3..6]);
    }

    #[test]
    fn more_tiles_than_rows_pads_with_empty_ranges() {
        let a = lens_csr(&[2, 2]);
        let ranges = partition_rows(&a, 4);
        assert_eq!(ranges, vec![0..1, 1..2, 2..2, 2..2]);
        assert!(partition_rows(&a, 0).is_empty());
    }

    #[test]
    fn single_tile_takes_everything() {
        let a = lens_csr(&[7, 0, 1]);
        assert_eq!(partition_rows(&a, 1), vec![0..3]);
    }

    #[test]
    fn encoder_skips_empty_rows() {
        let a = lens_csr(&[2, 0, 3]);
        let d = encode_descriptors(&a, &[0..2, 2..3]).unwrap();
        assert_eq!(
            d,
            vec![
                RowDescriptor::new(0, 2),
                RowDescriptor::tile_end(),
                RowDescriptor::new(2, 3),
                RowDescriptor::tile_end(),
            ]
        );
    }
}
