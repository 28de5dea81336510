//! Lane products: packs `data[p] * x[indices[p]]` of every tile into fixed-width value blocks
use std::ops::Range;

use rayon::prelude::*;
use rowlane_core::{i64_to_usize, Csr, ValueBlock};
use wide::f64x4;

use crate::util::SMALL_NNZ_LIMIT;

/// One block of products for the stored entries `span` (at most `lanes` of them).
/// Lanes past the end of `span` stay zero.
fn product_block(a: &Csr<f64, i64>, x: &[f64], span: Range<usize>, lanes: usize) -> ValueBlock {
    debug_assert!(span.len() <= lanes);
    let mut values = vec![0.0f64; lanes];
    let vals = &a.data[span.clone()];
    let idx = &a.indices[span];
    let mut k = 0usize;
    let limit4 = vals.len() & !3;
    while k < limit4 {
        let v = f64x4::from([vals[k], vals[k + 1], vals[k + 2], vals[k + 3]]);
        let xv = f64x4::from([
            x[i64_to_usize(idx[k])],
            x[i64_to_usize(idx[k + 1])],
            x[i64_to_usize(idx[k + 2])],
            x[i64_to_usize(idx[k + 3])],
        ]);
        values[k..k + 4].copy_from_slice(&(v * xv).to_array());
        k += 4;
    }
    while k < vals.len() {
        values[k] = vals[k] * x[i64_to_usize(idx[k])];
        k += 1;
    }
    ValueBlock::new(values)
}

/// Value blocks of one tile. Entries of consecutive rows are packed back to back, the last
/// block is zero-padded, and an empty tile has no blocks.
#[must_use]
pub fn multiply_tile(
    a: &Csr<f64, i64>,
    x: &[f64],
    rows: Range<usize>,
    lanes: usize,
) -> Vec<ValueBlock> {
    if rows.is_empty() {
        return Vec::new();
    }
    let start = i64_to_usize(a.indptr[rows.start]);
    let end = i64_to_usize(a.indptr[rows.end]);
    let nblocks = (end - start).div_ceil(lanes);
    let span = |b: usize| {
        let s = start + b * lanes;
        s..(s + lanes).min(end)
    };
    if end - start < SMALL_NNZ_LIMIT {
        return (0..nblocks)
            .map(|b| product_block(a, x, span(b), lanes))
            .collect();
    }
    (0..nblocks)
        .into_par_iter()
        .map(|b| product_block(a, x, span(b), lanes))
        .collect()
}

/// Value blocks for one run over all tiles, in the order the segmenter will request them.
#[must_use]
pub fn multiply_blocks(
    a: &Csr<f64, i64>,
    x: &[f64],
    ranges: &[Range<usize>],
    lanes: usize,
) -> Vec<ValueBlock> {
    assert_eq!(x.len(), a.ncols, "x length must equal ncols");
    ranges
        .iter()
        .flat_map(|rows| multiply_tile(a, x, rows.clone(), lanes))
        .collect()
}
