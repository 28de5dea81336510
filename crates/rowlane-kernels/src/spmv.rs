//! y = A @ x, streamed through the segmenter/reducer pipeline, plus the row-wise reference
use std::thread;

use crossbeam_channel::bounded;
use rayon::prelude::*;
use rowlane_core::{i64_to_usize, Csr, PipelineConfig, Result, RowlaneError};
use tracing::debug;

use crate::accumulate::Accumulator;
use crate::multiply::multiply_blocks;
use crate::pipeline::Pipeline;
use crate::tiling::{encode_descriptors, partition_rows};
use crate::util::{SMALL_DIM_LIMIT, SMALL_NNZ_LIMIT};

#[inline]
fn spmv_row(a: &Csr<f64, i64>, x: &[f64], i: usize) -> f64 {
    let mut acc = 0.0f64;
    for p in a.row_range(i) {
        acc += a.data[p] * x[i64_to_usize(a.indices[p])];
    }
    acc
}

/// y = A @ x, row by row
#[must_use]
pub fn spmv_reference(a: &Csr<f64, i64>, x: &[f64]) -> Vec<f64> {
    assert_eq!(x.len(), a.ncols, "x length must equal ncols");
    let mut y = vec![0.0f64; a.nrows];
    // For small problems, avoid rayon overhead and compute sequentially.
    if a.nrows <= SMALL_DIM_LIMIT || a.nnz() <= SMALL_NNZ_LIMIT {
        for (i, yi) in y.iter_mut().enumerate() {
            *yi = spmv_row(a, x, i);
        }
        return y;
    }
    y.par_iter_mut()
        .enumerate()
        .for_each(|(i, yi)| *yi = spmv_row(a, x, i));
    y
}

/// y = A @ x through the streaming pipeline.
///
/// Rows are split into `config.tiles` tiles, encoded into descriptors and lane-product blocks,
/// and fed by two producer threads for `config.runs` runs. Every run is accumulated; the output
/// of the last run is returned. When `config.total_blocks` is unset it is filled in from the
/// multiplier so each run's block count is checked.
///
/// # Errors
/// - [`RowlaneError::InvalidConfig`] for an invalid `config`.
/// - [`RowlaneError::InvalidMatrix`] when `x` does not match `a` or rows do not fit the stream
///   encoding.
/// - any contract violation raised by the pipeline or the accumulator.
pub fn spmv_streamed(
    a: &Csr<f64, i64>,
    x: &[f64],
    config: &PipelineConfig,
) -> Result<Vec<f64>> {
    config.validate()?;
    if x.len() != a.ncols {
        return Err(RowlaneError::InvalidMatrix(format!(
            "x length {} must equal ncols {}",
            x.len(),
            a.ncols
        )));
    }
    let ranges = partition_rows(a, config.tiles);
    let descriptors = encode_descriptors(a, &ranges)?;
    let blocks = multiply_blocks(a, x, &ranges, config.lanes);
    let mut config = config.clone();
    if config.total_blocks.is_none() {
        config.total_blocks = Some(blocks.len());
    }
    debug!(
        nrows = a.nrows,
        nnz = a.nnz(),
        tiles = config.tiles,
        blocks = blocks.len(),
        "streamed spmv"
    );

    let runs = config.runs;
    let depth = config.channel_depth;
    let pipeline = Pipeline::new(config)?;
    let mut acc = Accumulator::new(a.nrows, pipeline.config().tiles);
    let (desc_tx, desc_rx) = bounded(depth);
    let (block_tx, block_rx) = bounded(depth);

    thread::scope(|s| {
        s.spawn(move || {
            for _ in 0..runs {
                for d in &descriptors {
                    if desc_tx.send(*d).is_err() {
                        return;
                    }
                }
            }
        });
        s.spawn(move || {
            for _ in 0..runs {
                for b in &blocks {
                    if block_tx.send(b.clone()).is_err() {
                        return;
                    }
                }
            }
        });
        pipeline.run(desc_rx, block_rx, |partial| acc.push(partial))
    })?;
    acc.finish()
}
