//! Streaming CSR SpMV kernels for rowlane: row segmenter, masked block reducer and the pipeline
//! joining them, plus the host-side tiling, multiplier and accumulator around it.

pub mod accumulate;
pub mod multiply;
pub mod pipeline;
pub mod reduce;
pub mod segment;
pub mod spmv;
pub mod tiling;
pub mod transform;
mod util;

pub use accumulate::Accumulator;
pub use multiply::{multiply_blocks, multiply_tile};
pub use pipeline::{channel_sink, Pipeline, PipelineReport};
pub use reduce::BlockReducer;
pub use segment::{RowSegmenter, TileStats};
pub use spmv::{spmv_reference, spmv_streamed};
pub use tiling::{encode_descriptors, partition_rows};
pub use transform::{permute_rows, row_order, row_sums_f64, RowOrder};
