//! Core data structures for rowlane: CSR storage, lane masks, stream tokens, config and errors

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod config;
pub mod csr;
pub mod error;
pub mod lanes;
pub mod token;

pub use config::{validate_lanes, PipelineConfig, DEFAULT_CHANNEL_DEPTH, DEFAULT_LANES};
pub use csr::{i64_to_usize, Csr};
pub use error::{Result, RowlaneError};
pub use lanes::{LaneCursor, LaneMask, Lanes, MAX_LANES};
pub use token::{
    LaneSelectionToken, MarkedSegment, PartialSumToken, RowDescriptor, ValueBlock, TILE_END_ROW,
};
