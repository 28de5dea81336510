//! Error types for the streaming SpMV stages.

use thiserror::Error;

/// Result type alias for rowlane operations.
pub type Result<T> = std::result::Result<T, RowlaneError>;

/// Contract violations detected by the segmenter, reducer, pipeline or accumulator.
/// The pipeline stops on the first one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RowlaneError {
    /// Invalid pipeline configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Malformed CSR parts.
    #[error("invalid matrix: {0}")]
    InvalidMatrix(String),

    /// A row descriptor announced zero stored entries.
    #[error("row {row} has no stored entries")]
    EmptyRow {
        /// Row index from the descriptor
        row: u32,
    },

    /// The descriptor stream ended before the tile-end descriptor.
    #[error("row descriptor stream ended inside tile {tile}")]
    DescriptorStreamEnded {
        /// Tile being segmented
        tile: usize,
    },

    /// The lane-selection stream ended before the tile-end token.
    #[error("lane-selection stream ended inside tile {tile}")]
    TokenStreamEnded {
        /// Tile being reduced
        tile: usize,
    },

    /// A block was requested but the value block stream was exhausted.
    #[error("value block stream ended inside tile {tile}")]
    BlockStreamEnded {
        /// Tile being processed
        tile: usize,
    },

    /// A value block had the wrong number of lanes.
    #[error("value block has {actual} lanes, expected {expected}")]
    BlockWidth {
        /// Configured lane width
        expected: usize,
        /// Lanes in the offending block
        actual: usize,
    },

    /// A fresh block did not line up with the segment's `needs_new_block` flag.
    #[error("segment of row {row}: needs_new_block={needs_new_block} but fresh block present={has_block}")]
    BlockPairing {
        /// Row of the offending segment
        row: u32,
        /// Flag carried by the segment
        needs_new_block: bool,
        /// Whether a block came with it
        has_block: bool,
    },

    /// A lane mask selected lanes past the block width.
    #[error("segment of row {row} selects lanes past block width {lanes}")]
    MaskOutOfRange {
        /// Row of the offending segment
        row: u32,
        /// Configured lane width
        lanes: usize,
    },

    /// A tile-end token asked for a value block.
    #[error("tile-end token requests a value block")]
    TileEndWithBlock,

    /// A continuation segment arrived before any block of the tile was read.
    #[error("segment of row {row} references a block before one was read")]
    NoCachedBlock {
        /// Row of the offending segment
        row: u32,
    },

    /// Blocks consumed in a run differ from the configured total.
    #[error("run {run} consumed {actual} value blocks, expected {expected}")]
    BlockCount {
        /// Run index
        run: usize,
        /// Configured blocks per run
        expected: usize,
        /// Blocks actually consumed
        actual: usize,
    },

    /// The peer stage hung up.
    #[error("stream closed: {0}")]
    StreamClosed(&'static str),

    /// Partial sums stopped before a run was complete.
    #[error("partial sums ended inside a run after {completed} complete runs")]
    IncompleteRun {
        /// Runs fully accumulated
        completed: usize,
    },

    /// A partial sum referenced a row outside the output vector.
    #[error("partial sum for row {row} outside output of {nrows} rows")]
    RowOutOfRange {
        /// Row index of the partial sum
        row: u32,
        /// Output length
        nrows: usize,
    },

    /// A tile ended with a row still waiting for its completing segment.
    #[error("tile ended before row {row} was complete")]
    IncompleteRow {
        /// Row left open
        row: u32,
    },

    /// A segment arrived for a row that had already completed in the same tile.
    #[error("segment for row {row} arrived after the row completed")]
    RowAfterComplete {
        /// Row index
        row: u32,
    },
}

impl RowlaneError {
    /// Whether this error only reports that the other side of a channel went away.
    #[inline]
    #[must_use]
    pub const fn is_stream_closed(&self) -> bool {
        matches!(self, Self::StreamClosed(_))
    }
}
