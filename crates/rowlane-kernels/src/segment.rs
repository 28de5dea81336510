//! Row segmenter: maps variable-length rows onto fixed-width value blocks.
//!
//! Rows are packed contiguously into blocks of `lanes` lanes. For every (row, block) overlap the
//! segmenter emits one [`LaneSelectionToken`] whose mask is the lane range of that row inside
//! the block. The first segment that lands in a block carries `needs_new_block`, which is the
//! only thing that paces block consumption downstream.

use rowlane_core::{
    validate_lanes, LaneCursor, LaneMask, LaneSelectionToken, Result, RowDescriptor, RowlaneError,
};
use tracing::{trace, warn};

/// Counters for one segmented (or reduced) tile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TileStats {
    /// Rows announced by descriptors.
    pub rows: usize,
    /// Row segments emitted, tile-end token excluded.
    pub segments: usize,
    /// Segments carrying `needs_new_block`.
    pub blocks: usize,
}

impl TileStats {
    pub(crate) fn merge(&mut self, other: Self) {
        self.rows += other.rows;
        self.segments += other.segments;
        self.blocks += other.blocks;
    }
}

#[derive(Debug, Clone)]
pub struct RowSegmenter {
    lanes: usize,
}

impl RowSegmenter {
    /// # Errors
    /// [`RowlaneError::InvalidConfig`] for a lane width outside `1..=MAX_LANES`.
    pub fn new(lanes: usize) -> Result<Self> {
        validate_lanes(lanes)?;
        Ok(Self { lanes })
    }

    #[inline]
    #[must_use]
    pub const fn lanes(&self) -> usize {
        self.lanes
    }

    /// Segment one tile.
    ///
    /// Pulls descriptors until the tile-end descriptor, emitting row segments in order and then
    /// one tile-end token. Cursor state starts fresh, so the first segment of every tile opens a
    /// new block.
    ///
    /// # Errors
    /// - [`RowlaneError::DescriptorStreamEnded`] if `descriptors` runs dry before the tile end.
    /// - [`RowlaneError::EmptyRow`] for a descriptor with `nnz == 0`.
    /// - anything returned by `emit`.
    pub fn segment_tile<D, F>(
        &self,
        tile: usize,
        descriptors: &mut D,
        mut emit: F,
    ) -> Result<TileStats>
    where
        D: Iterator<Item = RowDescriptor>,
        F: FnMut(LaneSelectionToken) -> Result<()>,
    {
        let lanes = self.lanes;
        let mut cursor = LaneCursor::NeedsBlock;
        let mut stats = TileStats::default();

        loop {
            let Some(desc) = descriptors.next() else {
                warn!(tile, "descriptor stream ended before tile end");
                return Err(RowlaneError::DescriptorStreamEnded { tile });
            };
            if desc.is_tile_end {
                break;
            }
            if desc.nnz == 0 {
                warn!(tile, row = desc.row, "zero-length row descriptor");
                return Err(RowlaneError::EmptyRow { row: desc.row });
            }
            stats.rows += 1;

            let mut remaining = desc.nnz as usize;
            while remaining > 0 {
                let (start, needs_new_block) = match cursor {
                    LaneCursor::AtLane(n) => (n, false),
                    LaneCursor::NeedsBlock => (0, true),
                };
                let free = lanes - start;
                let seg_len = remaining.min(free);
                let end = start + seg_len - 1;
                let is_row_complete = remaining <= free;

                emit(LaneSelectionToken {
                    row: desc.row,
                    mask: LaneMask::range(start, end),
                    is_row_complete,
                    needs_new_block,
                    is_tile_end: false,
                })?;
                stats.segments += 1;
                stats.blocks += usize::from(needs_new_block);

                if is_row_complete {
                    cursor = LaneCursor::after(end, lanes);
                    remaining = 0;
                } else {
                    remaining -= seg_len;
                    cursor = LaneCursor::NeedsBlock;
                }
            }
        }

        emit(LaneSelectionToken::tile_end())?;
        trace!(
            tile,
            rows = stats.rows,
            segments = stats.segments,
            blocks = stats.blocks,
            "tile segmented"
        );
        Ok(stats)
    }

    /// Segment one tile into a vector, tile-end token last.
    ///
    /// # Errors
    /// Same as [`RowSegmenter::segment_tile`].
    pub fn segment_tile_to_vec<D>(
        &self,
        tile: usize,
        descriptors: &mut D,
    ) -> Result<Vec<LaneSelectionToken>>
    where
        D: Iterator<Item = RowDescriptor>,
    {
        let mut out = Vec::new();
        self.segment_tile(tile, descriptors, |t| {
            out.push(t);
            Ok(())
        })?;
        Ok(out)
    }
}
