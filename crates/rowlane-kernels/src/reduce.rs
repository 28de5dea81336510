//! Masked block reducer: turns lane selections into per-segment partial sums

use rowlane_core::{
    validate_lanes, LaneSelectionToken, PartialSumToken, Result, RowlaneError, ValueBlock,
};
use tracing::{trace, warn};

use crate::segment::TileStats;

/// Applies lane masks to the current value block.
///
/// Holds at most one block. A block is taken only when a token says `needs_new_block`, and the
/// cached block is dropped at every tile end.
#[derive(Debug, Clone)]
pub struct BlockReducer {
    lanes: usize,
    current: Option<ValueBlock>,
}

impl BlockReducer {
    /// # Errors
    /// [`RowlaneError::InvalidConfig`] for a lane width outside `1..=MAX_LANES`.
    pub fn new(lanes: usize) -> Result<Self> {
        validate_lanes(lanes)?;
        Ok(Self {
            lanes,
            current: None,
        })
    }

    #[inline]
    #[must_use]
    pub const fn lanes(&self) -> usize {
        self.lanes
    }

    /// Reduce one token together with the block it opens.
    ///
    /// `fresh` must be `Some` exactly when `token.needs_new_block` is set, and `None` for the
    /// tile-end token, which yields the tile-end sentinel.
    ///
    /// # Errors
    /// - [`RowlaneError::BlockPairing`] when `fresh` disagrees with the token.
    /// - [`RowlaneError::BlockWidth`] for a block of the wrong width.
    /// - [`RowlaneError::NoCachedBlock`] for a continuation segment with no block read yet.
    /// - [`RowlaneError::MaskOutOfRange`] for a mask reaching past the lane width.
    /// - [`RowlaneError::TileEndWithBlock`] for a tile-end token flagged `needs_new_block`.
    pub fn reduce(
        &mut self,
        token: &LaneSelectionToken,
        fresh: Option<ValueBlock>,
    ) -> Result<PartialSumToken> {
        if token.is_tile_end && token.needs_new_block {
            warn!("tile-end token requests a block");
            return Err(RowlaneError::TileEndWithBlock);
        }
        if token.needs_new_block != fresh.is_some() {
            warn!(
                row = token.row,
                needs_new_block = token.needs_new_block,
                "block pairing mismatch"
            );
            return Err(RowlaneError::BlockPairing {
                row: token.row,
                needs_new_block: token.needs_new_block,
                has_block: fresh.is_some(),
            });
        }
        if token.is_tile_end {
            self.current = None;
            return Ok(PartialSumToken::tile_end());
        }
        if let Some(block) = fresh {
            block.expect_lanes(self.lanes)?;
            self.current = Some(block);
        }
        let Some(block) = self.current.as_ref() else {
            warn!(row = token.row, "segment before first block of tile");
            return Err(RowlaneError::NoCachedBlock { row: token.row });
        };
        if token.mask.last().is_some_and(|l| l >= self.lanes) {
            warn!(row = token.row, lanes = self.lanes, "lane mask past block width");
            return Err(RowlaneError::MaskOutOfRange {
                row: token.row,
                lanes: self.lanes,
            });
        }
        let value = block.masked_sum(token.mask);
        Ok(PartialSumToken::new(token.row, value, token.is_row_complete))
    }

    /// Reduce one tile from independent token and block streams.
    ///
    /// Exactly one block is pulled from `blocks` per `needs_new_block` token; nothing is read
    /// ahead. Emits one partial sum per row segment followed by the tile-end sentinel.
    ///
    /// # Errors
    /// - [`RowlaneError::TokenStreamEnded`] if `tokens` runs dry before the tile-end token.
    /// - [`RowlaneError::BlockStreamEnded`] if a block is needed and `blocks` is exhausted.
    /// - [`RowlaneError::TileEndWithBlock`] for a tile-end token flagged `needs_new_block`,
    ///   before any block is read.
    /// - anything returned by [`BlockReducer::reduce`] or `emit`.
    pub fn reduce_tile<T, B, F>(
        &mut self,
        tile: usize,
        tokens: &mut T,
        blocks: &mut B,
        mut emit: F,
    ) -> Result<TileStats>
    where
        T: Iterator<Item = LaneSelectionToken>,
        B: Iterator<Item = ValueBlock>,
        F: FnMut(PartialSumToken) -> Result<()>,
    {
        let mut stats = TileStats::default();
        self.current = None;
        loop {
            let Some(token) = tokens.next() else {
                warn!(tile, "lane-selection stream ended before tile end");
                return Err(RowlaneError::TokenStreamEnded { tile });
            };
            if token.is_tile_end && token.needs_new_block {
                warn!(tile, "tile-end token requests a block");
                return Err(RowlaneError::TileEndWithBlock);
            }
            let fresh = if token.needs_new_block {
                let Some(block) = blocks.next() else {
                    warn!(tile, row = token.row, "value block stream exhausted");
                    return Err(RowlaneError::BlockStreamEnded { tile });
                };
                stats.blocks += 1;
                Some(block)
            } else {
                None
            };
            let out = self.reduce(&token, fresh)?;
            emit(out)?;
            if token.is_tile_end {
                break;
            }
            stats.segments += 1;
            stats.rows += usize::from(token.is_row_complete);
        }
        trace!(tile, segments = stats.segments, blocks = stats.blocks, "tile reduced");
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowlane_core::{LaneMask, TILE_END_ROW};

    fn seg(row: u32, start: usize, end: usize, complete: bool, fresh: bool) -> LaneSelectionToken {
        LaneSelectionToken {
            row,
            mask: LaneMask::range(start, end),
            is_row_complete: complete,
            needs_new_block: fresh,
            is_tile_end: false,
        }
    }

    #[test]
    fn scenario_partial_sums() {
        let tokens = vec![
            seg(0, 0, 2, true, true),
            seg(1, 3, 3, false, false),
            seg(1, 0, 0, true, true),
            seg(2, 1, 3, false, false),
            seg(2, 0, 1, true, true),
            LaneSelectionToken::tile_end(),
        ];
        let blocks = vec![
            ValueBlock::new(vec![1.0, 2.0, 3.0, 4.0]),
            ValueBlock::new(vec![5.0, 6.0, 7.0, 8.0]),
            ValueBlock::new(vec![9.0, 10.0, 0.0, 0.0]),
        ];
        let mut r = BlockReducer::new(4).unwrap();
        let mut out = Vec::new();
        let mut b = blocks.into_iter();
        let stats = r
            .reduce_tile(0, &mut tokens.into_iter(), &mut b, |p| {
                out.push(p);
                Ok(())
            })
            .unwrap();
        assert_eq!(stats.blocks, 3);
        assert_eq!(stats.segments, 5);
        assert_eq!(stats.rows, 3);
        assert!(b.next().is_none());
        assert_eq!(
            out,
            vec![
                PartialSumToken::new(0, 6.0, true),
                PartialSumToken::new(1, 4.0, false),
                PartialSumToken::new(1, 5.0, true),
                PartialSumToken::new(2, 21.0, false),
                PartialSumToken::new(2, 19.0, true),
                PartialSumToken::tile_end(),
            ]
        );
    }

    #[test]
    fn tile_end_reads_no_block() {
        let mut r = BlockReducer::new(4).unwrap();
        let mut blocks = vec![ValueBlock::zeroed(4)].into_iter();
        let mut out = Vec::new();
        let mut tokens = vec![LaneSelectionToken::tile_end()].into_iter();
        r.reduce_tile(0, &mut tokens, &mut blocks, |p| {
            out.push(p);
            Ok(())
        })
        .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].row, TILE_END_ROW);
        assert_eq!(blocks.len(), 1);
    }

    #[test]
    fn pairing_is_enforced() {
        let mut r = BlockReducer::new(4).unwrap();
        let err = r.reduce(&seg(0, 0, 1, true, true), None).unwrap_err();
        assert!(matches!(err, RowlaneError::BlockPairing { has_block: false, .. }));
        let err = r
            .reduce(&seg(0, 0, 1, true, false), Some(ValueBlock::zeroed(4)))
            .unwrap_err();
        assert!(matches!(err, RowlaneError::BlockPairing { has_block: true, .. }));
    }

    #[test]
    fn continuation_without_block_fails() {
        let mut r = BlockReducer::new(4).unwrap();
        let err = r.reduce(&seg(9, 2, 3, true, false), None).unwrap_err();
        assert_eq!(err, RowlaneError::NoCachedBlock { row: 9 });
    }

    #[test]
    fn cache_is_dropped_at_tile_end() {
        let mut r = BlockReducer::new(2).unwrap();
        r.reduce(&seg(0, 0, 0, true, true), Some(ValueBlock::new(vec![1.0, 2.0])))
            .unwrap();
        r.reduce(&LaneSelectionToken::tile_end(), None).unwrap();
        let err = r.reduce(&seg(1, 1, 1, true, false), None).unwrap_err();
        assert_eq!(err, RowlaneError::NoCachedBlock { row: 1 });
    }

    #[test]
    fn wrong_block_width_fails() {
        let mut r = BlockReducer::new(4).unwrap();
        let err = r
            .reduce(&seg(0, 0, 0, true, true), Some(ValueBlock::zeroed(3)))
            .unwrap_err();
        assert_eq!(err, RowlaneError::BlockWidth { expected: 4, actual: 3 });
    }

    #[test]
    fn mask_past_block_width_fails() {
        let mut r = BlockReducer::new(4).unwrap();
        let err = r
            .reduce(&seg(3, 2, 5, true, true), Some(ValueBlock::zeroed(4)))
            .unwrap_err();
        assert_eq!(err, RowlaneError::MaskOutOfRange { row: 3, lanes: 4 });
    }

    #[test]
    fn tile_end_requesting_block_is_rejected() {
        let flagged = LaneSelectionToken {
            needs_new_block: true,
            ..LaneSelectionToken::tile_end()
        };
        let mut r = BlockReducer::new(4).unwrap();
        let mut blocks = vec![ValueBlock::zeroed(4)].into_iter();
        let err = r
            .reduce_tile(0, &mut vec![flagged].into_iter(), &mut blocks, |_| Ok(()))
            .unwrap_err();
        assert_eq!(err, RowlaneError::TileEndWithBlock);
        assert_eq!(blocks.len(), 1);

        let err = r.reduce(&flagged, Some(ValueBlock::zeroed(4))).unwrap_err();
        assert_eq!(err, RowlaneError::TileEndWithBlock);
    }

    #[test]
    fn missing_block_is_fatal() {
        let mut r = BlockReducer::new(4).unwrap();
        let mut tokens = vec![seg(0, 0, 0, true, true), LaneSelectionToken::tile_end()].into_iter();
        let err = r
            .reduce_tile(2, &mut tokens, &mut std::iter::empty(), |_| Ok(()))
            .unwrap_err();
        assert_eq!(err, RowlaneError::BlockStreamEnded { tile: 2 });
    }

    #[test]
    fn missing_tile_end_is_fatal() {
        let mut r = BlockReducer::new(4).unwrap();
        let mut tokens = vec![seg(0, 0, 0, true, true)].into_iter();
        let mut blocks = vec![ValueBlock::zeroed(4)].into_iter();
        let err = r.reduce_tile(1, &mut tokens, &mut blocks, |_| Ok(())).unwrap_err();
        assert_eq!(err, RowlaneError::TokenStreamEnded { tile: 1 });
    }
}
