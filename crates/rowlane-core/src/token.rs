//! Stream elements exchanged between the segmenter, the reducer and their collaborators

use crate::error::{Result, RowlaneError};
use crate::lanes::LaneMask;

/// Row index carried by tile-end sentinels; never a valid output row.
pub const TILE_END_ROW: u32 = u32::MAX;

/// One CSR row as announced to the segmenter, or the end of a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowDescriptor {
    pub row: u32,
    pub nnz: u32,
    pub is_tile_end: bool,
}

impl RowDescriptor {
    #[inline]
    #[must_use]
    pub const fn new(row: u32, nnz: u32) -> Self {
        Self {
            row,
            nnz,
            is_tile_end: false,
        }
    }

    #[inline]
    #[must_use]
    pub const fn tile_end() -> Self {
        Self {
            row: TILE_END_ROW,
            nnz: 0,
            is_tile_end: true,
        }
    }
}

/// Lanes of the current block that belong to one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaneSelectionToken {
    pub row: u32,
    pub mask: LaneMask,
    /// Last segment of `row`.
    pub is_row_complete: bool,
    /// The reducer must take a fresh block before applying `mask`.
    pub needs_new_block: bool,
    pub is_tile_end: bool,
}

impl LaneSelectionToken {
    #[inline]
    #[must_use]
    pub const fn tile_end() -> Self {
        Self {
            row: TILE_END_ROW,
            mask: LaneMask::empty(),
            is_row_complete: false,
            needs_new_block: false,
            is_tile_end: true,
        }
    }
}

/// Precomputed lane products of one block.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueBlock {
    values: Box<[f64]>,
}

impl ValueBlock {
    #[inline]
    #[must_use]
    pub fn new(values: Vec<f64>) -> Self {
        Self {
            values: values.into_boxed_slice(),
        }
    }

    /// Block of `lanes` zeros.
    #[inline]
    #[must_use]
    pub fn zeroed(lanes: usize) -> Self {
        Self::new(vec![0.0; lanes])
    }

    #[inline]
    #[must_use]
    pub fn lanes(&self) -> usize {
        self.values.len()
    }

    #[inline]
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Check the block against the configured lane width.
    ///
    /// # Errors
    /// [`RowlaneError::BlockWidth`] when the widths differ.
    #[inline]
    pub fn expect_lanes(&self, lanes: usize) -> Result<()> {
        if self.lanes() == lanes {
            Ok(())
        } else {
            Err(RowlaneError::BlockWidth {
                expected: lanes,
                actual: self.lanes(),
            })
        }
    }

    /// Sum of the lanes selected by `mask`, added in ascending lane order from 0.0.
    #[inline]
    #[must_use]
    pub fn masked_sum(&self, mask: LaneMask) -> f64 {
        let mut acc = 0.0f64;
        for j in mask.lanes() {
            acc += self.values[j];
        }
        acc
    }
}

/// Partial dot product of one row segment, or the end of a tile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PartialSumToken {
    pub row: u32,
    pub value: f64,
    pub is_row_complete: bool,
    pub is_tile_end: bool,
}

impl PartialSumToken {
    #[inline]
    #[must_use]
    pub const fn new(row: u32, value: f64, is_row_complete: bool) -> Self {
        Self {
            row,
            value,
            is_row_complete,
            is_tile_end: false,
        }
    }

    #[inline]
    #[must_use]
    pub const fn tile_end() -> Self {
        Self {
            row: TILE_END_ROW,
            value: 0.0,
            is_row_complete: false,
            is_tile_end: true,
        }
    }
}

/// A lane selection shipped together with the block it opens, if any.
///
/// Carried on the internal channel between the two pipeline stages so the reducer never
/// reads blocks on its own.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkedSegment {
    pub token: LaneSelectionToken,
    pub block: Option<ValueBlock>,
}

impl MarkedSegment {
    #[inline]
    #[must_use]
    pub const fn tile_end() -> Self {
        Self {
            token: LaneSelectionToken::tile_end(),
            block: None,
        }
    }
}
