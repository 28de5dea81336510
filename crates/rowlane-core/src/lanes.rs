//! Lane masks and the segmenter's lane cursor

use std::fmt;

/// Widest block a [`LaneMask`] can describe.
pub const MAX_LANES: usize = 64;

/// Set of lanes inside one value block; lane `j` is bit `j`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LaneMask(u64);

impl LaneMask {
    #[inline]
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Lanes `start..=end`.
    #[inline]
    #[must_use]
    pub const fn range(start: usize, end: usize) -> Self {
        debug_assert!(start <= end && end < MAX_LANES);
        let width = end - start + 1;
        let ones = if width == MAX_LANES {
            u64::MAX
        } else {
            (1u64 << width) - 1
        };
        Self(ones << start)
    }

    #[inline]
    #[must_use]
    pub const fn bits(self) -> u64 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    #[must_use]
    pub const fn contains(self, lane: usize) -> bool {
        lane < MAX_LANES && self.0 & (1u64 << lane) != 0
    }

    /// Number of selected lanes.
    #[inline]
    #[must_use]
    pub const fn count(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Lowest selected lane.
    #[inline]
    #[must_use]
    pub const fn first(self) -> Option<usize> {
        if self.0 == 0 {
            None
        } else {
            Some(self.0.trailing_zeros() as usize)
        }
    }

    /// Highest selected lane.
    #[inline]
    #[must_use]
    pub const fn last(self) -> Option<usize> {
        if self.0 == 0 {
            None
        } else {
            Some(MAX_LANES - 1 - self.0.leading_zeros() as usize)
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_disjoint(self, other: Self) -> bool {
        self.0 & other.0 == 0
    }

    #[inline]
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Selected lanes in ascending order.
    #[inline]
    pub fn lanes(self) -> Lanes {
        Lanes(self.0)
    }
}

impl fmt::Debug for LaneMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.lanes()).finish()
    }
}

/// Iterator over the lanes of a [`LaneMask`], lowest first.
#[derive(Debug, Clone)]
pub struct Lanes(u64);

impl Iterator for Lanes {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        if self.0 == 0 {
            return None;
        }
        let lane = self.0.trailing_zeros() as usize;
        self.0 &= self.0 - 1;
        Some(lane)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.0.count_ones() as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for Lanes {}

/// Where the next row segment lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LaneCursor {
    /// Next free lane of the current block; always below the lane width.
    AtLane(usize),
    /// The current block is used up (or none was read yet in this tile).
    #[default]
    NeedsBlock,
}

impl LaneCursor {
    /// Cursor after a segment ending at `end` in a block of `lanes` lanes.
    #[inline]
    #[must_use]
    pub const fn after(end: usize, lanes: usize) -> Self {
        if end + 1 < lanes {
            Self::AtLane(end + 1)
        } else {
            Self::NeedsBlock
        }
    }
}
