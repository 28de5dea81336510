//! Downstream accumulator: folds partial sums of one or more runs into the output vector

use rowlane_core::{PartialSumToken, Result, RowlaneError};
use tracing::{trace, warn};

/// Adds every partial sum into `y[row]` in arrival order.
///
/// Tracks which rows completed inside the current tile (`seen`/`touched`, reset at each tile
/// end) so a segment arriving after its row completed, or a row left open at a tile end, is
/// reported instead of silently folded in.
#[derive(Debug, Clone)]
pub struct Accumulator {
    y: Vec<f64>,
    tiles_per_run: usize,
    tiles_seen: usize,
    open: Option<u32>,
    seen: Vec<u8>,
    touched: Vec<usize>,
    last_run: Option<Vec<f64>>,
    runs: usize,
    deterministic: bool,
}

impl Accumulator {
    #[must_use]
    pub fn new(nrows: usize, tiles_per_run: usize) -> Self {
        Self {
            y: vec![0.0; nrows],
            tiles_per_run: tiles_per_run.max(1),
            tiles_seen: 0,
            open: None,
            seen: vec![0u8; nrows],
            touched: Vec::new(),
            last_run: None,
            runs: 0,
            deterministic: true,
        }
    }

    /// Fold one partial sum.
    ///
    /// # Errors
    /// - [`RowlaneError::RowOutOfRange`] for a row past the output.
    /// - [`RowlaneError::RowAfterComplete`] for a segment of a row already completed in this tile.
    /// - [`RowlaneError::IncompleteRow`] when a different row (or the tile end) interrupts an
    ///   open row.
    pub fn push(&mut self, partial: PartialSumToken) -> Result<()> {
        if partial.is_tile_end {
            if let Some(row) = self.open.take() {
                warn!(row, "tile ended with an open row");
                return Err(RowlaneError::IncompleteRow { row });
            }
            self.end_tile();
            return Ok(());
        }
        let row = partial.row;
        let i = row as usize;
        if i >= self.y.len() {
            warn!(row, nrows = self.y.len(), "partial sum outside output");
            return Err(RowlaneError::RowOutOfRange {
                row,
                nrows: self.y.len(),
            });
        }
        match self.open {
            Some(open) if open != row => {
                warn!(row = open, next = row, "row interrupted before completion");
                return Err(RowlaneError::IncompleteRow { row: open });
            }
            None if self.seen[i] != 0 => {
                warn!(row, "segment after row completion");
                return Err(RowlaneError::RowAfterComplete { row });
            }
            _ => {}
        }
        self.y[i] += partial.value;
        if partial.is_row_complete {
            self.open = None;
            self.seen[i] = 1;
            self.touched.push(i);
        } else {
            self.open = Some(row);
        }
        Ok(())
    }

    fn end_tile(&mut self) {
        for &i in &self.touched {
            self.seen[i] = 0;
        }
        self.touched.clear();
        self.tiles_seen += 1;
        if self.tiles_seen < self.tiles_per_run {
            return;
        }
        let y = std::mem::replace(&mut self.y, vec![0.0; self.seen.len()]);
        if let Some(prev) = &self.last_run {
            let same = prev
                .iter()
                .zip(&y)
                .all(|(a, b)| a.to_bits() == b.to_bits());
            self.deterministic &= same;
        }
        self.last_run = Some(y);
        self.runs += 1;
        self.tiles_seen = 0;
        trace!(run = self.runs, "run accumulated");
    }

    /// Completed runs so far.
    #[inline]
    #[must_use]
    pub const fn runs(&self) -> usize {
        self.runs
    }

    /// Whether every completed run produced a bit-identical output.
    #[inline]
    #[must_use]
    pub const fn is_deterministic(&self) -> bool {
        self.deterministic
    }

    /// Output of the last completed run.
    ///
    /// # Errors
    /// [`RowlaneError::IncompleteRun`] when no run completed or the last one was cut short.
    pub fn finish(self) -> Result<Vec<f64>> {
        let incomplete = RowlaneError::IncompleteRun {
            completed: self.runs,
        };
        if self.tiles_seen != 0 || self.open.is_some() {
            warn!(completed = self.runs, "partial sums ended inside a run");
            return Err(incomplete);
        }
        self.last_run.ok_or(incomplete)
    }
}
