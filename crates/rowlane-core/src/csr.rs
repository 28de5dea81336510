//! CSR storage feeding the row segmenter

use std::ops::Range;

use crate::error::{Result, RowlaneError};

#[derive(Debug, Clone)]
pub struct Csr<T, I> {
    pub nrows: usize,
    pub ncols: usize,
    pub indptr: Vec<I>,
    pub indices: Vec<I>,
    pub data: Vec<T>,
}

impl<T, I> Csr<T, I> {
    #[inline]
    #[must_use]
    pub const fn shape(&self) -> (usize, usize) {
        (self.nrows, self.ncols)
    }

    #[inline]
    #[must_use]
    pub fn nnz(&self) -> usize {
        self.data.len()
    }
}

/// Convert a stored i64 offset to usize, asserting non-negativity.
#[inline]
#[must_use]
pub fn i64_to_usize(x: i64) -> usize {
    debug_assert!(x >= 0);
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    {
        x as usize
    }
}

fn invalid(msg: &str) -> RowlaneError {
    RowlaneError::InvalidMatrix(msg.to_owned())
}

impl Csr<f64, i64> {
    /// Build a CSR matrix from raw parts. With `check` set, per-row structure is validated too.
    ///
    /// # Errors
    /// Returns [`RowlaneError::InvalidMatrix`] when the parts do not describe a CSR matrix.
    pub fn from_parts(
        nrows: usize,
        ncols: usize,
        indptr: Vec<i64>,
        indices: Vec<i64>,
        data: Vec<f64>,
        check: bool,
    ) -> Result<Self> {
        if indptr.len() != nrows + 1 {
            return Err(invalid("indptr length must be nrows + 1"));
        }
        if indices.len() != data.len() {
            return Err(invalid("indices and data must have equal length"));
        }
        let nnz = indices.len();
        if usize::try_from(indptr.last().copied().unwrap_or(0)).ok() != Some(nnz) {
            return Err(invalid("indptr last element must equal nnz"));
        }
        if indptr.first().copied().unwrap_or(0) != 0 {
            return Err(invalid("indptr first element must be 0"));
        }
        if check {
            for w in indptr.windows(2) {
                if w[0] < 0 || w[1] < 0 {
                    return Err(invalid("indptr must be non-negative"));
                }
                if w[0] > w[1] {
                    return Err(invalid("indptr must be non-decreasing"));
                }
            }
            let ncols_i64 = i64::try_from(ncols).unwrap_or(i64::MAX);
            for i in 0..nrows {
                let start = i64_to_usize(indptr[i]);
                let end = i64_to_usize(indptr[i + 1]);
                if start > nnz || end > nnz {
                    return Err(invalid("indptr elements must be within [0, nnz]"));
                }
                let mut prev_col = -1i64;
                for &j in &indices[start..end] {
                    if j < 0 || j >= ncols_i64 {
                        return Err(invalid("column index out of bounds"));
                    }
                    if j <= prev_col {
                        return Err(invalid(
                            "column indices must be strictly increasing within each row",
                        ));
                    }
                    prev_col = j;
                }
            }
        }
        Ok(Self {
            nrows,
            ncols,
            indptr,
            indices,
            data,
        })
    }

    /// Offsets of row `i` inside `indices`/`data`.
    #[inline]
    #[must_use]
    pub fn row_range(&self, i: usize) -> Range<usize> {
        i64_to_usize(self.indptr[i])..i64_to_usize(self.indptr[i + 1])
    }

    /// Stored entries in row `i`.
    #[inline]
    #[must_use]
    pub fn row_nnz(&self, i: usize) -> usize {
        self.row_range(i).len()
    }
}
