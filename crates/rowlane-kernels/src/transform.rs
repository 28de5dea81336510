//! Row reordering applied by hosts before tiling
use rayon::prelude::*;
use rowlane_core::{Csr, Result, RowlaneError};
use wide::f64x4;

#[inline]
fn usize_to_i64(x: usize) -> i64 {
    debug_assert!(i64::try_from(x).is_ok(), "value must fit in i64");
    #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
    {
        x as i64
    }
}

/// Order in which rows are fed to the segmenter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RowOrder {
    /// Keep the stored order.
    #[default]
    Index,
    /// Longest rows first.
    Nnz,
    /// Largest row sums first.
    RowSum,
}

/// row sums
#[must_use]
pub fn row_sums_f64(a: &Csr<f64, i64>) -> Vec<f64> {
    let mut out = vec![0.0f64; a.nrows];
    out.par_iter_mut().enumerate().for_each(|(i, oi)| {
        let row = &a.data[a.row_range(i)];
        let mut accv = f64x4::from([0.0, 0.0, 0.0, 0.0]);
        let mut k = 0usize;
        let limit4 = row.len() & !3;
        while k < limit4 {
            let v = f64x4::from([row[k], row[k + 1], row[k + 2], row[k + 3]]);
            accv += v;
            k += 4;
        }
        let arr = accv.to_array();
        let mut acc = arr[0] + arr[1] + arr[2] + arr[3];
        while k < row.len() {
            acc += row[k];
            k += 1;
        }
        *oi = acc;
    });
    out
}

/// Permutation listing original row indices in the requested order.
///
/// Sorting is stable, so rows with equal keys keep their stored order.
#[must_use]
pub fn row_order(a: &Csr<f64, i64>, order: RowOrder) -> Vec<usize> {
    let mut perm: Vec<usize> = (0..a.nrows).collect();
    match order {
        RowOrder::Index => {}
        RowOrder::Nnz => perm.sort_by(|&i, &j| a.row_nnz(j).cmp(&a.row_nnz(i))),
        RowOrder::RowSum => {
            let sums = row_sums_f64(a);
            perm.sort_by(|&i, &j| sums[j].total_cmp(&sums[i]));
        }
    }
    perm
}

/// Rows of `a` gathered in the order given by `perm` (row `k` of the result is row `perm[k]`).
///
/// # Errors
/// [`RowlaneError::InvalidMatrix`] when `perm` is not a permutation of `0..nrows`.
pub fn permute_rows(a: &Csr<f64, i64>, perm: &[usize]) -> Result<Csr<f64, i64>> {
    if perm.len() != a.nrows {
        return Err(RowlaneError::InvalidMatrix(
            "permutation length must equal nrows".into(),
        ));
    }
    let mut seen = vec![0u8; a.nrows];
    for &i in perm {
        if i >= a.nrows || seen[i] != 0 {
            return Err(RowlaneError::InvalidMatrix(
                "row permutation must list every row exactly once".into(),
            ));
        }
        seen[i] = 1;
    }

    let mut indptr = Vec::with_capacity(a.nrows + 1);
    indptr.push(0i64);
    let mut indices = Vec::with_capacity(a.nnz());
    let mut data = Vec::with_capacity(a.nnz());
    for &i in perm {
        let r = a.row_range(i);
        indices.extend_from_slice(&a.indices[r.clone()]);
        data.extend_from_slice(&a.data[r]);
        indptr.push(usize_to_i64(data.len()));
    }
    Ok(Csr {
        nrows: a.nrows,
        ncols: a.ncols,
        indptr,
        indices,
        data,
    })
}
