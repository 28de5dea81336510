//! Size thresholds and index conversions shared by the host-side kernels

use rowlane_core::{Result, RowlaneError, TILE_END_ROW};

/// Below this many stored entries the host-side kernels stay sequential.
pub const SMALL_NNZ_LIMIT: usize = 32 * 1024;
/// Below this many rows the reference SpMV stays sequential.
pub const SMALL_DIM_LIMIT: usize = 2048;

/// Row index as carried on the wire. `TILE_END_ROW` is reserved for sentinels.
#[inline]
pub fn row_to_u32(row: usize) -> Result<u32> {
    match u32::try_from(row) {
        Ok(r) if r != TILE_END_ROW => Ok(r),
        _ => Err(RowlaneError::InvalidMatrix(format!(
            "row {row} does not fit a stream row index"
        ))),
    }
}

/// Row length as carried on the wire.
#[inline]
pub fn nnz_to_u32(nnz: usize) -> Result<u32> {
    u32::try_from(nnz).map_err(|_| {
        RowlaneError::InvalidMatrix(format!("row length {nnz} does not fit a stream descriptor"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_row_rejected() {
        assert_eq!(row_to_u32(7).unwrap(), 7);
        assert!(row_to_u32(TILE_END_ROW as usize).is_err());
        assert_eq!(nnz_to_u32(5).unwrap(), 5);
    }
}
