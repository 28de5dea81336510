use rowlane_core::{Csr, RowlaneError};

type Parts = (usize, usize, Vec<i64>, Vec<i64>, Vec<f64>);

fn build(parts: Parts) -> Result<Csr<f64, i64>, RowlaneError> {
    let (nrows, ncols, indptr, indices, data) = parts;
    Csr::from_parts(nrows, ncols, indptr, indices, data, true)
}

fn assert_invalid(parts: Parts, fragment: &str) {
    match build(parts) {
        Err(RowlaneError::InvalidMatrix(msg)) => {
            assert!(msg.contains(fragment), "{msg:?} does not mention {fragment:?}");
        }
        other => panic!("expected InvalidMatrix({fragment:?}), got {other:?}"),
    }
}

#[test]
fn row_ranges_walk_empty_rows() {
    // rows of 2, 0, 0, 3, 0 entries
    let a = build((
        5,
        4,
        vec![0, 2, 2, 2, 5, 5],
        vec![0, 3, 0, 1, 2],
        vec![1.0, 2.0, 3.0, 4.0, 5.0],
    ))
    .unwrap();
    assert_eq!(a.shape(), (5, 4));
    assert_eq!(a.nnz(), 5);
    let lens: Vec<usize> = (0..a.nrows).map(|i| a.row_nnz(i)).collect();
    assert_eq!(lens, vec![2, 0, 0, 3, 0]);
    assert_eq!(a.row_range(1), 2..2);
    assert_eq!(a.row_range(3), 2..5);
    assert_eq!(&a.data[a.row_range(3)], &[3.0, 4.0, 5.0]);
    assert!(a.row_range(4).is_empty());
}

#[test]
fn shape_mismatches_are_invalid_matrix() {
    assert_invalid((2, 3, vec![0, 1], vec![0], vec![1.0]), "nrows + 1");
    assert_invalid((1, 3, vec![0, 2], vec![0, 1], vec![1.0]), "equal length");
    assert_invalid((1, 3, vec![0, 1], vec![0, 1], vec![1.0, 2.0]), "must equal nnz");
    assert_invalid((1, 3, vec![1, 1], vec![0], vec![1.0]), "first element must be 0");
}

#[test]
fn offset_violations_are_invalid_matrix() {
    assert_invalid((2, 3, vec![0, -1, 0], vec![], vec![]), "non-negative");
    assert_invalid((2, 3, vec![0, 2, 1], vec![0], vec![1.0]), "non-decreasing");
}

#[test]
fn column_violations_are_invalid_matrix() {
    assert_invalid((1, 3, vec![0, 1], vec![3], vec![1.0]), "out of bounds");
    assert_invalid((1, 3, vec![0, 1], vec![-1], vec![1.0]), "out of bounds");
    // duplicate then descending columns inside one row
    assert_invalid((1, 3, vec![0, 2], vec![1, 1], vec![1.0, 2.0]), "strictly increasing");
    assert_invalid((2, 3, vec![0, 0, 2], vec![2, 0], vec![1.0, 2.0]), "strictly increasing");
}

#[test]
fn unchecked_build_keeps_outer_checks_only() {
    let a = Csr::from_parts(1, 3, vec![0, 2], vec![2, 0], vec![1.0, 2.0], false).unwrap();
    assert_eq!(a.row_nnz(0), 2);
    let err = Csr::from_parts(1, 3, vec![0, 3], vec![2, 0], vec![1.0, 2.0], false).unwrap_err();
    assert!(matches!(err, RowlaneError::InvalidMatrix(_)));
}

#[test]
fn all_empty_matrix_is_valid() {
    let a = build((3, 2, vec![0, 0, 0, 0], vec![], vec![])).unwrap();
    assert_eq!(a.nnz(), 0);
    assert!((0..3).all(|i| a.row_nnz(i) == 0));
}
