//! Forward and backward substitution over triangular views
//!
//! Both solvers accept any number of right-hand-side columns and may write the
//! solution over their inputs; the safe-output protocol stages the result when
//! the requested aliasing would clobber unread cells.

use crate::dense::MatrixView;
use crate::error::{MatrixError, Result};
use crate::ops::expect_shape;
use crate::safe_output::{OverlapRule, SafeOutput};

/// Whether the triangular factor's diagonal is read or taken as ones
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Diagonal {
    #[default]
    Stored,
    /// Implicit unit diagonal (the `L` half of a combined LU buffer)
    Unit,
}

/// Numerical outcome of a solve; not an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    Solved,
    /// A zero pivot leaves some unknowns undetermined
    Indeterminate,
    /// The residual equations of an over-determined system are not satisfied
    Inconsistent,
}

impl SolveStatus {
    pub fn is_solved(self) -> bool {
        self == Self::Solved
    }
}

/// Visit columns so that a same-row, right-shifted output never overwrites
/// right-hand-side cells before they are read
fn column_order(x: &MatrixView<'_>, b: &MatrixView<'_>) -> impl Iterator<Item = usize> {
    let cols = x.cols();
    let reverse = x.overlaps(b)
        && x.row_offset() == b.row_offset()
        && x.col_offset() > b.col_offset();
    (0..cols).map(move |c| if reverse { cols - 1 - c } else { c })
}

fn zero_diagonal(t: &MatrixView<'_>, n: usize) -> Option<usize> {
    (0..n).find(|&i| t.get(i, i) == 0.0)
}

/// Solve `U X = B` for upper triangular `U`, last row first
pub fn back_substitution_into(
    x: &MatrixView<'_>,
    u: &MatrixView<'_>,
    b: &MatrixView<'_>,
    diagonal: Diagonal,
) -> Result<SolveStatus> {
    let n = u.rows();
    expect_shape(u, "U", n, n)?;
    if b.rows() != n {
        return Err(b.context().report(MatrixError::InvalidDimensions {
            operand: "B",
            rows: b.rows(),
            cols: b.cols(),
        }));
    }
    expect_shape(x, "X", b.rows(), b.cols())?;

    if diagonal == Diagonal::Stored {
        if let Some(i) = zero_diagonal(u, n) {
            log::debug!("back substitution: zero diagonal at row {i}");
            return Ok(SolveStatus::Indeterminate);
        }
    }

    let mut safe = SafeOutput::new(*x, "X");
    safe.guard(b, "B", OverlapRule::BottomUp { inclusive: false })?;
    safe.guard(u, "U", OverlapRule::BottomUp { inclusive: true })?;
    let target = safe.target();

    for i in (0..n).rev() {
        for c in column_order(&target, b) {
            let mut value = b.get(i, c);
            for j in (i + 1)..n {
                value -= u.get(i, j) * target.get(j, c);
            }
            if diagonal == Diagonal::Stored {
                value /= u.get(i, i);
            }
            target.set(i, c, value);
        }
    }
    safe.commit();
    Ok(SolveStatus::Solved)
}

/// Solve `L X = B` for lower triangular (possibly tall) `L`, first row first
///
/// Rows of a tall `L` below its square block only combine solved unknowns.
pub fn forward_substitution_into(
    x: &MatrixView<'_>,
    l: &MatrixView<'_>,
    b: &MatrixView<'_>,
    diagonal: Diagonal,
) -> Result<SolveStatus> {
    let (rows, n) = l.shape();
    if b.rows() != rows {
        return Err(b.context().report(MatrixError::InvalidDimensions {
            operand: "B",
            rows: b.rows(),
            cols: b.cols(),
        }));
    }
    expect_shape(x, "X", b.rows(), b.cols())?;

    if n > rows {
        log::debug!("forward substitution: {n} unknowns for {rows} equations");
        return Ok(SolveStatus::Indeterminate);
    }
    if diagonal == Diagonal::Stored {
        if let Some(i) = zero_diagonal(l, n) {
            log::debug!("forward substitution: zero diagonal at row {i}");
            return Ok(SolveStatus::Indeterminate);
        }
    }

    let mut safe = SafeOutput::new(*x, "X");
    safe.guard(b, "B", OverlapRule::TopDown { inclusive: false })?;
    safe.guard(l, "L", OverlapRule::TopDown { inclusive: true })?;
    let target = safe.target();

    for i in 0..rows {
        for c in column_order(&target, b) {
            let mut value = b.get(i, c);
            for j in 0..i.min(n) {
                value -= l.get(i, j) * target.get(j, c);
            }
            if i < n && diagonal == Diagonal::Stored {
                value /= l.get(i, i);
            }
            target.set(i, c, value);
        }
    }
    safe.commit();
    Ok(SolveStatus::Solved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DenseConfig;
    use crate::context::MatrixContext;
    use crate::dense::Matrix;
    use crate::error::ErrorKind;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_back_substitution() {
        let u = Matrix::from_array(&array![[2.0, 1.0, -1.0], [0.0, 3.0, 2.0], [0.0, 0.0, 4.0]])
            .unwrap();
        let b = Matrix::from_array(&array![[1.0], [7.0], [8.0]]).unwrap();
        let x = Matrix::zeros(3, 1).unwrap();

        let status = back_substitution_into(&x.view(), &u.view(), &b.view(), Diagonal::Stored)
            .unwrap();
        assert_eq!(status, SolveStatus::Solved);

        let residual = u.to_array().dot(&x.to_array()) - b.to_array();
        for value in residual.iter() {
            assert_relative_eq!(*value, 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_back_substitution_zero_diagonal() {
        let u = Matrix::from_array(&array![[1.0, 1.0], [0.0, 0.0]]).unwrap();
        let b = Matrix::from_array(&array![[1.0], [1.0]]).unwrap();
        let x = Matrix::zeros(2, 1).unwrap();
        let status = back_substitution_into(&x.view(), &u.view(), &b.view(), Diagonal::Stored)
            .unwrap();
        assert_eq!(status, SolveStatus::Indeterminate);
    }

    #[test]
    fn test_unit_diagonal_ignores_stored_values() {
        let l = Matrix::from_array(&array![[5.0, 0.0], [2.0, 0.0]]).unwrap();
        let b = Matrix::from_array(&array![[1.0, 2.0], [3.0, 4.0]]).unwrap();
        let x = Matrix::zeros(2, 2).unwrap();
        let status = forward_substitution_into(&x.view(), &l.view(), &b.view(), Diagonal::Unit)
            .unwrap();
        assert_eq!(status, SolveStatus::Solved);
        assert_eq!(x.to_array(), array![[1.0, 2.0], [1.0, 0.0]]);
    }

    #[test]
    fn test_forward_substitution_tall() {
        let l = Matrix::from_array(&array![[2.0, 0.0], [1.0, 1.0], [1.0, 2.0]]).unwrap();
        let b = Matrix::from_array(&array![[4.0], [5.0], [9.0]]).unwrap();
        let x = Matrix::zeros(3, 1).unwrap();
        let status = forward_substitution_into(&x.view(), &l.view(), &b.view(), Diagonal::Stored)
            .unwrap();
        assert_eq!(status, SolveStatus::Solved);
        // x0 = 2, x1 = 3, residual row = 9 - (2 + 6)
        assert_eq!(x.to_vec(), vec![2.0, 3.0, 1.0]);
    }

    #[test]
    fn test_forward_substitution_wide_is_indeterminate() {
        let l = Matrix::from_array(&array![[1.0, 0.0, 0.0], [1.0, 1.0, 0.0]]).unwrap();
        let b = Matrix::zeros(2, 1).unwrap();
        let x = Matrix::zeros(2, 1).unwrap();
        let status = forward_substitution_into(&x.view(), &l.view(), &b.view(), Diagonal::Stored)
            .unwrap();
        assert_eq!(status, SolveStatus::Indeterminate);
    }

    #[test]
    fn test_in_place_over_right_hand_side() {
        let u = Matrix::from_array(&array![[1.0, 2.0], [0.0, 1.0]]).unwrap();
        let b = Matrix::from_array(&array![[5.0], [2.0]]).unwrap();
        back_substitution_into(&b.view(), &u.view(), &b.view(), Diagonal::Stored).unwrap();
        assert_eq!(b.to_vec(), vec![1.0, 2.0]);
    }

    fn lower_system() -> (Matrix, Matrix) {
        let l = Matrix::from_array(&array![[2.0, 0.0, 0.0], [1.0, 1.0, 0.0], [1.0, 2.0, 4.0]])
            .unwrap();
        let b = Matrix::from_array(&array![[4.0], [5.0], [12.0]]).unwrap();
        (l, b)
    }

    #[test]
    fn test_forward_substitution_output_below_factor() {
        let (l, b) = lower_system();
        let reference = Matrix::zeros(3, 1).unwrap();
        forward_substitution_into(&reference.view(), &l.view(), &b.view(), Diagonal::Stored)
            .unwrap();
        assert_eq!(reference.to_vec(), vec![2.0, 3.0, 1.0]);

        // L in rows 0..3, X in column 0 of rows 1..4
        let store = Matrix::zeros(4, 3).unwrap();
        let shared_l = store.view().view(0, 0, 3, 3).unwrap();
        shared_l.fill_from_array(&l.to_array()).unwrap();
        let x = store.view().view(1, 0, 3, 1).unwrap();
        let status = forward_substitution_into(&x, &shared_l, &b.view(), Diagonal::Stored).unwrap();
        assert_eq!(status, SolveStatus::Solved);
        assert_eq!(x.to_vec(), reference.to_vec());
    }

    #[test]
    fn test_forward_substitution_output_above_factor_needs_no_staging() {
        let (l, b) = lower_system();
        let config = DenseConfig {
            fix_unsafe_overlaps: false,
            ..DenseConfig::default()
        };
        let context = MatrixContext::new(config);

        // X in column 0 of rows 0..3, L in rows 1..4
        let store = Matrix::zeros_in(4, 3, &context).unwrap();
        let shared_l = store.view().view(1, 0, 3, 3).unwrap();
        shared_l.fill_from_array(&l.to_array()).unwrap();
        let x = store.view().view(0, 0, 3, 1).unwrap();
        let status = forward_substitution_into(&x, &shared_l, &b.view(), Diagonal::Stored).unwrap();
        assert_eq!(status, SolveStatus::Solved);
        assert_eq!(x.to_vec(), vec![2.0, 3.0, 1.0]);

        // the mirrored layout cannot be solved in place
        let store = Matrix::zeros_in(4, 3, &context).unwrap();
        let shared_l = store.view().view(0, 0, 3, 3).unwrap();
        shared_l.fill_from_array(&l.to_array()).unwrap();
        let x = store.view().view(1, 0, 3, 1).unwrap();
        let err = forward_substitution_into(&x, &shared_l, &b.view(), Diagonal::Stored)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsafeOverlap);
    }

    #[test]
    fn test_right_shifted_output_in_same_rows() {
        // B in columns 0..2, X in columns 1..3 of the same storage
        let store = Matrix::from_array(&array![[1.0, 2.0, 0.0], [3.0, 4.0, 0.0]]).unwrap();
        let identity = Matrix::identity(2).unwrap();
        let b = store.view().view(0, 0, 2, 2).unwrap();
        let x = store.view().view(0, 1, 2, 2).unwrap();
        back_substitution_into(&x, &identity.view(), &b, Diagonal::Stored).unwrap();
        assert_eq!(x.to_array(), array![[1.0, 2.0], [3.0, 4.0]]);
    }
}
