//! Linear solves on top of an LU decomposition

use super::lu::{LuMode, lu_decompose, lu_decompose_into};
use super::permutation::permute_into;
use super::triangular::{Diagonal, SolveStatus, back_substitution_into, forward_substitution_into};
use crate::dense::{Matrix, MatrixView, allocate_like, allocate_shape};
use crate::error::{MatrixError, Region, Result};
use crate::ops::expect_shape;
use crate::safe_output::{OverlapRule, SafeOutput};

/// Solve `A X = B` from `P` and the combined factors of `A`
///
/// `x` may alias `b`.
pub fn lu_solve_into(
    x: &MatrixView<'_>,
    permutation: &MatrixView<'_>,
    lu: &MatrixView<'_>,
    b: &MatrixView<'_>,
) -> Result<SolveStatus> {
    let n = lu.rows();
    expect_shape(lu, "LU", n, n)?;
    expect_shape(b, "B", n, b.cols())?;
    permute_into(x, b, permutation)?;
    match forward_substitution_into(x, lu, x, Diagonal::Unit)? {
        SolveStatus::Solved => back_substitution_into(x, lu, x, Diagonal::Stored),
        status => Ok(status),
    }
}

/// Allocating form of [`lu_solve_into`]; `None` unless the system is solved
pub fn lu_solve(
    permutation: &MatrixView<'_>,
    lu: &MatrixView<'_>,
    b: &MatrixView<'_>,
) -> Result<Option<Matrix>> {
    let x = allocate_like(b, b.context(), "X")?;
    let status = lu_solve_into(&x.view(), permutation, lu, b)?;
    Ok(status.is_solved().then_some(x))
}

/// Solve from a decomposed augmented matrix `[A | B]`
///
/// `A` takes the first `ab.cols() - x.cols()` columns. Rows whose `A` part
/// vanished during elimination must have a vanishing `B` part, otherwise the
/// system is inconsistent; their unknowns are free and set to zero.
pub fn lu_solve_augmented_into(x: &MatrixView<'_>, ab: &MatrixView<'_>) -> Result<SolveStatus> {
    if x.cols() >= ab.cols() {
        return Err(x.context().report(MatrixError::OutOfBounds {
            operand: "AB",
            requested: Region::new(0, ab.cols().saturating_sub(x.cols()), ab.rows(), x.cols()),
            rows: ab.rows(),
            cols: ab.cols(),
        }));
    }
    let unknowns = ab.cols() - x.cols();
    expect_shape(x, "X", unknowns, x.cols())?;

    let rank = (0..ab.rows().min(unknowns))
        .take_while(|&i| ab.get(i, i) != 0.0)
        .count();
    for i in rank..ab.rows() {
        if (i..unknowns).any(|j| ab.get(i, j) != 0.0) {
            log::debug!("augmented solve: row {i} is not in echelon form");
            return Ok(SolveStatus::Indeterminate);
        }
        if (unknowns..ab.cols()).any(|j| ab.get(i, j) != 0.0) {
            log::debug!("augmented solve: residual row {i} is inconsistent");
            return Ok(SolveStatus::Inconsistent);
        }
    }
    if rank < unknowns {
        log::debug!("augmented solve: {} free unknowns set to zero", unknowns - rank);
    }

    let mut safe = SafeOutput::new(*x, "X");
    safe.guard(ab, "AB", OverlapRule::Disjoint)?;
    let target = safe.target();
    for i in rank..unknowns {
        for c in 0..x.cols() {
            target.set(i, c, 0.0);
        }
    }
    if rank > 0 {
        let status = back_substitution_into(
            &target.view(0, 0, rank, x.cols())?,
            &ab.view(0, 0, rank, rank)?,
            &ab.view(0, unknowns, rank, x.cols())?,
            Diagonal::Stored,
        )?;
        if !status.is_solved() {
            return Ok(status);
        }
    }
    safe.commit();
    Ok(SolveStatus::Solved)
}

/// Solve the augmented system `[A | B]` whose last `rhs_cols` columns hold `B`
///
/// `ab` is left untouched. `None` when no solution can be produced.
pub fn solve_augmented(ab: &MatrixView<'_>, rhs_cols: usize) -> Result<Option<Matrix>> {
    if rhs_cols == 0 || rhs_cols >= ab.cols() {
        return Err(ab.context().report(MatrixError::OutOfBounds {
            operand: "AB",
            requested: Region::new(0, ab.cols().saturating_sub(rhs_cols), ab.rows(), rhs_cols),
            rows: ab.rows(),
            cols: ab.cols(),
        }));
    }
    let work = ab.to_matrix()?;
    let parity = lu_decompose_into(&work.view(), &work.view(), None, LuMode::Lenient)?;
    if parity.is_none() {
        return Ok(None);
    }
    let x = allocate_shape(ab.cols() - rhs_cols, rhs_cols, ab.context(), "X")?;
    let status = lu_solve_augmented_into(&x.view(), &work.view())?;
    Ok(status.is_solved().then_some(x))
}

/// Solve the square system `A X = B`; `None` when `A` is singular
pub fn solve(a: &MatrixView<'_>, b: &MatrixView<'_>) -> Result<Option<Matrix>> {
    expect_shape(a, "A", a.rows(), a.rows())?;
    let decomposition = lu_decompose(a, LuMode::Perfect)?;
    if !decomposition.is_decomposed() {
        return Ok(None);
    }
    decomposition.solve(b)
}
