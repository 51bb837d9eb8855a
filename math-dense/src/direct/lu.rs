//! LU decomposition with partial pivoting
//!
//! Generalized Doolittle elimination on any `m x n` view. The result is a single
//! buffer holding `U` on and above the diagonal and the multipliers of the unit
//! lower factor `L` below it, a permutation `P` with `P M = L U`, and the
//! parity of the row swaps.
//!
//! Every row carries a pivot: the column of its first nonzero entry. Before a
//! column is eliminated the rows are migrated into row-echelon order, then the
//! row with the largest magnitude in that column is swapped in for stability.
//! In [`LuMode::Lenient`] rows that are (or become) all zero are relegated to
//! the bottom and excluded from the remaining work; [`LuMode::Perfect`] gives
//! up on them instead.

use super::permutation::Permutation;
use super::refine::{RefineSolution, refine, refine_until_converged};
use super::solve::lu_solve_into;
use super::triangular::SolveStatus;
use crate::config::RefineConfig;
use crate::dense::{Matrix, MatrixView, allocate_like, allocate_shape, copy_cells, sub_scaled_row};
use crate::error::{MatrixError, Result};
use crate::ops::expect_shape;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LuMode {
    /// All-zero rows are moved out of the way; rectangular input of any shape
    #[default]
    Lenient,
    /// Every row must yield a pivot among the first `rows` columns
    Perfect,
}

/// Parity of the number of row swaps performed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    Even,
    Odd,
}

impl Parity {
    fn flip(self) -> Self {
        match self {
            Self::Even => Self::Odd,
            Self::Odd => Self::Even,
        }
    }

    /// `1.0` for even, `-1.0` for odd
    pub fn sign(self) -> f64 {
        match self {
            Self::Even => 1.0,
            Self::Odd => -1.0,
        }
    }
}

/// Decompose `m` into `lu` (which may be `m` itself)
///
/// When a permutation view is given it is reset to identity and receives every
/// row swap. Returns `None` when no decomposition exists in the requested mode.
pub fn lu_decompose_into(
    lu: &MatrixView<'_>,
    m: &MatrixView<'_>,
    permutation: Option<&MatrixView<'_>>,
    mode: LuMode,
) -> Result<Option<Parity>> {
    let (rows, cols) = m.shape();
    if mode == LuMode::Perfect && cols < rows {
        log::debug!("perfect LU impossible for ({rows}, {cols})");
        return Ok(None);
    }
    expect_shape(lu, "LU", rows, cols)?;
    if let Some(p) = permutation {
        if !p.is_square() || p.rows() != rows {
            return Err(p.context().report(MatrixError::Invalid {
                operand: "P",
                reason: "permutation must be square with one row per matrix row",
            }));
        }
        if p.overlaps(lu) {
            return Err(p.context().report(MatrixError::Invalid {
                operand: "P",
                reason: "permutation overlaps the decomposition buffer",
            }));
        }
    }
    // M is read before P is reset, P may alias it
    if !lu.is_same(m) {
        copy_cells(lu, m);
    }
    if let Some(p) = permutation {
        p.set_identity();
    }
    Ok(Eliminator::new(*lu, permutation.copied(), mode).run())
}

struct Eliminator<'v> {
    lu: MatrixView<'v>,
    permutation: Option<MatrixView<'v>>,
    mode: LuMode,
    /// Leading nonzero column of each row, `None` for all-zero rows
    pivots: Vec<Option<usize>>,
    /// Rows `end..` are relegated zero rows
    end: usize,
    search_cols: usize,
    parity: Parity,
}

impl<'v> Eliminator<'v> {
    fn new(lu: MatrixView<'v>, permutation: Option<MatrixView<'v>>, mode: LuMode) -> Self {
        let search_cols = match mode {
            LuMode::Lenient => lu.cols(),
            LuMode::Perfect => lu.rows(),
        };
        Self {
            lu,
            permutation,
            mode,
            pivots: vec![None; lu.rows()],
            end: lu.rows(),
            search_cols,
            parity: Parity::Even,
        }
    }

    fn leading_nonzero(&self, row: usize, from: usize) -> Option<usize> {
        (from..self.search_cols).find(|&j| self.lu.get(row, j) != 0.0)
    }

    fn swap(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        self.lu.swap_rows(a, b);
        if let Some(p) = &self.permutation {
            p.swap_rows(a, b);
        }
        self.pivots.swap(a, b);
        self.parity = self.parity.flip();
    }

    fn in_echelon(&self, row: usize) -> bool {
        row >= self.end || self.pivots[row] == Some(row)
    }

    fn relegate(&mut self, row: usize) {
        self.end -= 1;
        log::trace!("relegating zero row {row} below row {}", self.end);
        self.swap(row, self.end);
    }

    /// Handle a row without a pivot; `false` means the decomposition fails
    fn zero_row(&mut self, row: usize) -> bool {
        match self.mode {
            LuMode::Perfect => false,
            LuMode::Lenient => {
                self.relegate(row);
                true
            }
        }
    }

    fn fail(&self, column: usize, reason: &str) -> Option<Parity> {
        log::debug!("LU decomposition failed at column {column}: {reason}");
        None
    }

    fn run(mut self) -> Option<Parity> {
        for i in 0..self.lu.rows() {
            self.pivots[i] = self.leading_nonzero(i, 0);
        }
        let mut i = 0;
        while i < self.end {
            if self.pivots[i].is_some() {
                i += 1;
            } else if !self.zero_row(i) {
                return self.fail(0, "zero row");
            }
        }
        if let Some(i) = (0..self.end).find(|&i| self.pivots[i].is_some_and(|c| c >= self.end)) {
            return self.fail(0, &format!("row {i} has no pivot among the working rows"));
        }

        let mut p = 0;
        while p < self.end {
            if !self.migrate(p) {
                return self.fail(p, "no row can supply the pivot");
            }
            self.select_largest(p);
            if !self.eliminate(p) {
                return self.fail(p, "row eliminated to zero");
            }
            p += 1;
        }
        Some(self.parity)
    }

    /// Bring a row whose pivot is `p` into row `p`
    fn migrate(&mut self, p: usize) -> bool {
        loop {
            let Some(pivot) = self.pivots[p] else {
                return false;
            };
            if pivot == p {
                return true;
            }
            if pivot > p && !self.in_echelon(pivot) {
                self.swap(p, pivot);
                continue;
            }
            let candidate = ((p + 1)..self.end)
                .find(|&r| self.pivots[r] == Some(p) && !self.in_echelon(r));
            return match candidate {
                Some(r) => {
                    self.swap(p, r);
                    true
                }
                None => false,
            };
        }
    }

    fn select_largest(&mut self, p: usize) {
        let mut best = p;
        let mut best_abs = self.lu.get(p, p).abs();
        for r in (p + 1)..self.end {
            let candidate = self.lu.get(r, p).abs();
            if candidate > best_abs {
                best = r;
                best_abs = candidate;
            }
        }
        self.swap(p, best);
    }

    fn eliminate(&mut self, p: usize) -> bool {
        let pivot_value = self.lu.get(p, p);
        let mut r = p + 1;
        while r < self.end {
            let entry = self.lu.get(r, p);
            if entry == 0.0 {
                r += 1;
                continue;
            }
            let factor = entry / pivot_value;
            self.lu.set(r, p, factor);
            sub_scaled_row(&self.lu, r, p, factor, p + 1);
            self.pivots[r] = self.leading_nonzero(r, p + 1);
            match self.pivots[r] {
                None => {
                    // the row moved into `r` still needs column `p`
                    if !self.zero_row(r) {
                        return false;
                    }
                }
                Some(c) if c >= self.end => return false,
                Some(_) => r += 1,
            }
        }
        true
    }
}

/// Determinant from a decomposition buffer and its parity
///
/// A failed decomposition (`None`) has determinant zero.
pub fn det_lu(lu: &MatrixView<'_>, parity: Option<Parity>) -> Result<f64> {
    if lu.cols() < lu.rows() {
        return Err(lu.context().report(MatrixError::InvalidDimensions {
            operand: "LU",
            rows: lu.rows(),
            cols: lu.cols(),
        }));
    }
    let Some(parity) = parity else {
        return Ok(0.0);
    };
    let product: f64 = (0..lu.rows()).map(|i| lu.get(i, i)).product();
    Ok(parity.sign() * product)
}

/// Determinant of a square matrix; `m` is left untouched
pub fn det(m: &MatrixView<'_>) -> Result<f64> {
    expect_shape(m, "M", m.rows(), m.rows())?;
    let work = m.to_matrix()?;
    let parity = lu_decompose_into(&work.view(), &work.view(), None, LuMode::Perfect)?;
    det_lu(&work.view(), parity)
}

/// Owned decomposition result
#[derive(Debug)]
pub struct LuDecomposition {
    lu: Matrix,
    permutation: Permutation,
    parity: Option<Parity>,
}

/// Decompose a copy of `m`, leaving `m` untouched
pub fn lu_decompose(m: &MatrixView<'_>, mode: LuMode) -> Result<LuDecomposition> {
    let context = m.context();
    let lu = allocate_like(m, context, "LU")?;
    let permutation = Permutation::identity_in(m.rows(), context)?;
    let parity = lu_decompose_into(&lu.view(), m, Some(&permutation.view()), mode)?;
    Ok(LuDecomposition {
        lu,
        permutation,
        parity,
    })
}

impl LuDecomposition {
    pub fn is_decomposed(&self) -> bool {
        self.parity.is_some()
    }

    pub fn parity(&self) -> Option<Parity> {
        self.parity
    }

    /// Combined `L`/`U` buffer
    pub fn lu(&self) -> MatrixView<'_> {
        self.lu.view()
    }

    pub fn permutation(&self) -> &Permutation {
        &self.permutation
    }

    pub fn det(&self) -> Result<f64> {
        det_lu(&self.lu.view(), self.parity)
    }

    /// Unit lower factor, `rows x min(rows, cols)`
    pub fn lower(&self) -> Result<Matrix> {
        let (rows, cols) = (self.lu.rows(), self.lu.cols());
        let k = rows.min(cols);
        let lower = allocate_shape(rows, k, self.lu.context(), "L")?;
        let target = lower.view();
        for i in 0..rows {
            for j in 0..k.min(i + 1) {
                target.set(i, j, if i == j { 1.0 } else { self.lu.get(i, j) });
            }
        }
        Ok(lower)
    }

    /// Upper factor, `min(rows, cols) x cols`
    pub fn upper(&self) -> Result<Matrix> {
        let (rows, cols) = (self.lu.rows(), self.lu.cols());
        let k = rows.min(cols);
        let upper = allocate_shape(k, cols, self.lu.context(), "U")?;
        let target = upper.view();
        for i in 0..k {
            for j in i..cols {
                target.set(i, j, self.lu.get(i, j));
            }
        }
        Ok(upper)
    }

    fn require_decomposed(&self) -> Result<()> {
        if self.is_decomposed() {
            Ok(())
        } else {
            Err(self
                .lu
                .context()
                .report(MatrixError::Uninitialized { operand: "LU" }))
        }
    }

    /// Solve `A X = B` into `x`
    pub fn solve_into(&self, x: &MatrixView<'_>, b: &MatrixView<'_>) -> Result<SolveStatus> {
        self.require_decomposed()?;
        lu_solve_into(x, &self.permutation.view(), &self.lu.view(), b)
    }

    /// Solve `A X = B`; `None` when the factors cannot determine `X`
    pub fn solve(&self, b: &MatrixView<'_>) -> Result<Option<Matrix>> {
        self.require_decomposed()?;
        let x = allocate_like(b, b.context(), "X")?;
        let status = self.solve_into(&x.view(), b)?;
        Ok(status.is_solved().then_some(x))
    }

    /// One refinement step of `x` against the unfactored system `a x = b`
    pub fn refine(
        &self,
        work: &mut Option<Matrix>,
        x: &MatrixView<'_>,
        a: &MatrixView<'_>,
        b: &MatrixView<'_>,
    ) -> Result<f64> {
        self.require_decomposed()?;
        refine(work, x, &self.permutation.view(), &self.lu.view(), a, b)
    }

    pub fn refine_until_converged(
        &self,
        x: &MatrixView<'_>,
        a: &MatrixView<'_>,
        b: &MatrixView<'_>,
        config: &RefineConfig,
    ) -> Result<RefineSolution> {
        self.require_decomposed()?;
        refine_until_converged(x, &self.permutation.view(), &self.lu.view(), a, b, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::ops::{distance, matmul};
    use approx::assert_relative_eq;
    use ndarray::{Array2, array};

    fn m(values: Array2<f64>) -> Matrix {
        Matrix::from_array(&values).unwrap()
    }

    fn assert_factors_reconstruct(a: &Matrix, decomposition: &LuDecomposition) {
        let pa = decomposition.permutation().apply(&a.view()).unwrap();
        let l = decomposition.lower().unwrap();
        let u = decomposition.upper().unwrap();
        let lu = matmul(&l.view(), &u.view()).unwrap();
        assert!(distance(&pa.view(), &lu.view()).unwrap() < 1e-9);
    }

    #[test]
    fn test_decompose_square() {
        let a = m(array![[2.0, 1.0, 1.0], [4.0, -6.0, 0.0], [-2.0, 7.0, 2.0]]);
        let decomposition = lu_decompose(&a.view(), LuMode::Perfect).unwrap();
        assert!(decomposition.is_decomposed());
        assert_factors_reconstruct(&a, &decomposition);
        assert_relative_eq!(decomposition.det().unwrap(), -16.0, epsilon = 1e-10);
    }

    #[test]
    fn test_largest_pivot_selected() {
        let a = m(array![[1.0, 2.0], [3.0, 4.0]]);
        let decomposition = lu_decompose(&a.view(), LuMode::Perfect).unwrap();
        assert_eq!(decomposition.parity(), Some(Parity::Odd));
        assert_eq!(decomposition.lu().get(0, 0), 3.0);
        assert_relative_eq!(decomposition.lu().get(1, 0), 1.0 / 3.0);
    }

    #[test]
    fn test_echelon_migration() {
        // row 0 starts in column 1, row 1 in column 0
        let a = m(array![[0.0, 1.0, 2.0], [3.0, 0.0, 1.0], [0.0, 0.0, 5.0]]);
        let decomposition = lu_decompose(&a.view(), LuMode::Perfect).unwrap();
        assert!(decomposition.is_decomposed());
        assert_factors_reconstruct(&a, &decomposition);
        assert_relative_eq!(det(&a.view()).unwrap(), -15.0, epsilon = 1e-12);
    }

    #[test]
    fn test_perfect_fails_on_singular() {
        let a = m(array![[1.0, 2.0], [2.0, 4.0]]);
        let decomposition = lu_decompose(&a.view(), LuMode::Perfect).unwrap();
        assert!(!decomposition.is_decomposed());
        assert_eq!(decomposition.det().unwrap(), 0.0);

        let b = m(array![[1.0], [1.0]]);
        let err = decomposition.solve(&b.view()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Uninitialized);
    }

    #[test]
    fn test_perfect_rejects_tall() {
        let a = m(array![[1.0], [2.0]]);
        let lu = Matrix::zeros(2, 1).unwrap();
        let parity = lu_decompose_into(&lu.view(), &a.view(), None, LuMode::Perfect).unwrap();
        assert_eq!(parity, None);
        assert_eq!(lu.to_vec(), vec![0.0, 0.0]);
    }

    #[test]
    fn test_lenient_relegates_zero_rows() {
        let a = m(array![[0.0, 0.0, 0.0], [1.0, 2.0, 3.0], [2.0, 5.0, 7.0]]);
        let decomposition = lu_decompose(&a.view(), LuMode::Lenient).unwrap();
        assert!(decomposition.is_decomposed());
        assert_factors_reconstruct(&a, &decomposition);
        assert_eq!(decomposition.det().unwrap(), 0.0);
    }

    #[test]
    fn test_lenient_fails_when_pivot_skips_a_column() {
        // after the zero row is relegated, row 1 reduces to a pivot in column 2
        let a = m(array![[0.0, 0.0, 0.0], [1.0, 2.0, 3.0], [2.0, 4.0, 7.0]]);
        let decomposition = lu_decompose(&a.view(), LuMode::Lenient).unwrap();
        assert!(!decomposition.is_decomposed());
        assert_eq!(decomposition.parity(), None);
    }

    #[test]
    fn test_permutation_output_aliasing_input() {
        let a = m(array![[0.0, 2.0], [3.0, 1.0]]);
        let lu = Matrix::zeros(2, 2).unwrap();
        let parity =
            lu_decompose_into(&lu.view(), &a.view(), Some(&a.view()), LuMode::Perfect).unwrap();
        assert_eq!(parity, Some(Parity::Odd));
        assert_relative_eq!(det_lu(&lu.view(), parity).unwrap(), -6.0, epsilon = 1e-12);
        assert_eq!(lu.to_vec(), vec![3.0, 1.0, 0.0, 2.0]);
        // the input now holds the permutation
        assert_eq!(a.to_vec(), vec![0.0, 1.0, 1.0, 0.0]);
    }

    #[test]
    fn test_lenient_tall_matrix() {
        let a = m(array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]);
        let decomposition = lu_decompose(&a.view(), LuMode::Lenient).unwrap();
        assert!(decomposition.is_decomposed());
        assert_factors_reconstruct(&a, &decomposition);
    }

    #[test]
    fn test_in_place_decomposition() {
        let a = m(array![[4.0, 3.0], [6.0, 3.0]]);
        let original = a.try_clone().unwrap();
        let p = Matrix::zeros(2, 2).unwrap();
        let parity =
            lu_decompose_into(&a.view(), &a.view(), Some(&p.view()), LuMode::Perfect).unwrap();
        assert_eq!(parity, Some(Parity::Odd));
        assert_relative_eq!(det_lu(&a.view(), parity).unwrap(), det(&original.view()).unwrap());
        assert_relative_eq!(det_lu(&a.view(), parity).unwrap(), -6.0, epsilon = 1e-12);
    }

    #[test]
    fn test_permutation_preconditions() {
        let a = m(array![[1.0, 2.0], [3.0, 4.0]]);
        let lu = Matrix::zeros(2, 2).unwrap();
        let wrong = Matrix::zeros(3, 3).unwrap();
        let err = lu_decompose_into(&lu.view(), &a.view(), Some(&wrong.view()), LuMode::Lenient)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Invalid);

        let shared = Matrix::zeros(2, 4).unwrap();
        let lu_part = shared.view().view(0, 0, 2, 2).unwrap();
        let p_part = shared.view().view(0, 1, 2, 2).unwrap();
        let err = lu_decompose_into(&lu_part, &a.view(), Some(&p_part), LuMode::Lenient)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Invalid);
    }

    #[test]
    fn test_det_requires_square() {
        let a = m(array![[1.0, 2.0, 3.0]]);
        assert_eq!(det(&a.view()).unwrap_err().kind(), ErrorKind::InvalidDimensions);
    }
}
