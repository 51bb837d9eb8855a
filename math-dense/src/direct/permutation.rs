//! Row permutations stored as permutation matrices
//!
//! Applying a permutation copies rows instead of multiplying: for output row `i`
//! the unit entry of permutation row `i` is searched in a column window that
//! shrinks from both ends as boundary columns get used.

use crate::context::MatrixContext;
use crate::dense::{Matrix, MatrixView, allocate_like};
use crate::error::{MatrixError, Result};
use crate::ops::expect_shape;
use crate::safe_output::{OverlapRule, SafeOutput};

/// A square matrix with exactly one unit entry in every row and column
#[derive(Debug)]
pub struct Permutation {
    matrix: Matrix,
}

impl Permutation {
    pub fn identity(n: usize) -> Result<Self> {
        Self::identity_in(n, &MatrixContext::default())
    }

    pub fn identity_in(n: usize, context: &MatrixContext) -> Result<Self> {
        Ok(Self {
            matrix: Matrix::identity_in(n, context)?,
        })
    }

    /// Wrap an existing matrix after checking it is a permutation
    pub fn from_matrix(matrix: Matrix) -> Result<Self> {
        let view = matrix.view();
        if !view.is_square() {
            return Err(view.context().report(MatrixError::InvalidDimensions {
                operand: "P",
                rows: view.rows(),
                cols: view.cols(),
            }));
        }
        let n = view.rows();
        let mut used = vec![false; n];
        for i in 0..n {
            let mut unit = None;
            for j in 0..n {
                let value = view.get(i, j);
                if value == 0.0 {
                    continue;
                }
                if value != 1.0 || unit.is_some() || used[j] {
                    return Err(view.context().report(MatrixError::Invalid {
                        operand: "P",
                        reason: "not a permutation matrix",
                    }));
                }
                unit = Some(j);
            }
            match unit {
                Some(j) => used[j] = true,
                None => {
                    return Err(view.context().report(MatrixError::Invalid {
                        operand: "P",
                        reason: "row without a unit entry",
                    }));
                }
            }
        }
        Ok(Self { matrix })
    }

    pub fn size(&self) -> usize {
        self.matrix.rows()
    }

    pub fn view(&self) -> MatrixView<'_> {
        self.matrix.view()
    }

    pub fn swap_rows(&self, a: usize, b: usize) {
        self.matrix.view().swap_rows(a, b);
    }

    /// Source row index feeding each output row
    ///
    /// Fails when the matrix was edited through [`Permutation::view`] into
    /// something that is no longer a permutation.
    pub fn indices(&self) -> Result<Vec<usize>> {
        let view = self.view();
        let n = self.size();
        let (mut lower, mut upper) = (0, n);
        let mut indices = Vec::with_capacity(n);
        for i in 0..n {
            let from = unit_column(&view, i, lower, upper)?;
            if from == lower {
                lower += 1;
            }
            if from + 1 == upper {
                upper -= 1;
            }
            indices.push(from);
        }
        Ok(indices)
    }

    /// `P x source` as a new matrix
    pub fn apply(&self, source: &MatrixView<'_>) -> Result<Matrix> {
        let out = allocate_like(source, source.context(), "PM")?;
        permute_into(&out.view(), source, &self.view())?;
        Ok(out)
    }

    pub fn apply_into(&self, out: &MatrixView<'_>, source: &MatrixView<'_>) -> Result<()> {
        permute_into(out, source, &self.view())
    }

    pub fn into_matrix(self) -> Matrix {
        self.matrix
    }
}

/// Column of the unit entry of `row`, searched within `lower..upper`
fn unit_column(
    permutation: &MatrixView<'_>,
    row: usize,
    lower: usize,
    upper: usize,
) -> Result<usize> {
    (lower..upper)
        .find(|&j| permutation.get(row, j) == 1.0)
        .ok_or_else(|| {
            permutation.context().report(MatrixError::Invalid {
                operand: "P",
                reason: "row without a unit entry",
            })
        })
}

/// Write `permutation x source` into `out`
pub fn permute_into(
    out: &MatrixView<'_>,
    source: &MatrixView<'_>,
    permutation: &MatrixView<'_>,
) -> Result<()> {
    let n = source.rows();
    expect_shape(permutation, "P", n, n)?;
    expect_shape(out, "PM", n, source.cols())?;

    let mut safe = SafeOutput::new(*out, "PM");
    safe.guard(source, "M", OverlapRule::Disjoint)?;
    safe.guard(permutation, "P", OverlapRule::Disjoint)?;
    let target = safe.target();

    let (mut lower, mut upper) = (0, n);
    for i in 0..n {
        let from = unit_column(permutation, i, lower, upper)?;
        for j in 0..source.cols() {
            target.set(i, j, source.get(from, j));
        }
        if from == lower {
            lower += 1;
        }
        if from + 1 == upper {
            upper -= 1;
        }
    }
    safe.commit();
    Ok(())
}
