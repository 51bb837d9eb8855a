//! Basic matrix operations
//!
//! Every operation comes in an `_into` form writing to a caller-supplied view,
//! which may alias the inputs, and an allocating form returning a new matrix.

use crate::dense::{Matrix, MatrixView, allocate_shape, copy_cells};
use crate::error::{MatrixError, Result};
use crate::safe_output::{OverlapRule, SafeOutput};

/// Fail with `InvalidDimensions` unless `view` has the expected shape
pub(crate) fn expect_shape(
    view: &MatrixView<'_>,
    operand: &'static str,
    rows: usize,
    cols: usize,
) -> Result<()> {
    if view.shape() == (rows, cols) {
        Ok(())
    } else {
        Err(view.context().report(MatrixError::InvalidDimensions {
            operand,
            rows: view.rows(),
            cols: view.cols(),
        }))
    }
}

/// Copy `from` into `to`; overlapping views behave like `memmove`
pub fn copy_into(to: &MatrixView<'_>, from: &MatrixView<'_>) -> Result<()> {
    expect_shape(to, "to", from.rows(), from.cols())?;
    copy_cells(to, from);
    Ok(())
}

/// Copy the window of `from` starting at `(row0, col0)` with the shape of `to`
pub fn copy_from(
    to: &MatrixView<'_>,
    from: &MatrixView<'_>,
    row0: usize,
    col0: usize,
) -> Result<()> {
    let window = from.view(row0, col0, to.rows(), to.cols())?;
    copy_cells(to, &window);
    Ok(())
}

/// Exact elementwise equality; views of different shapes are never equal
pub fn equals(a: &MatrixView<'_>, b: &MatrixView<'_>) -> bool {
    if a.is_same(b) {
        return true;
    }
    if a.shape() != b.shape() {
        return false;
    }
    (0..a.rows()).all(|i| (0..a.cols()).all(|j| a.get(i, j) == b.get(i, j)))
}

/// Sum of absolute elementwise differences
pub fn distance(a: &MatrixView<'_>, b: &MatrixView<'_>) -> Result<f64> {
    expect_shape(b, "B", a.rows(), a.cols())?;
    let mut total = 0.0;
    for i in 0..a.rows() {
        for j in 0..a.cols() {
            total += (a.get(i, j) - b.get(i, j)).abs();
        }
    }
    Ok(total)
}

/// Write `a - b` into `d` and return its L1 norm
pub fn distance_into(d: &MatrixView<'_>, a: &MatrixView<'_>, b: &MatrixView<'_>) -> Result<f64> {
    let mut norm = 0.0;
    zip_into(d, a, b, |x, y| {
        let difference = x - y;
        norm += difference.abs();
        difference
    })?;
    Ok(norm)
}

fn zip_into(
    out: &MatrixView<'_>,
    a: &MatrixView<'_>,
    b: &MatrixView<'_>,
    mut op: impl FnMut(f64, f64) -> f64,
) -> Result<()> {
    let (rows, cols) = a.shape();
    expect_shape(b, "B", rows, cols)?;
    expect_shape(out, "C", rows, cols)?;
    let mut safe = SafeOutput::new(*out, "C");
    safe.guard(a, "A", OverlapRule::Elementwise)?;
    safe.guard(b, "B", OverlapRule::Elementwise)?;
    let target = safe.target();
    for i in 0..rows {
        for j in 0..cols {
            target.set(i, j, op(a.get(i, j), b.get(i, j)));
        }
    }
    safe.commit();
    Ok(())
}

fn allocate_result(rows: usize, cols: usize, like: &MatrixView<'_>) -> Result<Matrix> {
    allocate_shape(rows, cols, like.context(), "C")
}

pub fn add_into(c: &MatrixView<'_>, a: &MatrixView<'_>, b: &MatrixView<'_>) -> Result<()> {
    zip_into(c, a, b, |x, y| x + y)
}

pub fn add(a: &MatrixView<'_>, b: &MatrixView<'_>) -> Result<Matrix> {
    let c = allocate_result(a.rows(), a.cols(), a)?;
    add_into(&c.view(), a, b)?;
    Ok(c)
}

pub fn sub_into(c: &MatrixView<'_>, a: &MatrixView<'_>, b: &MatrixView<'_>) -> Result<()> {
    zip_into(c, a, b, |x, y| x - y)
}

pub fn sub(a: &MatrixView<'_>, b: &MatrixView<'_>) -> Result<Matrix> {
    let c = allocate_result(a.rows(), a.cols(), a)?;
    sub_into(&c.view(), a, b)?;
    Ok(c)
}

/// Hadamard product
pub fn mul_elements_into(c: &MatrixView<'_>, a: &MatrixView<'_>, b: &MatrixView<'_>) -> Result<()> {
    zip_into(c, a, b, |x, y| x * y)
}

pub fn mul_elements(a: &MatrixView<'_>, b: &MatrixView<'_>) -> Result<Matrix> {
    let c = allocate_result(a.rows(), a.cols(), a)?;
    mul_elements_into(&c.view(), a, b)?;
    Ok(c)
}

/// Elementwise quotient; division by zero follows IEEE 754
pub fn div_elements_into(c: &MatrixView<'_>, a: &MatrixView<'_>, b: &MatrixView<'_>) -> Result<()> {
    zip_into(c, a, b, |x, y| x / y)
}

pub fn div_elements(a: &MatrixView<'_>, b: &MatrixView<'_>) -> Result<Matrix> {
    let c = allocate_result(a.rows(), a.cols(), a)?;
    div_elements_into(&c.view(), a, b)?;
    Ok(c)
}

pub fn scale_into(c: &MatrixView<'_>, a: &MatrixView<'_>, factor: f64) -> Result<()> {
    let (rows, cols) = a.shape();
    expect_shape(c, "C", rows, cols)?;
    let mut safe = SafeOutput::new(*c, "C");
    safe.guard(a, "A", OverlapRule::Elementwise)?;
    let target = safe.target();
    for i in 0..rows {
        for j in 0..cols {
            target.set(i, j, factor * a.get(i, j));
        }
    }
    safe.commit();
    Ok(())
}

pub fn scale(a: &MatrixView<'_>, factor: f64) -> Result<Matrix> {
    let c = allocate_result(a.rows(), a.cols(), a)?;
    scale_into(&c.view(), a, factor)?;
    Ok(c)
}

/// `C = A x B`
pub fn matmul_into(c: &MatrixView<'_>, a: &MatrixView<'_>, b: &MatrixView<'_>) -> Result<()> {
    if a.cols() != b.rows() {
        return Err(b.context().report(MatrixError::InvalidDimensions {
            operand: "B",
            rows: b.rows(),
            cols: b.cols(),
        }));
    }
    expect_shape(c, "C", a.rows(), b.cols())?;
    let mut safe = SafeOutput::new(*c, "C");
    safe.guard(a, "A", OverlapRule::Disjoint)?;
    safe.guard(b, "B", OverlapRule::Disjoint)?;
    let target = safe.target();
    for i in 0..a.rows() {
        for j in 0..b.cols() {
            let mut sum = 0.0;
            for k in 0..a.cols() {
                sum += a.get(i, k) * b.get(k, j);
            }
            target.set(i, j, sum);
        }
    }
    safe.commit();
    Ok(())
}

pub fn matmul(a: &MatrixView<'_>, b: &MatrixView<'_>) -> Result<Matrix> {
    if a.cols() != b.rows() {
        return Err(b.context().report(MatrixError::InvalidDimensions {
            operand: "B",
            rows: b.rows(),
            cols: b.cols(),
        }));
    }
    let c = allocate_result(a.rows(), b.cols(), a)?;
    matmul_into(&c.view(), a, b)?;
    Ok(c)
}

pub fn transpose_into(t: &MatrixView<'_>, a: &MatrixView<'_>) -> Result<()> {
    expect_shape(t, "T", a.cols(), a.rows())?;
    let mut safe = SafeOutput::new(*t, "T");
    safe.guard(a, "A", OverlapRule::Disjoint)?;
    let target = safe.target();
    for i in 0..a.rows() {
        for j in 0..a.cols() {
            target.set(j, i, a.get(i, j));
        }
    }
    safe.commit();
    Ok(())
}

pub fn transpose(a: &MatrixView<'_>) -> Result<Matrix> {
    let t = allocate_result(a.cols(), a.rows(), a)?;
    transpose_into(&t.view(), a)?;
    Ok(t)
}
