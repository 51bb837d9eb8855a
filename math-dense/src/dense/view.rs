//! Rectangular windows over shared storage

use super::storage::{Matrix, MatrixStorage, allocate_like};
use crate::context::MatrixContext;
use crate::error::{MatrixError, Region, Result};
use ndarray::Array2;
use std::cell::Cell;
use std::fmt;

/// A window `(row_offset, col_offset, rows, cols)` over a matrix's storage
///
/// Offsets are absolute storage coordinates. Views are `Copy` and never own
/// storage; writes through one view are visible through every view that covers
/// the same cells.
#[derive(Clone, Copy)]
pub struct MatrixView<'a> {
    pub(crate) storage: &'a MatrixStorage,
    row_offset: usize,
    col_offset: usize,
    rows: usize,
    cols: usize,
}

impl<'a> MatrixView<'a> {
    pub(crate) fn full(storage: &'a MatrixStorage) -> Self {
        Self {
            storage,
            row_offset: 0,
            col_offset: 0,
            rows: storage.rows(),
            cols: storage.cols(),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn row_offset(&self) -> usize {
        self.row_offset
    }

    pub fn col_offset(&self) -> usize {
        self.col_offset
    }

    pub fn region(&self) -> Region {
        Region::new(self.row_offset, self.col_offset, self.rows, self.cols)
    }

    /// Context of the underlying storage
    pub fn context(&self) -> &'a MatrixContext {
        self.storage.context()
    }

    /// True when the view covers its whole storage
    pub fn is_full(&self) -> bool {
        self.row_offset == 0
            && self.col_offset == 0
            && self.rows == self.storage.rows()
            && self.cols == self.storage.cols()
    }

    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    /// Sub-view with offsets relative to this view
    pub fn view(&self, row0: usize, col0: usize, rows: usize, cols: usize) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(self.context().report(MatrixError::InvalidDimensions {
                operand: "view",
                rows,
                cols,
            }));
        }
        let in_bounds = row0
            .checked_add(rows)
            .is_some_and(|end| end <= self.rows)
            && col0.checked_add(cols).is_some_and(|end| end <= self.cols);
        if !in_bounds {
            return Err(self.context().report(MatrixError::OutOfBounds {
                operand: "parent",
                requested: Region::new(self.row_offset + row0, self.col_offset + col0, rows, cols),
                rows: self.rows,
                cols: self.cols,
            }));
        }
        Ok(Self {
            storage: self.storage,
            row_offset: self.row_offset + row0,
            col_offset: self.col_offset + col0,
            rows,
            cols,
        })
    }

    pub fn row_view(&self, row: usize) -> Result<Self> {
        self.view(row, 0, 1, self.cols)
    }

    pub fn column_view(&self, col: usize) -> Result<Self> {
        self.view(0, col, self.rows, 1)
    }

    #[inline]
    pub(crate) fn cell(&self, row: usize, col: usize) -> &'a Cell<f64> {
        assert!(
            row < self.rows && col < self.cols,
            "index ({row}, {col}) out of bounds for view ({}, {})",
            self.rows,
            self.cols
        );
        self.storage
            .cell(self.row_offset + row, self.col_offset + col)
    }

    /// Read an element; panics when the index is outside the view
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.cell(row, col).get()
    }

    /// Write an element; panics when the index is outside the view
    #[inline]
    pub fn set(&self, row: usize, col: usize, value: f64) {
        self.cell(row, col).set(value);
    }

    pub fn swap_rows(&self, a: usize, b: usize) {
        if a == b {
            return;
        }
        if self.col_offset == 0 && self.cols == self.storage.cols() {
            assert!(a < self.rows && b < self.rows, "row swap out of bounds");
            self.storage
                .swap_slots(self.row_offset + a, self.row_offset + b);
        } else {
            for j in 0..self.cols {
                self.cell(a, j).swap(self.cell(b, j));
            }
        }
    }

    pub fn fill(&self, value: f64) {
        for i in 0..self.rows {
            for j in 0..self.cols {
                self.set(i, j, value);
            }
        }
    }

    /// Fill from row-major data whose length equals `rows * cols`
    pub fn fill_from_slice(&self, data: &[f64]) -> Result<()> {
        if data.len() != self.rows * self.cols {
            return Err(self.context().report(MatrixError::InvalidDimensions {
                operand: "data",
                rows: data.len() / self.cols.max(1),
                cols: self.cols,
            }));
        }
        for (k, &value) in data.iter().enumerate() {
            self.set(k / self.cols, k % self.cols, value);
        }
        Ok(())
    }

    pub fn fill_from_array(&self, array: &Array2<f64>) -> Result<()> {
        if array.dim() != self.shape() {
            return Err(self.context().report(MatrixError::InvalidDimensions {
                operand: "array",
                rows: array.nrows(),
                cols: array.ncols(),
            }));
        }
        for ((i, j), &value) in array.indexed_iter() {
            self.set(i, j, value);
        }
        Ok(())
    }

    /// Ones on the leading diagonal, zeros elsewhere
    pub fn set_identity(&self) {
        for i in 0..self.rows {
            for j in 0..self.cols {
                self.set(i, j, if i == j { 1.0 } else { 0.0 });
            }
        }
    }

    pub fn to_array(&self) -> Array2<f64> {
        Array2::from_shape_fn(self.shape(), |(i, j)| self.get(i, j))
    }

    /// Row-major copy of the view's elements
    pub fn to_vec(&self) -> Vec<f64> {
        let mut data = Vec::with_capacity(self.rows * self.cols);
        for i in 0..self.rows {
            for j in 0..self.cols {
                data.push(self.get(i, j));
            }
        }
        data
    }

    /// Copy the view into a new matrix in the same context
    pub fn to_matrix(&self) -> Result<Matrix> {
        let matrix = allocate_like(self, self.context(), "clone")?;
        let target = matrix.view();
        for i in 0..self.rows {
            for j in 0..self.cols {
                target.set(i, j, self.get(i, j));
            }
        }
        Ok(matrix)
    }
}

impl fmt::Debug for MatrixView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatrixView")
            .field("region", &self.region())
            .field("storage", &(self.storage as *const MatrixStorage))
            .finish()
    }
}

impl fmt::Display for MatrixView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "matrix ({}, {}):", self.rows, self.cols)?;
        for i in 0..self.rows {
            for j in 0..self.cols {
                if j > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{:10.4}", self.get(i, j))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use ndarray::array;

    fn sample() -> Matrix {
        Matrix::from_array(&array![
            [1.0, 2.0, 3.0, 4.0],
            [5.0, 6.0, 7.0, 8.0],
            [9.0, 10.0, 11.0, 12.0]
        ])
        .unwrap()
    }

    #[test]
    fn test_subview_offsets_are_absolute() {
        let m = sample();
        let outer = m.view().view(1, 1, 2, 3).unwrap();
        let inner = outer.view(1, 1, 1, 2).unwrap();
        assert_eq!(inner.row_offset(), 2);
        assert_eq!(inner.col_offset(), 2);
        assert_eq!(inner.to_vec(), vec![11.0, 12.0]);
        assert!(m.view().is_full());
        assert!(!outer.is_full());
    }

    #[test]
    fn test_subview_bounds() {
        let m = sample();
        let err = m.view().view(2, 0, 2, 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfBounds);
        let err = m.view().view(0, 1, 1, 4).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfBounds);
        let err = m.view().view(0, 0, 0, 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidDimensions);
        assert!(m.view().view(0, 0, 3, 4).is_ok());
    }

    #[test]
    fn test_writes_visible_through_aliases() {
        let m = sample();
        let a = m.view().view(0, 1, 2, 2).unwrap();
        let b = m.view().column_view(2).unwrap();
        a.set(1, 1, -1.0);
        assert_eq!(b.get(1, 0), -1.0);
    }

    #[test]
    fn test_partial_width_swap() {
        let m = sample();
        let right = m.view().view(0, 2, 3, 2).unwrap();
        right.swap_rows(0, 2);
        assert_eq!(
            m.to_array(),
            array![
                [1.0, 2.0, 11.0, 12.0],
                [5.0, 6.0, 7.0, 8.0],
                [9.0, 10.0, 3.0, 4.0]
            ]
        );
    }

    #[test]
    fn test_full_width_swap_inside_subview() {
        let m = sample();
        let lower = m.view().view(1, 0, 2, 4).unwrap();
        lower.swap_rows(0, 1);
        assert_eq!(m.view().row_view(1).unwrap().to_vec(), vec![9.0, 10.0, 11.0, 12.0]);
        assert_eq!(m.view().row_view(0).unwrap().to_vec(), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_set_identity_rectangular() {
        let m = Matrix::zeros(2, 3).unwrap();
        m.view().fill(7.0);
        m.view().set_identity();
        assert_eq!(m.to_array(), array![[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
    }

    #[test]
    fn test_display_header() {
        let m = Matrix::identity(2).unwrap();
        let text = m.to_string();
        assert!(text.starts_with("matrix (2, 2):"));
        assert_eq!(text.lines().count(), 3);
    }
}
