//! Owned row-major storage
//!
//! Rows are addressed through a slot table (logical row -> physical row), so a
//! full-width row swap only exchanges two slots.

use super::view::MatrixView;
use crate::context::MatrixContext;
use crate::error::{MatrixError, Result};
use ndarray::Array2;
use std::cell::Cell;
use std::fmt;

pub(crate) struct MatrixStorage {
    rows: usize,
    cols: usize,
    cells: Box<[Cell<f64>]>,
    slots: Box<[Cell<usize>]>,
    context: MatrixContext,
}

impl MatrixStorage {
    fn new(
        rows: usize,
        cols: usize,
        context: &MatrixContext,
        operand: &'static str,
    ) -> Result<Self> {
        let buffer = context.allocate(rows, cols, operand)?;
        Ok(Self {
            rows,
            cols,
            cells: buffer.into_iter().map(Cell::new).collect(),
            slots: (0..rows).map(Cell::new).collect(),
            context: context.clone(),
        })
    }

    pub(crate) fn rows(&self) -> usize {
        self.rows
    }

    pub(crate) fn cols(&self) -> usize {
        self.cols
    }

    pub(crate) fn context(&self) -> &MatrixContext {
        &self.context
    }

    #[inline]
    pub(crate) fn cell(&self, row: usize, col: usize) -> &Cell<f64> {
        &self.cells[self.slots[row].get() * self.cols + col]
    }

    #[inline]
    pub(crate) fn swap_slots(&self, a: usize, b: usize) {
        self.slots[a].swap(&self.slots[b]);
    }
}

/// A dense `f64` matrix owning its storage
///
/// All reads and writes go through [`MatrixView`]s obtained with [`Matrix::view`]
/// and its sub-views; any number of views may alias the same storage.
pub struct Matrix {
    storage: MatrixStorage,
}

impl Matrix {
    /// Zero matrix using the default context
    pub fn zeros(rows: usize, cols: usize) -> Result<Self> {
        Self::zeros_in(rows, cols, &MatrixContext::default())
    }

    /// Zero matrix allocated through `context`
    pub fn zeros_in(rows: usize, cols: usize, context: &MatrixContext) -> Result<Self> {
        Ok(Self {
            storage: MatrixStorage::new(rows, cols, context, "M")?,
        })
    }

    pub fn identity(n: usize) -> Result<Self> {
        Self::identity_in(n, &MatrixContext::default())
    }

    pub fn identity_in(n: usize, context: &MatrixContext) -> Result<Self> {
        let matrix = Self::zeros_in(n, n, context)?;
        matrix.view().set_identity();
        Ok(matrix)
    }

    /// Build a matrix from row-major data
    pub fn from_slice(rows: usize, cols: usize, data: &[f64]) -> Result<Self> {
        Self::from_slice_in(rows, cols, data, &MatrixContext::default())
    }

    pub fn from_slice_in(
        rows: usize,
        cols: usize,
        data: &[f64],
        context: &MatrixContext,
    ) -> Result<Self> {
        let matrix = Self::zeros_in(rows, cols, context)?;
        matrix.view().fill_from_slice(data)?;
        Ok(matrix)
    }

    pub fn from_array(array: &Array2<f64>) -> Result<Self> {
        Self::from_array_in(array, &MatrixContext::default())
    }

    pub fn from_array_in(array: &Array2<f64>, context: &MatrixContext) -> Result<Self> {
        let matrix = Self::zeros_in(array.nrows(), array.ncols(), context)?;
        matrix.view().fill_from_array(array)?;
        Ok(matrix)
    }

    /// Deep copy into new storage sharing this matrix's context
    pub fn try_clone(&self) -> Result<Self> {
        self.view().to_matrix()
    }

    /// Full view over the whole storage
    pub fn view(&self) -> MatrixView<'_> {
        MatrixView::full(&self.storage)
    }

    pub fn rows(&self) -> usize {
        self.storage.rows
    }

    pub fn cols(&self) -> usize {
        self.storage.cols
    }

    pub fn context(&self) -> &MatrixContext {
        &self.storage.context
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.view().get(row, col)
    }

    pub fn to_array(&self) -> Array2<f64> {
        self.view().to_array()
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.view().to_vec()
    }
}

/// Allocate a matrix shaped like `like`, reporting a failed allocation under `operand`
pub(crate) fn allocate_like(
    like: &MatrixView<'_>,
    context: &MatrixContext,
    operand: &'static str,
) -> Result<Matrix> {
    allocate_shape(like.rows(), like.cols(), context, operand)
}

pub(crate) fn allocate_shape(
    rows: usize,
    cols: usize,
    context: &MatrixContext,
    operand: &'static str,
) -> Result<Matrix> {
    Ok(Matrix {
        storage: MatrixStorage::new(rows, cols, context, operand)?,
    })
}

impl fmt::Debug for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Matrix")
            .field("rows", &self.rows())
            .field("cols", &self.cols())
            .field("data", &self.to_vec())
            .finish()
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.view(), f)
    }
}

impl TryFrom<&Array2<f64>> for Matrix {
    type Error = MatrixError;

    fn try_from(array: &Array2<f64>) -> Result<Self> {
        Self::from_array(array)
    }
}
