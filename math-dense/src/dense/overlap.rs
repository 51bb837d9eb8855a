//! Aliasing predicates between views
//!
//! All predicates are pure: they only compare storage identity, offsets and
//! extents.

use super::view::MatrixView;
use std::cell::Cell;
use std::ptr;

impl MatrixView<'_> {
    pub fn shares_storage(&self, other: &MatrixView<'_>) -> bool {
        ptr::eq(self.storage, other.storage)
    }

    /// Same storage, same offsets, same extent
    pub fn is_same(&self, other: &MatrixView<'_>) -> bool {
        self.shares_storage(other) && self.region() == other.region()
    }

    /// Same storage and intersecting rectangles
    pub fn overlaps(&self, other: &MatrixView<'_>) -> bool {
        self.shares_storage(other)
            && self.row_offset() < other.row_offset() + other.rows()
            && other.row_offset() < self.row_offset() + self.rows()
            && self.col_offset() < other.col_offset() + other.cols()
            && other.col_offset() < self.col_offset() + self.cols()
    }

    /// `other` intersects this view and starts strictly later in row-major order
    pub fn overlaps_after(&self, other: &MatrixView<'_>) -> bool {
        self.overlaps(other) && starts_after(other, self)
    }
}

fn starts_after(a: &MatrixView<'_>, b: &MatrixView<'_>) -> bool {
    a.row_offset() > b.row_offset()
        || (a.row_offset() == b.row_offset() && a.col_offset() > b.col_offset())
}

/// Copy `from` into `to` (same shape) with memmove semantics on aliasing views
pub(crate) fn copy_cells(to: &MatrixView<'_>, from: &MatrixView<'_>) {
    debug_assert_eq!(to.shape(), from.shape());
    if to.is_same(from) {
        return;
    }
    let (rows, cols) = to.shape();
    let transfer = |i: usize, j: usize| to.cell(i, j).set(from.get(i, j));
    if to.overlaps(from) && starts_after(to, from) {
        for i in (0..rows).rev() {
            for j in (0..cols).rev() {
                transfer(i, j);
            }
        }
    } else {
        for i in 0..rows {
            for j in 0..cols {
                transfer(i, j);
            }
        }
    }
}

/// `row[dst] -= factor * row[src]` across `cols` starting at `col0`
#[inline]
pub(crate) fn sub_scaled_row(
    view: &MatrixView<'_>,
    dst: usize,
    src: usize,
    factor: f64,
    col0: usize,
) {
    for j in col0..view.cols() {
        let target: &Cell<f64> = view.cell(dst, j);
        target.set(target.get() - factor * view.get(src, j));
    }
}

#[cfg(test)]
mod tests {
    use crate::dense::Matrix;
    use ndarray::array;

    #[test]
    fn test_overlap_predicates() {
        let m = Matrix::zeros(4, 4).unwrap();
        let full = m.view();
        let top = full.view(0, 0, 2, 4).unwrap();
        let bottom = full.view(2, 0, 2, 4).unwrap();
        let middle = full.view(1, 1, 2, 2).unwrap();

        assert!(!top.overlaps(&bottom));
        assert!(top.overlaps(&middle));
        assert!(middle.overlaps(&bottom));
        assert!(top.overlaps_after(&middle));
        assert!(!middle.overlaps_after(&top));
        assert!(!top.overlaps_after(&top));
        assert!(top.is_same(&full.view(0, 0, 2, 4).unwrap()));
    }

    #[test]
    fn test_distinct_storage_never_overlaps() {
        let a = Matrix::zeros(3, 3).unwrap();
        let b = Matrix::zeros(3, 3).unwrap();
        assert!(!a.view().shares_storage(&b.view()));
        assert!(!a.view().overlaps(&b.view()));
    }

    #[test]
    fn test_same_row_start_orders_by_column() {
        let m = Matrix::zeros(2, 4).unwrap();
        let left = m.view().view(0, 0, 2, 3).unwrap();
        let right = m.view().view(0, 1, 2, 3).unwrap();
        assert!(left.overlaps_after(&right));
        assert!(!right.overlaps_after(&left));
    }

    #[test]
    fn test_copy_cells_memmove_down() {
        let m = Matrix::from_array(&array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]).unwrap();
        let upper = m.view().view(0, 0, 2, 2).unwrap();
        let lower = m.view().view(1, 0, 2, 2).unwrap();
        super::copy_cells(&lower, &upper);
        assert_eq!(m.to_array(), array![[1.0, 2.0], [1.0, 2.0], [3.0, 4.0]]);
    }

    #[test]
    fn test_copy_cells_memmove_up_left() {
        let m = Matrix::from_array(&array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]])
            .unwrap();
        let target = m.view().view(0, 0, 2, 2).unwrap();
        let source = m.view().view(1, 1, 2, 2).unwrap();
        super::copy_cells(&target, &source);
        assert_eq!(
            m.to_array(),
            array![[5.0, 6.0, 3.0], [8.0, 9.0, 6.0], [7.0, 8.0, 9.0]]
        );
    }
}
