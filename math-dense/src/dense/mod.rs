//! Matrix storage, views and aliasing predicates
//!
//! A [`Matrix`] owns its storage. Every operation works on [`MatrixView`]s,
//! which may alias each other freely; [`crate::safe_output`] decides when an
//! aliased output must be staged through a temporary.

mod overlap;
mod storage;
mod view;

pub(crate) use overlap::{copy_cells, sub_scaled_row};
pub(crate) use storage::{allocate_like, allocate_shape};
pub use storage::Matrix;
pub use view::MatrixView;
