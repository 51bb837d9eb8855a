//! Dense matrices with aliasing views and a pivoted LU solver
//!
//! This crate provides a small dense `f64` matrix core in which any number of
//! views may share one storage, and a linear-system engine built on LU
//! decomposition.
//!
//! # Features
//!
//! - **Views**: bounds-checked rectangular windows over shared storage
//! - **Safe in-place output**: operations detect when their output would clobber
//!   unread input cells and stage the result through a temporary
//! - **LU decomposition**: partial pivoting, row-echelon migration, zero-row
//!   relegation, permutation tracking and swap parity
//! - **Solvers**: triangular substitution, square and augmented systems,
//!   determinants, iterative refinement
//!
//! # Example
//!
//! ```
//! use math_audio_dense::{Matrix, solve, ops};
//! use ndarray::array;
//!
//! let a = Matrix::from_array(&array![[4.0, 1.0], [1.0, 3.0]]).unwrap();
//! let b = Matrix::from_array(&array![[1.0], [2.0]]).unwrap();
//!
//! let x = solve(&a.view(), &b.view()).unwrap().expect("non-singular");
//! let ax = ops::matmul(&a.view(), &x.view()).unwrap();
//! assert!(ops::distance(&ax.view(), &b.view()).unwrap() < 1e-12);
//! ```

pub mod config;
pub mod context;
pub mod dense;
pub mod direct;
pub mod error;
pub mod ops;
pub mod safe_output;

pub use config::{DenseConfig, RefineConfig};
pub use context::{Allocator, HeapAllocator, MatrixContext};
pub use dense::{Matrix, MatrixView};
pub use error::{ErrorKind, ErrorReporter, FatalReporter, LogReporter, MatrixError, Region, Result};
pub use safe_output::{OverlapRule, SafeOutput};

pub use direct::{
    Diagonal, LuDecomposition, LuMode, Parity, Permutation, RefineSolution, SolveStatus,
    back_substitution_into, det, det_lu, forward_substitution_into, lu_decompose,
    lu_decompose_into, lu_solve, lu_solve_augmented_into, lu_solve_into, permute_into, refine,
    refine_until_converged, solve, solve_augmented,
};
