//! Direct solvers for dense linear systems
//!
//! This module provides:
//! - [`lu_decompose`]: LU decomposition with partial pivoting and echelon bookkeeping
//! - [`permute_into`]: row permutation without a full product
//! - [`back_substitution_into`] / [`forward_substitution_into`]: triangular solves
//! - [`solve`], [`solve_augmented`], [`lu_solve`]: linear solves on the factors
//! - [`refine`]: residual-based iterative refinement

mod lu;
mod permutation;
mod refine;
mod solve;
mod triangular;

pub use lu::{LuDecomposition, LuMode, Parity, det, det_lu, lu_decompose, lu_decompose_into};
pub use permutation::{Permutation, permute_into};
pub use refine::{RefineSolution, refine, refine_until_converged};
pub use solve::{lu_solve, lu_solve_augmented_into, lu_solve_into, solve, solve_augmented};
pub use triangular::{Diagonal, SolveStatus, back_substitution_into, forward_substitution_into};
