//! Error taxonomy for precondition failures
//!
//! Numerical outcomes (singular systems, indeterminate substitutions) are not
//! errors and never go through this module; they are returned as ordinary values.

use std::fmt;
use thiserror::Error;

/// A rectangular window in storage coordinates, used to describe operands in errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Region {
    pub row_offset: usize,
    pub col_offset: usize,
    pub rows: usize,
    pub cols: usize,
}

impl Region {
    pub fn new(row_offset: usize, col_offset: usize, rows: usize, cols: usize) -> Self {
        Self {
            row_offset,
            col_offset,
            rows,
            cols,
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}) at [{}, {}]",
            self.rows, self.cols, self.row_offset, self.col_offset
        )
    }
}

/// Errors raised when an operation's preconditions are violated
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MatrixError {
    #[error("matrix {operand} is uninitialized")]
    Uninitialized { operand: &'static str },

    #[error("matrix {operand} has invalid dimensions ({rows}, {cols})")]
    InvalidDimensions {
        operand: &'static str,
        rows: usize,
        cols: usize,
    },

    #[error("matrix {operand} is invalid: {reason}")]
    Invalid {
        operand: &'static str,
        reason: &'static str,
    },

    #[error("window {requested} is out of the bounds ({rows}, {cols}) of matrix {operand}")]
    OutOfBounds {
        operand: &'static str,
        requested: Region,
        rows: usize,
        cols: usize,
    },

    #[error("output {output_name} {output} has an unsafe overlap with {input_name} {input}")]
    UnsafeOverlap {
        output_name: &'static str,
        output: Region,
        input_name: &'static str,
        input: Region,
    },

    #[error("system failure in {call}: {reason}")]
    SystemFailure { call: &'static str, reason: String },
}

/// Discriminant of [`MatrixError`], for callers that only care about the category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Uninitialized,
    InvalidDimensions,
    Invalid,
    OutOfBounds,
    UnsafeOverlap,
    SystemFailure,
}

impl MatrixError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Uninitialized { .. } => ErrorKind::Uninitialized,
            Self::InvalidDimensions { .. } => ErrorKind::InvalidDimensions,
            Self::Invalid { .. } => ErrorKind::Invalid,
            Self::OutOfBounds { .. } => ErrorKind::OutOfBounds,
            Self::UnsafeOverlap { .. } => ErrorKind::UnsafeOverlap,
            Self::SystemFailure { .. } => ErrorKind::SystemFailure,
        }
    }
}

pub type Result<T> = std::result::Result<T, MatrixError>;

/// Receives every precondition error before it is returned to the caller
pub trait ErrorReporter: fmt::Debug + Send + Sync {
    fn report(&self, error: &MatrixError);
}

/// Logs errors through the `log` facade and lets the caller handle them
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl ErrorReporter for LogReporter {
    fn report(&self, error: &MatrixError) {
        log::error!("{error}");
    }
}

/// Aborts the current thread on the first error
#[derive(Debug, Default, Clone, Copy)]
pub struct FatalReporter;

impl ErrorReporter for FatalReporter {
    fn report(&self, error: &MatrixError) {
        log::error!("{error}");
        panic!("fatal matrix error: {error}");
    }
}
