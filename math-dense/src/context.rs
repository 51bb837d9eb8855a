//! Per-matrix runtime context: configuration, allocator and error reporter
//!
//! Every storage carries the context it was created with; operations consult the
//! context of the storage they write to.

use crate::config::DenseConfig;
use crate::error::{ErrorReporter, LogReporter, MatrixError, Result};
use std::fmt;
use std::sync::Arc;

/// Source of element buffers for new matrices and temporaries
pub trait Allocator: fmt::Debug + Send + Sync {
    /// Return a zero-filled buffer of `len` elements
    fn allocate(&self, len: usize) -> Result<Vec<f64>>;
}

/// Heap allocation with fallible reservation
#[derive(Debug, Default, Clone, Copy)]
pub struct HeapAllocator;

impl Allocator for HeapAllocator {
    fn allocate(&self, len: usize) -> Result<Vec<f64>> {
        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(len)
            .map_err(|e| MatrixError::SystemFailure {
                call: "allocate",
                reason: e.to_string(),
            })?;
        buffer.resize(len, 0.0);
        Ok(buffer)
    }
}

#[derive(Debug, Clone)]
pub struct MatrixContext {
    config: DenseConfig,
    allocator: Arc<dyn Allocator>,
    reporter: Arc<dyn ErrorReporter>,
}

impl Default for MatrixContext {
    fn default() -> Self {
        Self::new(DenseConfig::default())
    }
}

impl MatrixContext {
    pub fn new(config: DenseConfig) -> Self {
        Self {
            config,
            allocator: Arc::new(HeapAllocator),
            reporter: Arc::new(LogReporter),
        }
    }

    pub fn with_allocator(mut self, allocator: Arc<dyn Allocator>) -> Self {
        self.allocator = allocator;
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn config(&self) -> &DenseConfig {
        &self.config
    }

    pub fn fixes_unsafe_overlaps(&self) -> bool {
        self.config.fix_unsafe_overlaps
    }

    /// Pass an error to the reporter and hand it back for propagation
    pub fn report(&self, error: MatrixError) -> MatrixError {
        self.reporter.report(&error);
        error
    }

    /// Allocate a zeroed `rows x cols` buffer within the configured limits
    pub(crate) fn allocate(
        &self,
        rows: usize,
        cols: usize,
        operand: &'static str,
    ) -> Result<Vec<f64>> {
        if rows == 0 || cols == 0 || rows > self.config.max_rows || cols > self.config.max_cols {
            return Err(self.report(MatrixError::InvalidDimensions {
                operand,
                rows,
                cols,
            }));
        }
        log::trace!("allocating {operand} ({rows}, {cols})");
        let len = rows * cols;
        let buffer = self.allocator.allocate(len).map_err(|e| self.report(e))?;
        if buffer.len() != len {
            return Err(self.report(MatrixError::SystemFailure {
                call: "allocate",
                reason: format!("requested {len} cells for {operand}, got {}", buffer.len()),
            }));
        }
        Ok(buffer)
    }
}
