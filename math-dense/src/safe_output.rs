//! Safe-output protocol for in-place operations
//!
//! An operation declares, for every input it reads, the [`OverlapRule`] under
//! which writing its output in place would clobber input cells before they are
//! read. If any rule fires, writes are staged in a temporary that is copied
//! back on [`SafeOutput::commit`]. The temporary is dropped on every exit path.

use crate::dense::{Matrix, MatrixView, allocate_like, copy_cells};
use crate::error::{MatrixError, Result};

/// When writing `output` in place is unsafe with respect to one input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlapRule {
    /// Any intersection is unsafe (products, permutations, transposes)
    Disjoint,
    /// Elementwise traversal: unsafe when the output starts after the input
    Elementwise,
    /// Rows solved last to first: unsafe when the output starts above the input
    /// (`inclusive` also rejects the same starting row)
    BottomUp { inclusive: bool },
    /// Rows solved first to last: unsafe when the output starts below the input
    /// (`inclusive` also rejects the same starting row)
    TopDown { inclusive: bool },
}

impl OverlapRule {
    pub fn is_unsafe(self, output: &MatrixView<'_>, input: &MatrixView<'_>) -> bool {
        match self {
            Self::Disjoint => output.overlaps(input),
            Self::Elementwise => input.overlaps_after(output),
            Self::BottomUp { inclusive } => {
                output.overlaps(input)
                    && if inclusive {
                        output.row_offset() <= input.row_offset()
                    } else {
                        output.row_offset() < input.row_offset()
                    }
            }
            Self::TopDown { inclusive } => {
                output.overlaps(input)
                    && if inclusive {
                        output.row_offset() >= input.row_offset()
                    } else {
                        output.row_offset() > input.row_offset()
                    }
            }
        }
    }
}

/// An output view together with its (optional) staging buffer
pub struct SafeOutput<'a> {
    output: MatrixView<'a>,
    output_name: &'static str,
    staging: Option<Matrix>,
}

impl<'a> SafeOutput<'a> {
    pub fn new(output: MatrixView<'a>, output_name: &'static str) -> Self {
        Self {
            output,
            output_name,
            staging: None,
        }
    }

    /// Check one input against the output; allocates the temporary on the first
    /// unsafe overlap, or fails when the context does not fix overlaps
    pub fn guard(
        &mut self,
        input: &MatrixView<'_>,
        input_name: &'static str,
        rule: OverlapRule,
    ) -> Result<()> {
        if !rule.is_unsafe(&self.output, input) {
            return Ok(());
        }
        let context = self.output.context();
        if !context.fixes_unsafe_overlaps() {
            return Err(context.report(MatrixError::UnsafeOverlap {
                output_name: self.output_name,
                output: self.output.region(),
                input_name,
                input: input.region(),
            }));
        }
        if self.staging.is_none() {
            log::debug!(
                "staging {} {} through a temporary: {:?} overlap with {} {}",
                self.output_name,
                self.output.region(),
                rule,
                input_name,
                input.region()
            );
            self.staging = Some(allocate_like(&self.output, context, "temporary")?);
        }
        Ok(())
    }

    /// The view all writes should go to
    pub fn target(&self) -> MatrixView<'_> {
        match &self.staging {
            Some(temporary) => temporary.view(),
            None => self.output,
        }
    }

    pub fn output(&self) -> MatrixView<'a> {
        self.output
    }

    pub fn is_staged(&self) -> bool {
        self.staging.is_some()
    }

    /// Copy staged results into the output and release the temporary
    pub fn commit(self) {
        if let Some(temporary) = self.staging {
            copy_cells(&self.output, &temporary.view());
        }
    }
}
