//! Error types with diagnostic codes using miette
//!
//! Every fallible operation in the crate returns [`MapError`]. Nothing is
//! retried internally: all operations are deterministic numeric computations,
//! so a failure is reported straight back to the caller.

use miette::Diagnostic;
use thiserror::Error;

/// Convenience alias used throughout the crate
pub type Result<T> = std::result::Result<T, MapError>;

/// Errors raised by mapping construction, evaluation and analysis
#[derive(Error, Diagnostic, Debug, Clone, PartialEq)]
pub enum MapError {
    #[error("invalid parameter: {message}")]
    #[diagnostic(code(coordmap::invalid_parameter))]
    InvalidParameter { message: String },

    #[error("the {direction} transformation of this {class} is not defined")]
    #[diagnostic(
        code(coordmap::undefined_transform),
        help("check has_forward()/has_inverse() before transforming")
    )]
    UndefinedTransform {
        class: &'static str,
        direction: &'static str,
    },

    #[error("dimension mismatch: {message}")]
    #[diagnostic(
        code(coordmap::dimension_mismatch),
        help("point batches are (n_points, n_coords) and axis indices are 1-based")
    )]
    DimensionMismatch { message: String },

    #[error("no linear fit within tolerance {tolerance} (max deviation {deviation})")]
    #[diagnostic(code(coordmap::approximation))]
    Approximation { tolerance: f64, deviation: f64 },

    #[error("cannot split {class} on input axes {axes:?}")]
    #[diagnostic(
        code(coordmap::unsplittable),
        help("the selected outputs also depend on input axes that were not requested")
    )]
    UnsplittableMapping {
        class: &'static str,
        axes: Vec<usize>,
    },

    #[error("unknown attribute: {name}")]
    #[diagnostic(
        code(coordmap::unknown_attribute),
        help("settable attributes are Report, Invert and Ident")
    )]
    UnknownAttribute { name: String },

    #[error("attribute {name} is read-only")]
    #[diagnostic(code(coordmap::read_only_attribute))]
    ReadOnlyAttribute { name: String },

    #[error("iterative inverse did not converge after {iterations} iterations")]
    #[diagnostic(code(coordmap::no_convergence))]
    NoConvergence { iterations: usize },
}

impl MapError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        MapError::InvalidParameter {
            message: message.into(),
        }
    }

    pub(crate) fn dimension(what: &str, expected: usize, got: usize) -> Self {
        MapError::DimensionMismatch {
            message: format!("{what} is {got}, expected {expected}"),
        }
    }

    pub(crate) fn axis_out_of_range(index: usize, max: usize) -> Self {
        MapError::DimensionMismatch {
            message: format!("axis index {index} out of range 1..={max}"),
        }
    }

    /// Fail with [`MapError::DimensionMismatch`] unless `got == expected`
    pub(crate) fn check_len(what: &str, expected: usize, got: usize) -> Result<()> {
        if got == expected {
            Ok(())
        } else {
            Err(Self::dimension(what, expected, got))
        }
    }
}
