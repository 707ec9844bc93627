//! Error types for sem-core operations.
//!
//! Every failure here is a deterministic input error: there is nothing
//! transient to retry, so callers get the error back unchanged.
//!
//! # Usage
//!
//! ```rust
//! use sem_core::{Error, Grid};
//!
//! let err = Grid::from_shape(&[2, 2, 3], vec![0.0; 12]).unwrap_err();
//! assert!(matches!(err, Error::InvalidShape { ndim: 3, .. }));
//! ```

use thiserror::Error;

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building grids or deriving tables from them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// Input is not a 2-D grid.
    ///
    /// Returned by the pixel setter when the source has any rank other
    /// than two, e.g. an RGB bitmap decoded as `(H, W, 3)`.
    #[error("expected a 2-D grid, got {ndim} dimension(s) with shape {shape:?}")]
    InvalidShape {
        /// Number of dimensions of the rejected input
        ndim: usize,
        /// Shape of the rejected input
        shape: Vec<usize>,
    },

    /// Nested rows of unequal length.
    #[error("ragged grid: row {row} has {actual} values, expected {expected}")]
    RaggedRow {
        /// Index of the first offending row
        row: usize,
        /// Length of row 0
        expected: usize,
        /// Length of the offending row
        actual: usize,
    },

    /// Sample buffer length does not match the declared shape.
    #[error("buffer size mismatch: expected {expected}, got {actual}")]
    BufferSizeMismatch {
        /// Product of the shape
        expected: usize,
        /// Samples supplied
        actual: usize,
    },

    /// Histogram holds no counts, so the equalisation table would divide by zero.
    #[error("histogram is empty: cannot normalise equalisation table")]
    DegenerateHistogram,
}

impl Error {
    /// True for every variant that means "input is not a 2-D numeric grid".
    pub fn is_shape_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidShape { .. } | Self::RaggedRow { .. } | Self::BufferSizeMismatch { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_mentions_shape() {
        let err = Error::InvalidShape { ndim: 3, shape: vec![4, 5, 3] };
        let msg = err.to_string();
        assert!(msg.contains("2-D"));
        assert!(msg.contains("[4, 5, 3]"));
    }

    #[test]
    fn shape_classification() {
        assert!(Error::RaggedRow { row: 1, expected: 2, actual: 3 }.is_shape_error());
        assert!(!Error::DegenerateHistogram.is_shape_error());
    }
}
