//! Error types for the engine.
//!
//! A single enum covers every way a core operation can fail. Nothing in
//! the core retries and nothing panics except for documented
//! programming-error preconditions (e.g. `Dataset::get` out of bounds).

use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported to callers of the engine façade.
#[derive(Error, Debug)]
pub enum Error {
    /// Input vector length did not match the configured dimension.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension the dataset was configured with.
        expected: usize,
        /// Length of the vector that was rejected.
        actual: usize,
    },

    /// K-means training was asked for more lists than there are vectors.
    #[error("insufficient data: need at least {k} vectors to train {k} lists, have {count}")]
    InsufficientData {
        /// Requested number of lists / clusters.
        k: usize,
        /// Vectors currently in the dataset.
        count: usize,
    },

    /// `search` was called before `build`.
    #[error("index has not been built yet")]
    NotBuilt,

    /// A write-ahead-log operation failed at the OS level.
    #[error("WAL I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// A WAL record could not be parsed during recovery.
    ///
    /// Reported for diagnostics; recovery itself treats this as
    /// skip-and-continue rather than a hard failure.
    #[error("corrupt WAL record at line {line}: {reason}")]
    Corrupt {
        /// 1-based line number of the offending record.
        line: usize,
        /// Human-readable reason the line was rejected.
        reason: String,
    },
}
