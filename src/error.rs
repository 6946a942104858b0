use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for dataset construction, tree/forest fitting, metrics and tuning.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid input dimensions: expected {expected:?}, got {got:?}")]
    InvalidDimensions { expected: Vec<usize>, got: Vec<usize> },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("dataset must contain at least one sample")]
    EmptyDataset,

    #[error("label {0} out of range, expected 0 or 1")]
    LabelOutOfRange(f64),

    #[error("length mismatch: {left} vs {right}")]
    LengthMismatch { left: usize, right: usize },

    #[error("invalid fold count {k} for {n} samples, must be 2 <= k <= n")]
    InvalidFoldCount { k: usize, n: usize },

    #[error("parameter grid must not be empty")]
    EmptyGrid,

    #[error("model must be fitted before this operation")]
    NotFitted,
}
