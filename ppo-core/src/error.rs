//! Errors in the library.
use thiserror::Error;

/// Errors in the library.
#[derive(Error, Debug, PartialEq)]
pub enum PpoError {
    /// No transition has been stored when batches are requested.
    #[error("Rollout buffer is empty")]
    EmptyBuffer,

    /// Per-transition arrays that must be aligned have different lengths.
    #[error("Length mismatch of {name}: expected {expected}, got {actual}")]
    LengthMismatch {
        /// Name of the offending array.
        name: &'static str,
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },

    /// Stored vectors of a field have different dimensions.
    #[error("Shape mismatch of {name} at index {index}: expected {expected}, got {actual}")]
    ShapeMismatch {
        /// Name of the offending field.
        name: &'static str,
        /// Index of the transition.
        index: usize,
        /// Dimension of the first stored vector.
        expected: usize,
        /// Dimension of the vector at `index`.
        actual: usize,
    },

    /// Minibatch size of zero.
    #[error("Batch size must be positive")]
    ZeroBatchSize,

    /// A reward or its normalized value is NaN or infinite.
    #[error("Invalid reward normalization: {0}")]
    NonFiniteReward(f64),

    /// Record key error.
    #[error("Record key error: {0}")]
    RecordKeyError(String),
}
