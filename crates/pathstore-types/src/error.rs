use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("shape {shape} holds {expected} elements, got {actual}")]
    ShapeMismatch {
        shape: String,
        expected: usize,
        actual: usize,
    },

    #[error("invalid shape descriptor: {0:?}")]
    InvalidShape(String),

    #[error("invalid counter value: {0}")]
    InvalidCounter(i64),

    #[error("row id counter exhausted")]
    CounterOverflow,
}
