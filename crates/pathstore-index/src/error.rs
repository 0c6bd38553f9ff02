//! Error types for the index crate.

use pathstore_types::RowId;

/// Errors that can occur during index operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum IndexError {
    /// The path string is empty or has an empty segment.
    #[error("invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    /// The separator used to split a path is empty.
    #[error("path separator must not be empty")]
    EmptySeparator,

    /// The path already maps to a row id.
    #[error("path {path} is already mapped to row {id}")]
    AlreadyMapped { path: String, id: RowId },

    /// The path runs through an existing leaf or names an existing group.
    #[error("path {path} conflicts with the existing entry at {prefix}")]
    PathConflict { path: String, prefix: String },

    /// Two paths map to the same row id.
    #[error("row id {0} is mapped by more than one path")]
    DuplicateId(RowId),

    /// A mapped row id was never handed out by the counter.
    #[error("row id {id} is beyond the last assigned id {last}")]
    IdOutOfRange { id: RowId, last: i64 },

    /// A segment name in a decoded index is empty.
    #[error("index contains an empty segment under {0:?}")]
    EmptySegment(String),

    /// Serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Convenience alias for index results.
pub type IndexResult<T> = Result<T, IndexError>;
