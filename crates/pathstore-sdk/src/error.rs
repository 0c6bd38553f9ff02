use pathstore_index::IndexError;
use pathstore_table::{RecordKind, TableError};
use pathstore_types::{RowId, TypeError};
use thiserror::Error;

use crate::codec::CodecError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("path {0} does not exist")]
    PathNotFound(String),

    #[error("path {path} conflicts with the existing entry at {prefix}")]
    PathConflict { path: String, prefix: String },

    #[error("path {path} maps to row {id}, which has no {kind} record")]
    MissingRecord {
        path: String,
        id: RowId,
        kind: RecordKind,
    },

    #[error("path {path} maps to row {id}, which is in neither payload table")]
    DanglingPath { path: String, id: RowId },

    #[error("cannot deserialize {path}: {source}")]
    Deserialization { path: String, source: CodecError },

    #[error("cannot serialize value for {path}: {source}")]
    Serialization { path: String, source: CodecError },

    #[error("corrupt index: {0}")]
    CorruptIndex(String),

    #[error("index error: {0}")]
    Index(IndexError),

    #[error("backend error: {0}")]
    Backend(#[from] TableError),

    #[error("type error: {0}")]
    Type(#[from] TypeError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store state lock poisoned")]
    LockPoisoned,
}

impl From<IndexError> for StoreError {
    fn from(err: IndexError) -> Self {
        match err {
            IndexError::InvalidPath { path, reason } => Self::InvalidPath { path, reason },
            IndexError::PathConflict { path, prefix } => Self::PathConflict { path, prefix },
            other => Self::Index(other),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
