use pathstore_types::RowId;

use crate::record::Table;

/// Errors from the table engine.
///
/// "No such row" is never an error at this layer: reads return `Ok(None)`
/// so callers can tell an empty result apart from a backend failure.
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    /// A table was accessed before [`crate::TableStore::ensure_tables`] created it.
    #[error("table {0} does not exist")]
    MissingTable(Table),

    /// An insert targeted a row id that is already taken.
    #[error("row {id} already exists in table {table}")]
    DuplicateRow { table: Table, id: RowId },

    /// A stored row does not have the column types the store writes.
    #[error("corrupt row in table {table}: {reason}")]
    CorruptRow { table: Table, reason: String },

    /// Error reported by SQLite.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// I/O error while preparing the database file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A thread panicked while holding the table lock.
    #[error("table lock poisoned")]
    LockPoisoned,
}

/// Result alias for table operations.
pub type TableResult<T> = Result<T, TableError>;
