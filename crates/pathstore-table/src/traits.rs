use pathstore_types::RowId;

use crate::error::TableResult;
use crate::record::{ConfigEntry, ConfigKey, ConfigValue, Record, RecordKind, Table};

/// Row storage for the three pathstore tables.
///
/// All implementations must satisfy these invariants:
/// - Every call is serialized against every other call on the same handle.
/// - Writes are visible to the next read as soon as the call returns.
/// - A missing row is `Ok(None)`; `Err` always means the engine failed.
/// - Contents are opaque: payload bytes are stored and returned unchanged.
pub trait TableStore: Send + Sync {
    /// Create the `ndarray`, `object` and `config` tables if absent.
    ///
    /// Idempotent; existing rows are left untouched.
    fn ensure_tables(&self) -> TableResult<()>;

    /// Check whether a table exists.
    fn table_exists(&self, table: Table) -> TableResult<bool>;

    /// Insert a new payload row.
    ///
    /// Fails with [`crate::TableError::DuplicateRow`] if the id is taken.
    fn insert(&self, record: &Record) -> TableResult<()>;

    /// Insert a new payload row and write the config entries that index it.
    ///
    /// All or nothing: on error neither the row nor any entry is written.
    fn insert_indexed(&self, record: &Record, entries: &[ConfigEntry]) -> TableResult<()>;

    /// Overwrite an existing payload row in place.
    ///
    /// Returns `false` if no row with the record's id exists.
    fn update(&self, record: &Record) -> TableResult<bool>;

    /// Read a payload row.
    fn read(&self, kind: RecordKind, id: RowId) -> TableResult<Option<Record>>;

    /// Read a config entry.
    fn read_config(&self, key: ConfigKey) -> TableResult<Option<ConfigValue>>;

    /// Create or replace a config entry.
    fn write_config(&self, entry: &ConfigEntry) -> TableResult<()>;

    /// Number of rows in a table.
    fn row_count(&self, table: Table) -> TableResult<u64>;

    /// Check whether a payload row exists.
    fn exists(&self, kind: RecordKind, id: RowId) -> TableResult<bool> {
        Ok(self.read(kind, id)?.is_some())
    }
}
