//! SQLite-backed table store.
//!
//! One [`rusqlite::Connection`] behind a `Mutex`: every statement on a handle
//! runs alone, matching the single-writer model of the store above it.
//! Single statements commit on their own (autocommit). An indexed insert runs
//! its payload row and config upserts in one transaction; a failure rolls all
//! of them back and the error is returned unchanged.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use pathstore_types::RowId;
use rusqlite::types::{ToSqlOutput, Value, ValueRef};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, ToSql};
use tracing::{debug, info};

use crate::error::{TableError, TableResult};
use crate::record::{
    ArrayRecord, ConfigEntry, ConfigKey, ConfigValue, ObjectRecord, Record, RecordKind, Table,
};
use crate::traits::TableStore;

const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS ndarray (
    id    INTEGER PRIMARY KEY,
    data  BLOB NOT NULL,
    shape TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS object (
    id   INTEGER PRIMARY KEY,
    data BLOB NOT NULL,
    info TEXT NOT NULL DEFAULT ''
);
CREATE TABLE IF NOT EXISTS config (
    "key"   TEXT PRIMARY KEY,
    "value"
);
"#;

/// Default time SQLite waits on a locked database file.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5_000);

impl ToSql for ConfigValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Self::Blob(bytes) => ToSqlOutput::Borrowed(ValueRef::Blob(bytes)),
            Self::Integer(value) => ToSqlOutput::Owned(Value::Integer(*value)),
        })
    }
}

/// Table store persisted in a single SQLite database file.
pub struct SqliteTableStore {
    path: Option<PathBuf>,
    connection: Mutex<Connection>,
}

impl SqliteTableStore {
    /// Open (or create) the database file at `path`.
    ///
    /// Missing parent directories are created. Tables are not created until
    /// [`TableStore::ensure_tables`] runs.
    pub fn open(path: impl AsRef<Path>, busy_timeout: Duration) -> TableResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let connection = Connection::open(path)?;
        connection.busy_timeout(busy_timeout)?;
        info!(path = %path.display(), "opened sqlite table store");
        Ok(Self {
            path: Some(path.to_path_buf()),
            connection: Mutex::new(connection),
        })
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> TableResult<Self> {
        let connection = Connection::open_in_memory()?;
        Ok(Self {
            path: None,
            connection: Mutex::new(connection),
        })
    }

    /// The database file, or `None` for an in-memory database.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> TableResult<MutexGuard<'_, Connection>> {
        self.connection.lock().map_err(|_| TableError::LockPoisoned)
    }
}

fn read_array(conn: &Connection, id: RowId) -> rusqlite::Result<Option<Record>> {
    conn.query_row(
        "SELECT data, shape FROM ndarray WHERE id = ?1",
        params![id.as_i64()],
        |row| {
            Ok(Record::Array(ArrayRecord {
                id,
                data: row.get(0)?,
                shape: row.get(1)?,
            }))
        },
    )
    .optional()
}

fn read_object(conn: &Connection, id: RowId) -> rusqlite::Result<Option<Record>> {
    conn.query_row(
        "SELECT data, info FROM object WHERE id = ?1",
        params![id.as_i64()],
        |row| {
            Ok(Record::Object(ObjectRecord {
                id,
                data: row.get(0)?,
                info: row.get(1)?,
            }))
        },
    )
    .optional()
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _) if failure.code == ErrorCode::ConstraintViolation
    )
}

fn insert_row(conn: &Connection, record: &Record) -> TableResult<()> {
    let result = match record {
        Record::Array(r) => conn.execute(
            "INSERT INTO ndarray (id, data, shape) VALUES (?1, ?2, ?3)",
            params![r.id.as_i64(), r.data, r.shape],
        ),
        Record::Object(r) => conn.execute(
            "INSERT INTO object (id, data, info) VALUES (?1, ?2, ?3)",
            params![r.id.as_i64(), r.data, r.info],
        ),
    };
    match result {
        Ok(_) => Ok(()),
        Err(err) if is_constraint_violation(&err) => Err(TableError::DuplicateRow {
            table: record.kind().table(),
            id: record.id(),
        }),
        Err(err) => Err(err.into()),
    }
}

fn upsert_config(conn: &Connection, entry: &ConfigEntry) -> rusqlite::Result<()> {
    conn.execute(
        r#"INSERT INTO config ("key", "value") VALUES (?1, ?2)
           ON CONFLICT("key") DO UPDATE SET "value" = excluded."value""#,
        params![entry.key.as_str(), entry.value],
    )?;
    Ok(())
}

fn config_value(key: ConfigKey, value: Value) -> TableResult<ConfigValue> {
    match value {
        Value::Blob(bytes) => Ok(ConfigValue::Blob(bytes)),
        Value::Integer(n) => Ok(ConfigValue::Integer(n)),
        // Integers written as text by other tools are still integers.
        Value::Text(text) => text
            .trim()
            .parse::<i64>()
            .map(ConfigValue::Integer)
            .map_err(|_| TableError::CorruptRow {
                table: Table::Config,
                reason: format!("{key} holds non-numeric text"),
            }),
        Value::Null | Value::Real(_) => Err(TableError::CorruptRow {
            table: Table::Config,
            reason: format!("{key} holds an unsupported value type"),
        }),
    }
}

impl TableStore for SqliteTableStore {
    fn ensure_tables(&self) -> TableResult<()> {
        self.lock()?.execute_batch(CREATE_TABLES)?;
        debug!("ensured ndarray, object and config tables");
        Ok(())
    }

    fn table_exists(&self, table: Table) -> TableResult<bool> {
        let count: i64 = self.lock()?.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![table.name()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn insert(&self, record: &Record) -> TableResult<()> {
        insert_row(&*self.lock()?, record)
    }

    fn insert_indexed(&self, record: &Record, entries: &[ConfigEntry]) -> TableResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        insert_row(&tx, record)?;
        for entry in entries {
            upsert_config(&tx, entry)?;
        }
        tx.commit()?;
        debug!(id = %record.id(), entries = entries.len(), "committed indexed insert");
        Ok(())
    }

    fn update(&self, record: &Record) -> TableResult<bool> {
        let conn = self.lock()?;
        let changed = match record {
            Record::Array(r) => conn.execute(
                "UPDATE ndarray SET data = ?2, shape = ?3 WHERE id = ?1",
                params![r.id.as_i64(), r.data, r.shape],
            )?,
            Record::Object(r) => conn.execute(
                "UPDATE object SET data = ?2, info = ?3 WHERE id = ?1",
                params![r.id.as_i64(), r.data, r.info],
            )?,
        };
        Ok(changed > 0)
    }

    fn read(&self, kind: RecordKind, id: RowId) -> TableResult<Option<Record>> {
        let conn = self.lock()?;
        let record = match kind {
            RecordKind::Array => read_array(&conn, id)?,
            RecordKind::Object => read_object(&conn, id)?,
        };
        Ok(record)
    }

    fn read_config(&self, key: ConfigKey) -> TableResult<Option<ConfigValue>> {
        let value: Option<Value> = self
            .lock()?
            .query_row(
                r#"SELECT "value" FROM config WHERE "key" = ?1"#,
                params![key.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        value.map(|v| config_value(key, v)).transpose()
    }

    fn write_config(&self, entry: &ConfigEntry) -> TableResult<()> {
        upsert_config(&*self.lock()?, entry)?;
        Ok(())
    }

    fn row_count(&self, table: Table) -> TableResult<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", table.name());
        let count: i64 = self.lock()?.query_row(&sql, [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }
}

impl std::fmt::Debug for SqliteTableStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteTableStore")
            .field("path", &self.path)
            .finish()
    }
}
