//! Row storage for pathstore.
//!
//! A store persists into exactly three tables:
//!
//! | Table | Columns |
//! |---|---|
//! | `ndarray` | `id` (row key), `data` (array payload), `shape` (tuple descriptor) |
//! | `object` | `id` (row key), `data` (object payload), `info` (annotation) |
//! | `config` | `key`, `value` (`data_mapper` blob, `data_id_ptr` integer) |
//!
//! # Storage Backends
//!
//! All backends implement the [`TableStore`] trait:
//!
//! - [`SqliteTableStore`] -- one SQLite file behind a mutex
//! - [`InMemoryTableStore`] -- `BTreeMap`-based store for tests and embedding
//!
//! # Design Rules
//!
//! 1. The store never interprets payload bytes.
//! 2. Reads of absent rows return `Ok(None)`; engine failures are `Err`.
//! 3. Every operation on a handle is serialized behind one lock.

pub mod error;
pub mod memory;
pub mod record;
pub mod sqlite;
pub mod traits;

pub use error::{TableError, TableResult};
pub use memory::InMemoryTableStore;
pub use record::{
    ArrayRecord, ConfigEntry, ConfigKey, ConfigValue, ObjectRecord, Record, RecordKind, Table,
};
pub use sqlite::{SqliteTableStore, DEFAULT_BUSY_TIMEOUT};
pub use traits::TableStore;
