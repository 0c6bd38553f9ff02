use std::fmt;

use pathstore_types::RowId;
use serde::{Deserialize, Serialize};

/// The three tables of a store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Table {
    /// Serialized arrays with their shape descriptor.
    Ndarray,
    /// Serialized objects with a free-text annotation.
    Object,
    /// The persisted index blob and id counter.
    Config,
}

impl Table {
    pub const ALL: [Table; 3] = [Table::Ndarray, Table::Object, Table::Config];

    /// SQL table name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ndarray => "ndarray",
            Self::Object => "object",
            Self::Config => "config",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which payload table a record lives in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    Array,
    Object,
}

impl RecordKind {
    pub fn table(&self) -> Table {
        match self {
            Self::Array => Table::Ndarray,
            Self::Object => Table::Object,
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Array => write!(f, "array"),
            Self::Object => write!(f, "object"),
        }
    }
}

/// A row of the `ndarray` table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArrayRecord {
    pub id: RowId,
    /// Serialized array payload.
    pub data: Vec<u8>,
    /// Tuple-style shape descriptor, e.g. `(10, 10)`.
    pub shape: String,
}

/// A row of the `object` table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectRecord {
    pub id: RowId,
    /// Serialized object payload.
    pub data: Vec<u8>,
    /// Caller-supplied annotation; empty when none was given.
    pub info: String,
}

/// A payload row of either kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Record {
    Array(ArrayRecord),
    Object(ObjectRecord),
}

impl Record {
    pub fn kind(&self) -> RecordKind {
        match self {
            Self::Array(_) => RecordKind::Array,
            Self::Object(_) => RecordKind::Object,
        }
    }

    pub fn id(&self) -> RowId {
        match self {
            Self::Array(r) => r.id,
            Self::Object(r) => r.id,
        }
    }

    pub fn data(&self) -> &[u8] {
        match self {
            Self::Array(r) => &r.data,
            Self::Object(r) => &r.data,
        }
    }

    /// The text column: the shape descriptor or the object annotation.
    pub fn annotation(&self) -> &str {
        match self {
            Self::Array(r) => &r.shape,
            Self::Object(r) => &r.info,
        }
    }

    /// Payload size in bytes.
    pub fn size(&self) -> u64 {
        self.data().len() as u64
    }
}

impl From<ArrayRecord> for Record {
    fn from(record: ArrayRecord) -> Self {
        Self::Array(record)
    }
}

impl From<ObjectRecord> for Record {
    fn from(record: ObjectRecord) -> Self {
        Self::Object(record)
    }
}

// ---------------------------------------------------------------------------
// Config entries
// ---------------------------------------------------------------------------

/// The well-known keys of the `config` table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConfigKey {
    /// The serialized path index.
    DataMapper,
    /// The last-assigned row id.
    DataIdPtr,
}

impl ConfigKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DataMapper => "data_mapper",
            Self::DataIdPtr => "data_id_ptr",
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `config.value` cell. The column is untyped; each key uses one variant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigValue {
    Blob(Vec<u8>),
    Integer(i64),
}

impl ConfigValue {
    pub fn as_blob(&self) -> Option<&[u8]> {
        match self {
            Self::Blob(bytes) => Some(bytes),
            Self::Integer(_) => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            Self::Blob(_) => None,
        }
    }
}

/// A row of the `config` table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigEntry {
    pub key: ConfigKey,
    pub value: ConfigValue,
}

impl ConfigEntry {
    pub fn new(key: ConfigKey, value: ConfigValue) -> Self {
        Self { key, value }
    }
}
