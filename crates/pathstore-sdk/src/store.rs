//! The path-addressed store.
//!
//! A [`PathStore`] keeps the path index and the id counter in memory and
//! writes every change through to the `config` table before the call
//! returns. Inserting a new path builds the next index and counter on a
//! working copy, then hands the payload row, the index blob and the counter
//! to [`TableStore::insert_indexed`] as one atomic write. The live state is
//! swapped only after that write succeeds, so a failed insert changes
//! nothing and the next new path still gets `last + 1`.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use pathstore_index::{PathMapper, Resolution, StorePath};
use pathstore_table::{
    ArrayRecord, ConfigEntry, ConfigKey, ConfigValue, InMemoryTableStore, ObjectRecord, Record,
    RecordKind, SqliteTableStore, Table, TableStore,
};
use pathstore_types::{Element, IdCounter, NdArray, RowId};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::codec::{self, AnyArray, ArrayPayload, CodecError};
use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::outcome::{PathExistsWarning, RecordInfo, SaveOutcome, StoreStats};

struct IndexState {
    mapper: PathMapper,
    counter: IdCounter,
}

/// Hierarchical key-value store for arrays and serializable objects.
pub struct PathStore {
    identifier: Option<PathBuf>,
    config: StoreConfig,
    tables: Box<dyn TableStore>,
    state: Mutex<IndexState>,
}

impl PathStore {
    /// Open the SQLite store at `identifier` with the default configuration.
    ///
    /// `.db` is appended to identifiers that do not already end with it.
    pub fn open(identifier: impl AsRef<Path>) -> StoreResult<Self> {
        Self::open_with_config(identifier, StoreConfig::default())
    }

    /// Open the SQLite store at `identifier`.
    pub fn open_with_config(identifier: impl AsRef<Path>, config: StoreConfig) -> StoreResult<Self> {
        config.validate()?;
        let identifier = config.normalize_identifier(identifier);
        let tables = SqliteTableStore::open(&identifier, config.busy_timeout())?;
        Self::bootstrap(Some(identifier), Box::new(tables), config)
    }

    /// A store that lives only in memory.
    pub fn in_memory() -> StoreResult<Self> {
        Self::with_tables(Box::new(InMemoryTableStore::new()), StoreConfig::default())
    }

    /// Build a store over any table backend.
    pub fn with_tables(tables: Box<dyn TableStore>, config: StoreConfig) -> StoreResult<Self> {
        config.validate()?;
        Self::bootstrap(None, tables, config)
    }

    fn bootstrap(
        identifier: Option<PathBuf>,
        tables: Box<dyn TableStore>,
        config: StoreConfig,
    ) -> StoreResult<Self> {
        tables.ensure_tables()?;

        let mapper = match tables.read_config(ConfigKey::DataMapper)? {
            Some(ConfigValue::Blob(bytes)) => PathMapper::from_bytes(&bytes)
                .map_err(|e| StoreError::CorruptIndex(format!("data_mapper: {e}")))?,
            Some(ConfigValue::Integer(_)) => {
                return Err(StoreError::CorruptIndex(
                    "data_mapper does not hold a blob".into(),
                ))
            }
            None => {
                let mapper = PathMapper::new();
                tables.write_config(&ConfigEntry::new(
                    ConfigKey::DataMapper,
                    ConfigValue::Blob(mapper.to_bytes()?),
                ))?;
                mapper
            }
        };

        let counter = match tables.read_config(ConfigKey::DataIdPtr)? {
            Some(ConfigValue::Integer(last)) => IdCounter::from_last(last)
                .map_err(|e| StoreError::CorruptIndex(format!("data_id_ptr: {e}")))?,
            Some(ConfigValue::Blob(_)) => {
                return Err(StoreError::CorruptIndex(
                    "data_id_ptr does not hold an integer".into(),
                ))
            }
            None => {
                let counter = IdCounter::new();
                tables.write_config(&ConfigEntry::new(
                    ConfigKey::DataIdPtr,
                    ConfigValue::Integer(counter.last()),
                ))?;
                counter
            }
        };

        mapper
            .verify(&counter)
            .map_err(|e| StoreError::CorruptIndex(e.to_string()))?;

        info!(
            identifier = ?identifier,
            paths = mapper.len(),
            last_row_id = counter.last(),
            "opened path store"
        );

        Ok(Self {
            identifier,
            config,
            tables,
            state: Mutex::new(IndexState { mapper, counter }),
        })
    }

    // ---- Accessors ----

    /// The normalized database path, or `None` for non-file stores.
    pub fn identifier(&self) -> Option<&Path> {
        self.identifier.as_deref()
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Parse `raw` with the configured separator.
    pub fn parse_path(&self, raw: &str) -> StoreResult<StorePath> {
        Ok(StorePath::parse(raw, &self.config.separator)?)
    }

    fn lock_state(&self) -> StoreResult<MutexGuard<'_, IndexState>> {
        self.state.lock().map_err(|_| StoreError::LockPoisoned)
    }

    // ---- Arrays ----

    /// Save an array at `path`.
    ///
    /// An existing path is only overwritten when `force` is set; otherwise
    /// the save is declined with a [`PathExistsWarning`].
    pub fn save_array<T: Element>(
        &self,
        path: &str,
        array: &NdArray<T>,
        force: bool,
    ) -> StoreResult<SaveOutcome> {
        let path = self.parse_path(path)?;
        self.save_array_at(&path, array, force)
    }

    pub fn save_array_at<T: Element>(
        &self,
        path: &StorePath,
        array: &NdArray<T>,
        force: bool,
    ) -> StoreResult<SaveOutcome> {
        let data = codec::encode_array(array).map_err(|source| StoreError::Serialization {
            path: path.to_string(),
            source,
        })?;
        self.save_record(path, RecordKind::Array, data, array.shape().descriptor(), force)
    }

    /// Load the array saved at `path`.
    pub fn load_array<T: Element>(&self, path: &str) -> StoreResult<NdArray<T>> {
        let path = self.parse_path(path)?;
        self.load_array_at(&path)
    }

    pub fn load_array_at<T: Element>(&self, path: &StorePath) -> StoreResult<NdArray<T>> {
        let payload = self.load_array_payload(path)?;
        payload
            .into_array()
            .map_err(|source| deserialization(path, source))
    }

    /// Load the array saved at `path` with whatever element type it has.
    pub fn load_any_array(&self, path: &str) -> StoreResult<AnyArray> {
        let path = self.parse_path(path)?;
        self.load_any_array_at(&path)
    }

    pub fn load_any_array_at(&self, path: &StorePath) -> StoreResult<AnyArray> {
        let payload = self.load_array_payload(path)?;
        payload
            .into_any()
            .map_err(|source| deserialization(path, source))
    }

    fn load_array_payload(&self, path: &StorePath) -> StoreResult<ArrayPayload> {
        let record = self.load_record(path, RecordKind::Array)?;
        let payload =
            ArrayPayload::decode(record.data()).map_err(|source| deserialization(path, source))?;
        // The shape column holds the descriptor for arrays.
        payload
            .check_shape_column(record.annotation())
            .map_err(|source| deserialization(path, source))?;
        Ok(payload)
    }

    // ---- Objects ----

    /// Save a serializable value at `path` with a free-text annotation.
    pub fn save_obj<T: Serialize + ?Sized>(
        &self,
        path: &str,
        value: &T,
        info: &str,
        force: bool,
    ) -> StoreResult<SaveOutcome> {
        let path = self.parse_path(path)?;
        self.save_obj_at(&path, value, info, force)
    }

    pub fn save_obj_at<T: Serialize + ?Sized>(
        &self,
        path: &StorePath,
        value: &T,
        info: &str,
        force: bool,
    ) -> StoreResult<SaveOutcome> {
        let data = codec::encode_object(value).map_err(|source| StoreError::Serialization {
            path: path.to_string(),
            source,
        })?;
        self.save_record(path, RecordKind::Object, data, info.to_string(), force)
    }

    /// Load the value saved at `path`.
    pub fn load_obj<T: DeserializeOwned>(&self, path: &str) -> StoreResult<T> {
        let path = self.parse_path(path)?;
        self.load_obj_at(&path)
    }

    pub fn load_obj_at<T: DeserializeOwned>(&self, path: &StorePath) -> StoreResult<T> {
        let record = self.load_record(path, RecordKind::Object)?;
        codec::decode_object(record.data()).map_err(|source| deserialization(path, source))
    }

    /// The annotation saved with the object at `path`.
    pub fn load_obj_info(&self, path: &str) -> StoreResult<String> {
        let path = self.parse_path(path)?;
        let record = self.load_record(&path, RecordKind::Object)?;
        Ok(record.annotation().to_string())
    }

    // ---- Inspection ----

    /// Returns `true` if `path` is mapped to a saved record.
    pub fn contains(&self, path: &str) -> StoreResult<bool> {
        let path = self.parse_path(path)?;
        Ok(self.lock_state()?.mapper.contains(&path))
    }

    /// Every mapped path (joined with the configured separator) and its row.
    pub fn entries(&self) -> StoreResult<Vec<(String, RowId)>> {
        Ok(self.lock_state()?.mapper.entries(&self.config.separator))
    }

    /// Describe the record at `path` without decoding its value.
    pub fn describe(&self, path: &str) -> StoreResult<RecordInfo> {
        let path = self.parse_path(path)?;
        let state = self.lock_state()?;
        let id = resolve_leaf(&state.mapper, &path)?;

        let record = match self.tables.read(RecordKind::Array, id)? {
            Some(record) => record,
            None => self
                .tables
                .read(RecordKind::Object, id)?
                .ok_or_else(|| StoreError::DanglingPath {
                    path: path.to_string(),
                    id,
                })?,
        };

        let dtype = match &record {
            Record::Array(r) => ArrayPayload::decode(&r.data).ok().map(|p| p.dtype),
            Record::Object(_) => None,
        };

        Ok(RecordInfo {
            path: path.to_string(),
            id,
            kind: record.kind(),
            size: record.size(),
            annotation: record.annotation().to_string(),
            dtype,
        })
    }

    pub fn stats(&self) -> StoreResult<StoreStats> {
        let state = self.lock_state()?;
        Ok(StoreStats {
            last_row_id: state.counter.last(),
            mapped_paths: state.mapper.len(),
            array_rows: self.tables.row_count(Table::Ndarray)?,
            object_rows: self.tables.row_count(Table::Object)?,
        })
    }

    // ---- Shared save/load paths ----

    fn save_record(
        &self,
        path: &StorePath,
        kind: RecordKind,
        data: Vec<u8>,
        annotation: String,
        force: bool,
    ) -> StoreResult<SaveOutcome> {
        let mut state = self.lock_state()?;

        match state.mapper.resolve(path) {
            Resolution::Found(id) if !force => {
                let warning = PathExistsWarning {
                    path: path.to_string(),
                    id,
                };
                warn!(path = %path, id = %id, "{warning}");
                Ok(SaveOutcome::Declined(warning))
            }
            Resolution::Found(id) => {
                let record = build_record(kind, id, data, annotation);
                if !self.tables.update(&record)? {
                    return Err(StoreError::MissingRecord {
                        path: path.to_string(),
                        id,
                        kind,
                    });
                }
                debug!(path = %path, id = %id, %kind, "overwrote record");
                Ok(SaveOutcome::Updated(id))
            }
            Resolution::Missing { .. } => {
                let mut mapper = state.mapper.clone();
                let mut counter = state.counter;
                let id = counter.advance()?;
                mapper.insert(path, id)?;

                let entries = [
                    ConfigEntry::new(ConfigKey::DataMapper, ConfigValue::Blob(mapper.to_bytes()?)),
                    ConfigEntry::new(ConfigKey::DataIdPtr, ConfigValue::Integer(counter.last())),
                ];
                self.tables
                    .insert_indexed(&build_record(kind, id, data, annotation), &entries)?;

                state.mapper = mapper;
                state.counter = counter;

                debug!(path = %path, id = %id, %kind, "inserted record");
                Ok(SaveOutcome::Inserted(id))
            }
            Resolution::ThroughLeaf { depth, .. } => Err(StoreError::PathConflict {
                path: path.to_string(),
                prefix: path.prefix(depth + 1),
            }),
            Resolution::LeafIsSubtree => Err(StoreError::PathConflict {
                path: path.to_string(),
                prefix: path.to_string(),
            }),
        }
    }

    fn load_record(&self, path: &StorePath, kind: RecordKind) -> StoreResult<Record> {
        let state = self.lock_state()?;
        let id = resolve_leaf(&state.mapper, path)?;
        let record = self
            .tables
            .read(kind, id)?
            .ok_or_else(|| StoreError::MissingRecord {
                path: path.to_string(),
                id,
                kind,
            })?;
        debug!(path = %path, id = %id, %kind, "loaded record");
        Ok(record)
    }
}

fn resolve_leaf(mapper: &PathMapper, path: &StorePath) -> StoreResult<RowId> {
    mapper
        .get(path)
        .ok_or_else(|| StoreError::PathNotFound(path.to_string()))
}

fn build_record(kind: RecordKind, id: RowId, data: Vec<u8>, annotation: String) -> Record {
    match kind {
        RecordKind::Array => ArrayRecord {
            id,
            data,
            shape: annotation,
        }
        .into(),
        RecordKind::Object => ObjectRecord {
            id,
            data,
            info: annotation,
        }
        .into(),
    }
}

fn deserialization(path: &StorePath, source: CodecError) -> StoreError {
    StoreError::Deserialization {
        path: path.to_string(),
        source,
    }
}

impl std::fmt::Debug for PathStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathStore")
            .field("identifier", &self.identifier)
            .field("separator", &self.config.separator)
            .finish()
    }
}
