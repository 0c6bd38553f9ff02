use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use pathstore_types::RowId;

use crate::error::{TableError, TableResult};
use crate::record::{
    ArrayRecord, ConfigEntry, ConfigKey, ConfigValue, ObjectRecord, Record, RecordKind, Table,
};
use crate::traits::TableStore;

#[derive(Default)]
struct Tables {
    ndarray: Option<BTreeMap<RowId, ArrayRecord>>,
    object: Option<BTreeMap<RowId, ObjectRecord>>,
    config: Option<BTreeMap<ConfigKey, ConfigValue>>,
}

impl Tables {
    fn exists(&self, table: Table) -> bool {
        match table {
            Table::Ndarray => self.ndarray.is_some(),
            Table::Object => self.object.is_some(),
            Table::Config => self.config.is_some(),
        }
    }

    /// Leaves the table untouched when the row cannot be inserted.
    fn insert_row(&mut self, record: &Record) -> TableResult<()> {
        let id = record.id();
        let duplicate = |table| TableError::DuplicateRow { table, id };
        match record {
            Record::Array(r) => {
                let rows = present(self.ndarray.as_mut(), Table::Ndarray)?;
                if rows.contains_key(&id) {
                    return Err(duplicate(Table::Ndarray));
                }
                rows.insert(id, r.clone());
            }
            Record::Object(r) => {
                let rows = present(self.object.as_mut(), Table::Object)?;
                if rows.contains_key(&id) {
                    return Err(duplicate(Table::Object));
                }
                rows.insert(id, r.clone());
            }
        }
        Ok(())
    }

    fn len(&self, table: Table) -> Option<usize> {
        match table {
            Table::Ndarray => self.ndarray.as_ref().map(BTreeMap::len),
            Table::Object => self.object.as_ref().map(BTreeMap::len),
            Table::Config => self.config.as_ref().map(BTreeMap::len),
        }
    }
}

fn present<T>(table: Option<T>, name: Table) -> TableResult<T> {
    table.ok_or(TableError::MissingTable(name))
}

/// In-memory, `BTreeMap`-based table store.
///
/// Intended for tests and embedding. Tables behave like their SQLite
/// counterparts, including failing with [`TableError::MissingTable`] until
/// [`TableStore::ensure_tables`] has run. Data is lost when the store is
/// dropped.
pub struct InMemoryTableStore {
    tables: RwLock<Tables>,
}

impl InMemoryTableStore {
    /// Create a store with no tables.
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
        }
    }

    fn read_tables(&self) -> TableResult<RwLockReadGuard<'_, Tables>> {
        self.tables.read().map_err(|_| TableError::LockPoisoned)
    }

    fn write_tables(&self) -> TableResult<RwLockWriteGuard<'_, Tables>> {
        self.tables.write().map_err(|_| TableError::LockPoisoned)
    }
}

impl Default for InMemoryTableStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TableStore for InMemoryTableStore {
    fn ensure_tables(&self) -> TableResult<()> {
        let mut tables = self.write_tables()?;
        tables.ndarray.get_or_insert_with(BTreeMap::new);
        tables.object.get_or_insert_with(BTreeMap::new);
        tables.config.get_or_insert_with(BTreeMap::new);
        Ok(())
    }

    fn table_exists(&self, table: Table) -> TableResult<bool> {
        Ok(self.read_tables()?.exists(table))
    }

    fn insert(&self, record: &Record) -> TableResult<()> {
        let mut tables = self.write_tables()?;
        tables.insert_row(record)
    }

    fn insert_indexed(&self, record: &Record, entries: &[ConfigEntry]) -> TableResult<()> {
        let mut tables = self.write_tables()?;
        if tables.config.is_none() {
            return Err(TableError::MissingTable(Table::Config));
        }
        tables.insert_row(record)?;
        let config = present(tables.config.as_mut(), Table::Config)?;
        for entry in entries {
            config.insert(entry.key, entry.value.clone());
        }
        Ok(())
    }

    fn update(&self, record: &Record) -> TableResult<bool> {
        let mut tables = self.write_tables()?;
        let id = record.id();
        let updated = match record {
            Record::Array(r) => present(tables.ndarray.as_mut(), Table::Ndarray)?
                .get_mut(&id)
                .map(|row| *row = r.clone())
                .is_some(),
            Record::Object(r) => present(tables.object.as_mut(), Table::Object)?
                .get_mut(&id)
                .map(|row| *row = r.clone())
                .is_some(),
        };
        Ok(updated)
    }

    fn read(&self, kind: RecordKind, id: RowId) -> TableResult<Option<Record>> {
        let tables = self.read_tables()?;
        let record = match kind {
            RecordKind::Array => present(tables.ndarray.as_ref(), Table::Ndarray)?
                .get(&id)
                .cloned()
                .map(Record::Array),
            RecordKind::Object => present(tables.object.as_ref(), Table::Object)?
                .get(&id)
                .cloned()
                .map(Record::Object),
        };
        Ok(record)
    }

    fn read_config(&self, key: ConfigKey) -> TableResult<Option<ConfigValue>> {
        let tables = self.read_tables()?;
        Ok(present(tables.config.as_ref(), Table::Config)?
            .get(&key)
            .cloned())
    }

    fn write_config(&self, entry: &ConfigEntry) -> TableResult<()> {
        let mut tables = self.write_tables()?;
        present(tables.config.as_mut(), Table::Config)?.insert(entry.key, entry.value.clone());
        Ok(())
    }

    fn row_count(&self, table: Table) -> TableResult<u64> {
        let tables = self.read_tables()?;
        let len = tables.len(table).ok_or(TableError::MissingTable(table))?;
        Ok(len as u64)
    }
}

impl std::fmt::Debug for InMemoryTableStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("InMemoryTableStore");
        if let Ok(tables) = self.tables.read() {
            for table in Table::ALL {
                s.field(table.name(), &tables.len(table));
            }
        }
        s.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn array(id: i64, data: &[u8]) -> Record {
        ArrayRecord {
            id: RowId::new(id),
            data: data.to_vec(),
            shape: format!("({},)", data.len()),
        }
        .into()
    }

    fn object(id: i64, data: &[u8], info: &str) -> Record {
        ObjectRecord {
            id: RowId::new(id),
            data: data.to_vec(),
            info: info.into(),
        }
        .into()
    }

    fn ready() -> InMemoryTableStore {
        let store = InMemoryTableStore::new();
        store.ensure_tables().unwrap();
        store
    }

    // -----------------------------------------------------------------------
    // Table lifecycle
    // -----------------------------------------------------------------------

    #[test]
    fn tables_absent_until_ensured() {
        let store = InMemoryTableStore::new();
        for table in Table::ALL {
            assert!(!store.table_exists(table).unwrap());
        }
        let err = store.insert(&array(0, b"x")).unwrap_err();
        assert!(matches!(err, TableError::MissingTable(Table::Ndarray)));

        store.ensure_tables().unwrap();
        for table in Table::ALL {
            assert!(store.table_exists(table).unwrap());
        }
    }

    #[test]
    fn ensure_tables_is_idempotent() {
        let store = ready();
        store.insert(&array(0, b"keep")).unwrap();
        store.ensure_tables().unwrap();
        assert_eq!(store.row_count(Table::Ndarray).unwrap(), 1);
    }

    // -----------------------------------------------------------------------
    // Payload rows
    // -----------------------------------------------------------------------

    #[test]
    fn insert_and_read_both_kinds() {
        let store = ready();
        store.insert(&array(0, b"abc")).unwrap();
        store.insert(&object(1, b"obj", "note")).unwrap();

        let a = store.read(RecordKind::Array, RowId::new(0)).unwrap().unwrap();
        assert_eq!(a, array(0, b"abc"));
        let o = store.read(RecordKind::Object, RowId::new(1)).unwrap().unwrap();
        assert_eq!(o.annotation(), "note");
    }

    #[test]
    fn kinds_do_not_share_rows() {
        let store = ready();
        store.insert(&array(0, b"abc")).unwrap();
        assert!(store.read(RecordKind::Object, RowId::new(0)).unwrap().is_none());
        assert!(!store.exists(RecordKind::Object, RowId::new(0)).unwrap());
        assert!(store.exists(RecordKind::Array, RowId::new(0)).unwrap());
    }

    #[test]
    fn duplicate_insert_fails() {
        let store = ready();
        store.insert(&array(5, b"a")).unwrap();
        let err = store.insert(&array(5, b"b")).unwrap_err();
        assert!(matches!(
            err,
            TableError::DuplicateRow { table: Table::Ndarray, id } if id == RowId::new(5)
        ));
        let kept = store.read(RecordKind::Array, RowId::new(5)).unwrap().unwrap();
        assert_eq!(kept.data(), b"a");
    }

    #[test]
    fn update_overwrites_in_place() {
        let store = ready();
        store.insert(&object(2, b"old", "v1")).unwrap();
        assert!(store.update(&object(2, b"new", "v2")).unwrap());
        let row = store.read(RecordKind::Object, RowId::new(2)).unwrap().unwrap();
        assert_eq!(row.data(), b"new");
        assert_eq!(row.annotation(), "v2");
        assert_eq!(store.row_count(Table::Object).unwrap(), 1);
    }

    #[test]
    fn update_missing_row_reports_false() {
        let store = ready();
        assert!(!store.update(&array(9, b"x")).unwrap());
        assert_eq!(store.row_count(Table::Ndarray).unwrap(), 0);
    }

    // -----------------------------------------------------------------------
    // Config entries
    // -----------------------------------------------------------------------

    #[test]
    fn config_write_replaces() {
        let store = ready();
        assert!(store.read_config(ConfigKey::DataIdPtr).unwrap().is_none());

        store
            .write_config(&ConfigEntry::new(ConfigKey::DataIdPtr, ConfigValue::Integer(-1)))
            .unwrap();
        store
            .write_config(&ConfigEntry::new(ConfigKey::DataIdPtr, ConfigValue::Integer(3)))
            .unwrap();

        assert_eq!(
            store.read_config(ConfigKey::DataIdPtr).unwrap(),
            Some(ConfigValue::Integer(3))
        );
        assert_eq!(store.row_count(Table::Config).unwrap(), 1);
    }

    #[test]
    fn insert_indexed_writes_row_and_entries() {
        let store = ready();
        let entries = [
            ConfigEntry::new(ConfigKey::DataMapper, ConfigValue::Blob(vec![7])),
            ConfigEntry::new(ConfigKey::DataIdPtr, ConfigValue::Integer(0)),
        ];
        store.insert_indexed(&array(0, b"row"), &entries).unwrap();
        assert!(store.exists(RecordKind::Array, RowId::new(0)).unwrap());
        assert_eq!(
            store.read_config(ConfigKey::DataIdPtr).unwrap(),
            Some(ConfigValue::Integer(0))
        );
    }

    #[test]
    fn insert_indexed_duplicate_leaves_config_alone() {
        let store = ready();
        store.insert(&object(0, b"taken", "")).unwrap();
        store
            .write_config(&ConfigEntry::new(ConfigKey::DataIdPtr, ConfigValue::Integer(-1)))
            .unwrap();

        let entries = [ConfigEntry::new(ConfigKey::DataIdPtr, ConfigValue::Integer(0))];
        let err = store.insert_indexed(&object(0, b"new", ""), &entries).unwrap_err();
        assert!(matches!(err, TableError::DuplicateRow { table: Table::Object, .. }));
        assert_eq!(
            store.read_config(ConfigKey::DataIdPtr).unwrap(),
            Some(ConfigValue::Integer(-1))
        );
        let kept = store.read(RecordKind::Object, RowId::new(0)).unwrap().unwrap();
        assert_eq!(kept.data(), b"taken");
    }

    #[test]
    fn debug_format() {
        let store = ready();
        store.insert(&array(0, b"x")).unwrap();
        let debug = format!("{store:?}");
        assert!(debug.contains("InMemoryTableStore"));
        assert!(debug.contains("ndarray"));
    }
}
