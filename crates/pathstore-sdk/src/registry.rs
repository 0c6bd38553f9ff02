use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::store::PathStore;

/// Process-wide cache of open stores, keyed by normalized absolute path.
///
/// Opening the same identifier twice, with or without the file suffix,
/// returns the same shared [`PathStore`].
#[derive(Debug, Default)]
pub struct StoreRegistry {
    config: StoreConfig,
    stores: Mutex<HashMap<PathBuf, Arc<PathStore>>>,
}

impl StoreRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry whose stores all use `config`.
    pub fn with_config(config: StoreConfig) -> StoreResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            stores: Mutex::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Return the store for `identifier`, opening it on first use.
    pub fn open(&self, identifier: impl AsRef<Path>) -> StoreResult<Arc<PathStore>> {
        let key = self.key(identifier.as_ref())?;
        let mut stores = self.lock()?;
        if let Some(store) = stores.get(&key) {
            return Ok(Arc::clone(store));
        }

        let store = Arc::new(PathStore::open_with_config(&key, self.config.clone())?);
        debug!(identifier = %key.display(), "registered store");
        stores.insert(key, Arc::clone(&store));
        Ok(store)
    }

    /// The already-open store for `identifier`, if any.
    pub fn get(&self, identifier: impl AsRef<Path>) -> StoreResult<Option<Arc<PathStore>>> {
        let key = self.key(identifier.as_ref())?;
        Ok(self.lock()?.get(&key).cloned())
    }

    /// Drop the registry's handle. Outstanding `Arc`s stay usable.
    pub fn close(&self, identifier: impl AsRef<Path>) -> StoreResult<bool> {
        let key = self.key(identifier.as_ref())?;
        Ok(self.lock()?.remove(&key).is_some())
    }

    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.lock()?.is_empty())
    }

    fn key(&self, identifier: &Path) -> StoreResult<PathBuf> {
        let normalized = self.config.normalize_identifier(identifier);
        Ok(std::path::absolute(normalized)?)
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, HashMap<PathBuf, Arc<PathStore>>>> {
        self.stores.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pathstore_types::NdArray;

    #[test]
    fn suffix_and_bare_name_share_a_store() {
        let dir = tempfile::tempdir().unwrap();
        let registry = StoreRegistry::new();

        let a = registry.open(dir.path().join("test_db")).unwrap();
        let b = registry.open(dir.path().join("test_db.db")).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len().unwrap(), 1);

        a.save_array("x", &NdArray::from_vec(vec![1i32]), false).unwrap();
        assert!(b.contains("x").unwrap());
    }

    #[test]
    fn distinct_files_get_distinct_stores() {
        let dir = tempfile::tempdir().unwrap();
        let registry = StoreRegistry::new();
        let a = registry.open(dir.path().join("one")).unwrap();
        let b = registry.open(dir.path().join("two")).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len().unwrap(), 2);
    }

    #[test]
    fn close_forgets_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let registry = StoreRegistry::new();
        assert!(registry.is_empty().unwrap());

        let path = dir.path().join("runs");
        let first = registry.open(&path).unwrap();
        first.save_array("x", &NdArray::from_vec(vec![1u8]), false).unwrap();
        assert!(registry.get(&path).unwrap().is_some());

        assert!(registry.close(&path).unwrap());
        assert!(!registry.close(&path).unwrap());
        assert!(registry.get(&path).unwrap().is_none());
        drop(first);

        let reopened = registry.open(&path).unwrap();
        assert!(reopened.contains("x").unwrap());
    }

    #[test]
    fn registry_config_is_applied() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig {
            separator: "/".into(),
            file_suffix: ".sqlite".into(),
            ..StoreConfig::default()
        };
        let registry = StoreRegistry::with_config(config).unwrap();
        let store = registry.open(dir.path().join("data")).unwrap();
        assert!(store.identifier().unwrap().ends_with("data.sqlite"));
        store.save_array("a/b", &NdArray::from_vec(vec![0.5f32]), false).unwrap();
        assert!(store.contains("a/b").unwrap());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = StoreConfig {
            separator: String::new(),
            ..StoreConfig::default()
        };
        assert!(matches!(
            StoreRegistry::with_config(config),
            Err(StoreError::Config(_))
        ));
    }
}
