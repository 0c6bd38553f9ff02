use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use pathstore_index::DEFAULT_SEPARATOR;
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Settings shared by every store opened through one registry.
///
/// Loadable from TOML; absent keys take their defaults:
///
/// ```toml
/// separator = "."
/// file_suffix = ".db"
/// busy_timeout_ms = 5000
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Separator used by the path-string operations.
    pub separator: String,
    /// Suffix appended to store identifiers that lack it.
    pub file_suffix: String,
    /// How long SQLite waits on a locked database file.
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR.to_string(),
            file_suffix: ".db".to_string(),
            busy_timeout_ms: 5_000,
        }
    }
}

impl StoreConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> StoreResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| StoreError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> StoreResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> StoreResult<()> {
        if self.separator.is_empty() {
            return Err(StoreError::Config("separator must not be empty".into()));
        }
        if self.file_suffix.is_empty() {
            return Err(StoreError::Config("file_suffix must not be empty".into()));
        }
        Ok(())
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Append the file suffix to `identifier` unless it already ends with it.
    pub fn normalize_identifier(&self, identifier: impl AsRef<Path>) -> PathBuf {
        let identifier = identifier.as_ref();
        if identifier.to_string_lossy().ends_with(&self.file_suffix) {
            return identifier.to_path_buf();
        }
        let mut name = OsString::from(identifier.as_os_str());
        name.push(&self.file_suffix);
        PathBuf::from(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = StoreConfig::default();
        assert_eq!(c.separator, ".");
        assert_eq!(c.file_suffix, ".db");
        assert_eq!(c.busy_timeout(), Duration::from_secs(5));
        c.validate().unwrap();
    }

    #[test]
    fn normalize_appends_missing_suffix() {
        let c = StoreConfig::default();
        assert_eq!(c.normalize_identifier("runs/test_db"), PathBuf::from("runs/test_db.db"));
        assert_eq!(c.normalize_identifier("runs/test_db.db"), PathBuf::from("runs/test_db.db"));
        assert_eq!(c.normalize_identifier("data.sqlite"), PathBuf::from("data.sqlite.db"));
    }

    #[test]
    fn toml_partial_document_keeps_defaults() {
        let c = StoreConfig::from_toml_str("separator = \"/\"\n").unwrap();
        assert_eq!(c.separator, "/");
        assert_eq!(c.file_suffix, ".db");
    }

    #[test]
    fn toml_rejects_empty_separator() {
        let err = StoreConfig::from_toml_str("separator = \"\"\n").unwrap_err();
        assert!(matches!(err, StoreError::Config(_)));
    }

    #[test]
    fn toml_rejects_wrong_types() {
        let err = StoreConfig::from_toml_str("busy_timeout_ms = \"soon\"\n").unwrap_err();
        assert!(matches!(err, StoreError::Config(_)));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pathstore.toml");
        std::fs::write(&path, "file_suffix = \".sqlite\"\nbusy_timeout_ms = 250\n").unwrap();
        let c = StoreConfig::load(&path).unwrap();
        assert_eq!(c.file_suffix, ".sqlite");
        assert_eq!(c.busy_timeout(), Duration::from_millis(250));
    }
}
