use std::fmt;

use pathstore_table::RecordKind;
use pathstore_types::{DType, RowId};
use serde::Serialize;

/// A save that was declined because the path is already mapped.
///
/// Non-fatal: the stored payload is left unchanged. Pass `force` to
/// overwrite it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathExistsWarning {
    pub path: String,
    pub id: RowId,
}

impl fmt::Display for PathExistsWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "path {} already exists (row {}); save with force to overwrite it",
            self.path, self.id
        )
    }
}

/// What a save did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SaveOutcome {
    /// A new path was mapped to a freshly assigned row.
    Inserted(RowId),
    /// An existing row was overwritten in place.
    Updated(RowId),
    /// Nothing was written.
    Declined(PathExistsWarning),
}

impl SaveOutcome {
    /// Returns `true` if the payload was written.
    pub fn is_written(&self) -> bool {
        !matches!(self, Self::Declined(_))
    }

    /// The row the path maps to, whether or not it was written.
    pub fn row_id(&self) -> RowId {
        match self {
            Self::Inserted(id) | Self::Updated(id) => *id,
            Self::Declined(warning) => warning.id,
        }
    }

    pub fn warning(&self) -> Option<&PathExistsWarning> {
        match self {
            Self::Declined(warning) => Some(warning),
            _ => None,
        }
    }
}

/// Metadata of one saved record, read without decoding the value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RecordInfo {
    pub path: String,
    pub id: RowId,
    pub kind: RecordKind,
    /// Payload size in bytes.
    pub size: u64,
    /// Shape descriptor for arrays, annotation for objects.
    pub annotation: String,
    /// Element type for arrays whose payload header decodes.
    pub dtype: Option<DType>,
}

/// Counts describing a store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    /// Last assigned row id, `-1` for a fresh store.
    pub last_row_id: i64,
    pub mapped_paths: usize,
    pub array_rows: u64,
    pub object_rows: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_accessors() {
        let inserted = SaveOutcome::Inserted(RowId::new(0));
        assert!(inserted.is_written());
        assert_eq!(inserted.row_id(), RowId::new(0));
        assert!(inserted.warning().is_none());

        let declined = SaveOutcome::Declined(PathExistsWarning {
            path: "a.b".into(),
            id: RowId::new(4),
        });
        assert!(!declined.is_written());
        assert_eq!(declined.row_id(), RowId::new(4));
        assert_eq!(declined.warning().unwrap().path, "a.b");
    }

    #[test]
    fn warning_names_the_path() {
        let warning = PathExistsWarning {
            path: "test.test_npy1.1".into(),
            id: RowId::new(0),
        };
        assert!(warning.to_string().contains("test.test_npy1.1"));
        assert!(warning.to_string().contains("force"));
    }
}
