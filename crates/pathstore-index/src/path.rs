//! Store path parsing.
//!
//! A store path is a non-empty string of non-empty segments joined by a
//! separator (`.` unless the caller picks another):
//! - `"test.test_npy1.1"` has three segments
//! - `""`, `"a..b"`, `".a"` and `"a."` are rejected
//!
//! Segment text is otherwise unrestricted.

use std::fmt;

use crate::error::{IndexError, IndexResult};

/// Separator used when the caller does not choose one.
pub const DEFAULT_SEPARATOR: &str = ".";

/// A validated, pre-split store path.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StorePath {
    raw: String,
    separator: String,
    segments: Vec<String>,
}

impl StorePath {
    /// Split `raw` on `separator` and validate the segments.
    ///
    /// # Examples
    ///
    /// ```
    /// use pathstore_index::StorePath;
    ///
    /// let path = StorePath::parse("test.test_npy1.1", ".").unwrap();
    /// assert_eq!(path.depth(), 3);
    /// assert!(StorePath::parse("", ".").is_err());
    /// assert!(StorePath::parse("a/b", "/").is_ok());
    /// ```
    pub fn parse(raw: &str, separator: &str) -> IndexResult<Self> {
        if separator.is_empty() {
            return Err(IndexError::EmptySeparator);
        }
        if raw.is_empty() {
            return Err(IndexError::InvalidPath {
                path: raw.to_string(),
                reason: "path must not be empty".into(),
            });
        }

        let segments: Vec<String> = raw.split(separator).map(str::to_string).collect();
        if let Some(position) = segments.iter().position(String::is_empty) {
            return Err(IndexError::InvalidPath {
                path: raw.to_string(),
                reason: format!("segment {position} is empty"),
            });
        }

        Ok(Self {
            raw: raw.to_string(),
            separator: separator.to_string(),
            segments,
        })
    }

    /// Parse with [`DEFAULT_SEPARATOR`].
    pub fn parse_default(raw: &str) -> IndexResult<Self> {
        Self::parse(raw, DEFAULT_SEPARATOR)
    }

    /// Build a path from already-split segments.
    ///
    /// The display form joins them with [`DEFAULT_SEPARATOR`].
    pub fn from_segments<I, S>(segments: I) -> IndexResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        let raw = segments.join(DEFAULT_SEPARATOR);
        if segments.is_empty() || segments.iter().any(String::is_empty) {
            return Err(IndexError::InvalidPath {
                path: raw,
                reason: "segments must be non-empty".into(),
            });
        }
        Ok(Self {
            raw,
            separator: DEFAULT_SEPARATOR.to_string(),
            segments,
        })
    }

    /// The path as the caller wrote it.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The separator the path was split on.
    pub fn separator(&self) -> &str {
        &self.separator
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of segments; always at least one.
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// The first `len` segments joined with the path's own separator.
    pub fn prefix(&self, len: usize) -> String {
        self.segments[..len.min(self.segments.len())].join(&self.separator)
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
