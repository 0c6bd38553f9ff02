//! Hierarchical path index for pathstore.
//!
//! Maps separator-delimited paths (`"group.sub.name"`) onto the integer row
//! ids of saved payloads.
//!
//! # Key Types
//!
//! - [`StorePath`] -- A validated, pre-split path
//! - [`PathMapper`] -- The nested segment mapping (BTreeMap-backed)
//! - [`Resolution`] -- Result of walking a path through the mapper
//! - [`Node`] -- A leaf row id or a group of further segments

pub mod error;
pub mod mapper;
pub mod path;

pub use error::{IndexError, IndexResult};
pub use mapper::{Node, PathMapper, Resolution};
pub use path::{StorePath, DEFAULT_SEPARATOR};
