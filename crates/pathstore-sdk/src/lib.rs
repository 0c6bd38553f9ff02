//! High-level API for pathstore.
//!
//! Arrays and serializable objects are saved and loaded by hierarchical,
//! separator-delimited paths such as `experiment.run1.loss`. Payloads live in
//! a single SQLite file; the path index and id counter are kept alongside
//! them in a `config` table.
//!
//! ```no_run
//! use pathstore_sdk::{NdArray, PathStore};
//!
//! let store = PathStore::open("results")?;
//! let grid = NdArray::<f64>::zeros([10, 10])?;
//! store.save_array("test.test_npy1.1", &grid, false)?;
//! let back: NdArray<f64> = store.load_array("test.test_npy1.1")?;
//! assert_eq!(back, grid);
//! # Ok::<(), pathstore_sdk::StoreError>(())
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod outcome;
pub mod registry;
pub mod store;

pub use codec::{AnyArray, ArrayPayload, CodecError};
pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use outcome::{PathExistsWarning, RecordInfo, SaveOutcome, StoreStats};
pub use registry::StoreRegistry;
pub use store::PathStore;

// Re-export key types
pub use pathstore_index::{StorePath, DEFAULT_SEPARATOR};
pub use pathstore_table::{RecordKind, TableStore};
pub use pathstore_types::{DType, Element, NdArray, RowId, Shape};
