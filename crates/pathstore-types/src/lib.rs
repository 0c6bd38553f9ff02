//! Foundation types for pathstore.
//!
//! This crate provides the identifier and payload types shared by every
//! other pathstore crate.
//!
//! # Key Types
//!
//! - [`RowId`] — Integer key of a payload row in the `ndarray` or `object` table
//! - [`IdCounter`] — The persisted last-assigned row id; next id is `last + 1`
//! - [`NdArray`] — Row-major n-dimensional array of a primitive [`Element`]
//! - [`Shape`] — Array dimensions and their tuple-style text descriptor
//! - [`DType`] — Element type tag carried alongside serialized arrays

pub mod array;
pub mod error;
pub mod row;

pub use array::{DType, Element, NdArray, Shape};
pub use error::TypeError;
pub use row::{IdCounter, RowId};
