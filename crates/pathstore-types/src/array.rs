//! Row-major n-dimensional arrays.
//!
//! [`NdArray`] is deliberately small: a [`Shape`] plus a flat element
//! vector. It carries exactly what the store needs to persist and restore an
//! array (element type, dimensions, values) and nothing more.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Element type tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DType {
    Bool,
    U8,
    I32,
    I64,
    F32,
    F64,
}

impl DType {
    /// Conventional dtype name (`"float64"`, `"int32"`, ...).
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::U8 => "uint8",
            Self::I32 => "int32",
            Self::I64 => "int64",
            Self::F32 => "float32",
            Self::F64 => "float64",
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A primitive type that can be stored in an [`NdArray`].
pub trait Element:
    Copy + PartialEq + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Tag written next to serialized data of this type.
    const DTYPE: DType;
}

macro_rules! impl_element {
    ($($ty:ty => $dtype:ident),* $(,)?) => {
        $(impl Element for $ty {
            const DTYPE: DType = DType::$dtype;
        })*
    };
}

impl_element! {
    bool => Bool,
    u8 => U8,
    i32 => I32,
    i64 => I64,
    f32 => F32,
    f64 => F64,
}

// ---------------------------------------------------------------------------
// Shape
// ---------------------------------------------------------------------------

/// Array dimensions, outermost first. An empty shape is a scalar.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shape(Vec<usize>);

impl Shape {
    pub fn new(dims: Vec<usize>) -> Self {
        Self(dims)
    }

    /// Shape of a scalar (zero dimensions, one element).
    pub fn scalar() -> Self {
        Self(Vec::new())
    }

    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    /// Number of dimensions.
    pub fn ndim(&self) -> usize {
        self.0.len()
    }

    /// Number of elements an array of this shape holds.
    ///
    /// Returns `None` if the product overflows `usize`.
    pub fn element_count(&self) -> Option<usize> {
        self.0.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
    }

    /// Tuple-style descriptor stored in the `shape` column.
    ///
    /// `()` for a scalar, `(5,)` for one dimension, `(10, 10)` otherwise.
    pub fn descriptor(&self) -> String {
        match self.0.as_slice() {
            [] => "()".to_string(),
            [single] => format!("({single},)"),
            dims => {
                let parts: Vec<String> = dims.iter().map(|d| d.to_string()).collect();
                format!("({})", parts.join(", "))
            }
        }
    }

    /// Parse a descriptor produced by [`Shape::descriptor`].
    ///
    /// A single dimension without the trailing comma (`(5)`) is accepted.
    pub fn parse_descriptor(text: &str) -> Result<Self, TypeError> {
        let invalid = || TypeError::InvalidShape(text.to_string());
        let inner = text
            .trim()
            .strip_prefix('(')
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(invalid)?
            .trim();

        if inner.is_empty() {
            return Ok(Self::scalar());
        }

        let inner = inner.strip_suffix(',').unwrap_or(inner);
        let dims = inner
            .split(',')
            .map(|part| part.trim().parse::<usize>().map_err(|_| invalid()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self(dims))
    }

    /// Row-major flat offset of a multi-index, or `None` when out of bounds.
    pub fn offset_of(&self, index: &[usize]) -> Option<usize> {
        if index.len() != self.0.len() {
            return None;
        }
        let mut offset = 0usize;
        for (&i, &dim) in index.iter().zip(&self.0) {
            if i >= dim {
                return None;
            }
            offset = offset * dim + i;
        }
        Some(offset)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.descriptor())
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Self(dims)
    }
}

impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Self(dims.to_vec())
    }
}

impl<const N: usize> From<[usize; N]> for Shape {
    fn from(dims: [usize; N]) -> Self {
        Self(dims.to_vec())
    }
}

// ---------------------------------------------------------------------------
// NdArray
// ---------------------------------------------------------------------------

/// A dense, row-major n-dimensional array.
///
/// The element count always equals the product of the shape's dimensions.
#[derive(Clone, Debug, PartialEq)]
pub struct NdArray<T: Element> {
    shape: Shape,
    data: Vec<T>,
}

impl<T: Element> NdArray<T> {
    /// Build an array from a shape and row-major data.
    pub fn new(shape: impl Into<Shape>, data: Vec<T>) -> Result<Self, TypeError> {
        let shape = shape.into();
        let expected = shape
            .element_count()
            .ok_or_else(|| TypeError::InvalidShape(shape.descriptor()))?;
        if expected != data.len() {
            return Err(TypeError::ShapeMismatch {
                shape: shape.descriptor(),
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { shape, data })
    }

    /// One-dimensional array over `data`.
    pub fn from_vec(data: Vec<T>) -> Self {
        Self {
            shape: Shape::new(vec![data.len()]),
            data,
        }
    }

    /// Zero-dimensional array holding one value.
    pub fn scalar(value: T) -> Self {
        Self {
            shape: Shape::scalar(),
            data: vec![value],
        }
    }

    /// Build an array by calling `f` with each flat row-major offset.
    pub fn from_fn(
        shape: impl Into<Shape>,
        f: impl FnMut(usize) -> T,
    ) -> Result<Self, TypeError> {
        let shape = shape.into();
        let count = shape
            .element_count()
            .ok_or_else(|| TypeError::InvalidShape(shape.descriptor()))?;
        let data = (0..count).map(f).collect();
        Ok(Self { shape, data })
    }

    /// Array of the given shape filled with `T::default()`.
    pub fn zeros(shape: impl Into<Shape>) -> Result<Self, TypeError>
    where
        T: Default,
    {
        Self::from_fn(shape, |_| T::default())
    }

    pub fn dtype(&self) -> DType {
        T::DTYPE
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn ndim(&self) -> usize {
        self.shape.ndim()
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Elements in row-major order.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// Element at a multi-index.
    pub fn get(&self, index: &[usize]) -> Option<&T> {
        self.shape.offset_of(index).map(|offset| &self.data[offset])
    }

    pub fn get_mut(&mut self, index: &[usize]) -> Option<&mut T> {
        let offset = self.shape.offset_of(index)?;
        self.data.get_mut(offset)
    }

    /// Reinterpret the data under a new shape with the same element count.
    pub fn reshape(self, shape: impl Into<Shape>) -> Result<Self, TypeError> {
        Self::new(shape, self.data)
    }
}
