//! Payload encodings for the `ndarray` and `object` tables.
//!
//! Arrays are stored as an [`ArrayPayload`]: a dtype tag, the shape, and the
//! bincode-encoded element vector. The tag is checked before the elements
//! are decoded, so loading with the wrong element type fails cleanly and
//! tools can describe an array without knowing its Rust type.
//!
//! Objects are the bincode encoding of the value itself.

use pathstore_types::{DType, Element, NdArray, Shape, TypeError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("encode failed: {0}")]
    Encode(String),

    #[error("decode failed: {0}")]
    Decode(String),

    #[error("stored dtype is {stored}, requested {requested}")]
    DTypeMismatch { stored: DType, requested: DType },

    #[error("payload shape {payload} disagrees with shape column {column:?}")]
    ShapeColumnMismatch { payload: String, column: String },

    #[error(transparent)]
    Shape(#[from] TypeError),
}

/// Serialized form of an array.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrayPayload {
    pub dtype: DType,
    pub shape: Shape,
    /// bincode-encoded `Vec<T>` for the tagged element type.
    pub data: Vec<u8>,
}

impl ArrayPayload {
    pub fn from_array<T: Element>(array: &NdArray<T>) -> Result<Self, CodecError> {
        let data =
            bincode::serialize(array.as_slice()).map_err(|e| CodecError::Encode(e.to_string()))?;
        Ok(Self {
            dtype: T::DTYPE,
            shape: array.shape().clone(),
            data,
        })
    }

    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        bincode::serialize(self).map_err(|e| CodecError::Encode(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        bincode::deserialize(bytes).map_err(|e| CodecError::Decode(e.to_string()))
    }

    /// Decode the elements as `T`, which must match the stored dtype.
    pub fn into_array<T: Element>(self) -> Result<NdArray<T>, CodecError> {
        if self.dtype != T::DTYPE {
            return Err(CodecError::DTypeMismatch {
                stored: self.dtype,
                requested: T::DTYPE,
            });
        }
        let data: Vec<T> =
            bincode::deserialize(&self.data).map_err(|e| CodecError::Decode(e.to_string()))?;
        Ok(NdArray::new(self.shape, data)?)
    }

    /// Decode the elements as whatever type the tag names.
    pub fn into_any(self) -> Result<AnyArray, CodecError> {
        Ok(match self.dtype {
            DType::Bool => AnyArray::Bool(self.into_array()?),
            DType::U8 => AnyArray::U8(self.into_array()?),
            DType::I32 => AnyArray::I32(self.into_array()?),
            DType::I64 => AnyArray::I64(self.into_array()?),
            DType::F32 => AnyArray::F32(self.into_array()?),
            DType::F64 => AnyArray::F64(self.into_array()?),
        })
    }

    /// Check the payload's shape against the text stored in the `shape` column.
    pub fn check_shape_column(&self, column: &str) -> Result<(), CodecError> {
        match Shape::parse_descriptor(column) {
            Ok(shape) if shape == self.shape => Ok(()),
            _ => Err(CodecError::ShapeColumnMismatch {
                payload: self.shape.descriptor(),
                column: column.to_string(),
            }),
        }
    }
}

/// An array of any supported element type.
#[derive(Clone, Debug, PartialEq)]
pub enum AnyArray {
    Bool(NdArray<bool>),
    U8(NdArray<u8>),
    I32(NdArray<i32>),
    I64(NdArray<i64>),
    F32(NdArray<f32>),
    F64(NdArray<f64>),
}

impl AnyArray {
    pub fn dtype(&self) -> DType {
        match self {
            Self::Bool(a) => a.dtype(),
            Self::U8(a) => a.dtype(),
            Self::I32(a) => a.dtype(),
            Self::I64(a) => a.dtype(),
            Self::F32(a) => a.dtype(),
            Self::F64(a) => a.dtype(),
        }
    }

    pub fn shape(&self) -> &Shape {
        match self {
            Self::Bool(a) => a.shape(),
            Self::U8(a) => a.shape(),
            Self::I32(a) => a.shape(),
            Self::I64(a) => a.shape(),
            Self::F32(a) => a.shape(),
            Self::F64(a) => a.shape(),
        }
    }

    /// Elements rendered with `Debug`, in row-major order.
    pub fn elements_as_strings(&self) -> Vec<String> {
        fn render<T: Element>(a: &NdArray<T>) -> Vec<String> {
            a.as_slice().iter().map(|v| format!("{v:?}")).collect()
        }
        match self {
            Self::Bool(a) => render(a),
            Self::U8(a) => render(a),
            Self::I32(a) => render(a),
            Self::I64(a) => render(a),
            Self::F32(a) => render(a),
            Self::F64(a) => render(a),
        }
    }
}

pub fn encode_array<T: Element>(array: &NdArray<T>) -> Result<Vec<u8>, CodecError> {
    ArrayPayload::from_array(array)?.encode()
}

pub fn decode_array<T: Element>(bytes: &[u8]) -> Result<NdArray<T>, CodecError> {
    ArrayPayload::decode(bytes)?.into_array()
}

pub fn encode_object<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CodecError> {
    bincode::serialize(value).map_err(|e| CodecError::Encode(e.to_string()))
}

pub fn decode_object<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    bincode::deserialize(bytes).map_err(|e| CodecError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn array_roundtrip_keeps_shape_and_values() {
        let a = NdArray::from_fn([3, 4], |i| i as f64 * 0.5).unwrap();
        let bytes = encode_array(&a).unwrap();
        let back: NdArray<f64> = decode_array(&bytes).unwrap();
        assert_eq!(back, a);
    }

    #[test]
    fn wrong_element_type_is_rejected() {
        let bytes = encode_array(&NdArray::from_vec(vec![1i32, 2, 3])).unwrap();
        let err = decode_array::<f64>(&bytes).unwrap_err();
        assert_eq!(
            err,
            CodecError::DTypeMismatch {
                stored: DType::I32,
                requested: DType::F64
            }
        );
    }

    #[test]
    fn truncated_payload_is_a_decode_error() {
        let bytes = encode_array(&NdArray::from_vec(vec![1u8; 16])).unwrap();
        let err = decode_array::<u8>(&bytes[..bytes.len() - 4]).unwrap_err();
        assert!(matches!(err, CodecError::Decode(_)));
    }

    #[test]
    fn payload_with_inconsistent_shape_is_rejected() {
        let mut payload = ArrayPayload::from_array(&NdArray::from_vec(vec![1i64, 2, 3])).unwrap();
        payload.shape = Shape::from([2, 2]);
        let err = payload.into_array::<i64>().unwrap_err();
        assert!(matches!(err, CodecError::Shape(TypeError::ShapeMismatch { .. })));
    }

    #[test]
    fn any_array_follows_tag() {
        let bytes = encode_array(&NdArray::new([2], vec![true, false]).unwrap()).unwrap();
        let any = ArrayPayload::decode(&bytes).unwrap().into_any().unwrap();
        assert_eq!(any.dtype(), DType::Bool);
        assert_eq!(any.shape(), &Shape::from([2]));
        assert_eq!(any.elements_as_strings(), vec!["true", "false"]);
    }

    #[test]
    fn shape_column_check() {
        let payload = ArrayPayload::from_array(&NdArray::<f32>::zeros([10, 10]).unwrap()).unwrap();
        payload.check_shape_column("(10, 10)").unwrap();
        payload.check_shape_column("(10,10)").unwrap();
        assert!(payload.check_shape_column("(100,)").is_err());
        assert!(payload.check_shape_column("garbage").is_err());
    }

    #[test]
    fn object_roundtrip() {
        let mut value = BTreeMap::new();
        value.insert("test".to_string(), vec![1, 2, 3]);
        value.insert("test2".to_string(), vec![]);
        let bytes = encode_object(&value).unwrap();
        let back: BTreeMap<String, Vec<i32>> = decode_object(&bytes).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn object_garbage_is_a_decode_error() {
        let err = decode_object::<String>(&[0xff; 3]).unwrap_err();
        assert!(matches!(err, CodecError::Decode(_)));
    }
}
