//! Runtime field values

use serde::{Deserialize, Serialize};

use crate::field_type::FieldType;

/// A single field value as held in a [`Record`](crate::Record)
///
/// Float variants compare by bit pattern, so `NaN == NaN` and `0.0 != -0.0`.
/// Decoding reproduces the exact bits that were encoded, and equality
/// follows the same rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    Byte(u8),
    Int16(i16),
    Int32(i32),
    Float32(f32),
    Float64(f64),
    Str(String),
    Bytes(Vec<u8>),
}

impl Value {
    /// The catalog type this value naturally encodes as
    pub const fn field_type(&self) -> FieldType {
        match self {
            Value::Byte(_) => FieldType::Byte,
            Value::Int16(_) => FieldType::Int16,
            Value::Int32(_) => FieldType::Int32,
            Value::Float32(_) => FieldType::Float32,
            Value::Float64(_) => FieldType::Float64,
            Value::Str(_) => FieldType::Utf8String,
            Value::Bytes(_) => FieldType::RawBytes,
        }
    }

    /// Numeric view used when type checking is relaxed
    ///
    /// Every static variant fits an `f64` exactly.
    #[inline]
    pub fn as_f64_lossy(&self) -> Option<f64> {
        match *self {
            Value::Byte(v) => Some(v as f64),
            Value::Int16(v) => Some(v as f64),
            Value::Int32(v) => Some(v as f64),
            Value::Float32(v) => Some(v as f64),
            Value::Float64(v) => Some(v),
            Value::Str(_) | Value::Bytes(_) => None,
        }
    }

    /// Raw content of a dynamic value (UTF-8 bytes for strings)
    #[inline]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Str(s) => Some(s.as_bytes()),
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Byte(a), Value::Byte(b)) => a == b,
            (Value::Int16(a), Value::Int16(b)) => a == b,
            (Value::Int32(a), Value::Int32(b)) => a == b,
            (Value::Float32(a), Value::Float32(b)) => a.to_bits() == b.to_bits(),
            (Value::Float64(a), Value::Float64(b)) => a.to_bits() == b.to_bits(),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                #[inline]
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

impl_from! {
    u8 => Byte,
    i16 => Int16,
    i32 => Int32,
    f32 => Float32,
    f64 => Float64,
    String => Str,
    Vec<u8> => Bytes,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(v.to_vec())
    }
}
