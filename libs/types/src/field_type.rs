//! # Field Type Catalog
//!
//! ## Purpose
//!
//! The closed set of primitive field types an event may carry on the wire,
//! together with their sizing rules. Static types have a width known when the
//! schema is compiled; dynamic types are prefixed on the wire by a 4-byte
//! big-endian length.
//!
//! ```text
//! code  type         width   kind
//! 0x00  Byte         1       static (unsigned)
//! 0x01  Int16        2       static (signed)
//! 0x02  Int32        4       static (signed)
//! 0x03  Float32      4       static
//! 0x04  Float64      8       static
//! 0x05  Utf8String   4 + n   dynamic
//! 0x06  RawBytes     4 + n   dynamic
//! ```

use std::fmt;
use std::str::FromStr;

use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};

use crate::error::FieldTypeError;

/// Width of the length prefix written before every dynamic field
pub const LENGTH_PREFIX_WIDTH: usize = 4;

/// Primitive field type with a stable numeric code
#[repr(u8)]
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, TryFromPrimitive, Serialize, Deserialize,
)]
#[num_enum(error_type(name = FieldTypeError, constructor = FieldTypeError::unknown_code))]
pub enum FieldType {
    /// Unsigned 8-bit integer
    Byte = 0,
    /// Signed 16-bit integer
    Int16 = 1,
    /// Signed 32-bit integer
    Int32 = 2,
    /// IEEE-754 single precision
    Float32 = 3,
    /// IEEE-754 double precision
    Float64 = 4,
    /// UTF-8 text, length-prefixed
    Utf8String = 5,
    /// Opaque bytes, length-prefixed
    RawBytes = 6,
}

impl FieldType {
    /// Every type in code order
    pub const ALL: [FieldType; 7] = [
        FieldType::Byte,
        FieldType::Int16,
        FieldType::Int32,
        FieldType::Float32,
        FieldType::Float64,
        FieldType::Utf8String,
        FieldType::RawBytes,
    ];

    /// Fixed wire width, or `None` for length-prefixed types
    #[inline]
    pub const fn static_width(self) -> Option<usize> {
        match self {
            FieldType::Byte => Some(1),
            FieldType::Int16 => Some(2),
            FieldType::Int32 | FieldType::Float32 => Some(4),
            FieldType::Float64 => Some(8),
            FieldType::Utf8String | FieldType::RawBytes => None,
        }
    }

    #[inline]
    pub const fn is_static(self) -> bool {
        self.static_width().is_some()
    }

    #[inline]
    pub const fn is_dynamic(self) -> bool {
        !self.is_static()
    }

    #[inline]
    pub const fn code(self) -> u8 {
        self as u8
    }

    pub const fn name(self) -> &'static str {
        match self {
            FieldType::Byte => "byte",
            FieldType::Int16 => "int16",
            FieldType::Int32 => "int32",
            FieldType::Float32 => "float32",
            FieldType::Float64 => "float64",
            FieldType::Utf8String => "string",
            FieldType::RawBytes => "bytes",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FieldType {
    type Err = FieldTypeError;

    /// Accepts the canonical names plus the short aliases schemas are
    /// usually written with (`short`, `int`, `double`, `buffer`, ...).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ty = match s.to_ascii_lowercase().as_str() {
            "byte" | "u8" => FieldType::Byte,
            "short" | "int16" | "i16" => FieldType::Int16,
            "int" | "integer" | "int32" | "i32" => FieldType::Int32,
            "float" | "float32" | "f32" => FieldType::Float32,
            "double" | "number" | "float64" | "f64" => FieldType::Float64,
            "str" | "string" | "utf8" => FieldType::Utf8String,
            "buf" | "buffer" | "binary" | "bytes" => FieldType::RawBytes,
            _ => return Err(FieldTypeError::UnknownName { name: s.to_string() }),
        };
        Ok(ty)
    }
}
