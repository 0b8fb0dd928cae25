//! Errors raised by the type catalog

use thiserror::Error;

use crate::field_type::FieldType;

/// Mismatch between a declared field type and what was supplied
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FieldTypeError {
    /// Numeric type code outside the catalog
    #[error("Unknown field type code {code}: valid codes are 0-6")]
    UnknownCode { code: u8 },

    /// Type name that matches neither a canonical name nor an alias
    #[error("Unknown field type name '{name}'")]
    UnknownName { name: String },

    /// Value variant does not match the declared type
    #[error("Field '{field}' expects {expected}, got {found}")]
    Mismatch {
        field: String,
        expected: FieldType,
        found: FieldType,
    },

    /// Byte blob supplied for a string field is not valid UTF-8
    #[error("Field '{field}' expects {expected}, got bytes that are not valid UTF-8")]
    NotUtf8 { field: String, expected: FieldType },
}

impl FieldTypeError {
    pub fn unknown_code(code: u8) -> Self {
        Self::UnknownCode { code }
    }

    pub fn mismatch(field: impl Into<String>, expected: FieldType, found: FieldType) -> Self {
        Self::Mismatch {
            field: field.into(),
            expected,
            found,
        }
    }
}
