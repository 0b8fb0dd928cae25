//! # Strand Types
//!
//! Pure data structures shared by the Strand codec: the field type catalog,
//! runtime field values, and the named-field records events carry.
//!
//! ## Architecture Role
//!
//! ```text
//! libs/types → libs/codec → transport (external)
//!     ↑            ↓
//! FieldType    Registry / Compiler
//! Value        Framer / Channel
//! Record
//! ```
//!
//! Nothing here knows about wire layout; sizing rules live on
//! [`FieldType`] only as far as the static/dynamic split requires.
//!
//! ## Quick Start
//!
//! ```rust
//! use strand_types::{FieldType, Record};
//!
//! let record = Record::new().with("id", 42i32).with("name", "probe");
//! assert_eq!(record.get_i32("id"), Some(42));
//! assert_eq!("int".parse::<FieldType>().unwrap(), FieldType::Int32);
//! ```

pub mod error;
pub mod field_type;
pub mod record;
pub mod value;

pub use error::FieldTypeError;
pub use field_type::{FieldType, LENGTH_PREFIX_WIDTH};
pub use record::Record;
pub use value::Value;
