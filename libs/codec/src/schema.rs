//! # Event Definitions
//!
//! An event is a numeric id, a name, and a set of typed fields. Callers hand
//! fields over as an unordered name → type mapping; the definition fixes the
//! wire order as *static fields first, dynamic fields last, each group sorted
//! by name*. Two processes registering the same mapping therefore agree on
//! the layout no matter how they built the mapping.
//!
//! ```text
//! {name: Str, id: Int32, data: Bytes, x: Float64}
//!            ↓ sort by name, stable-partition static/dynamic
//! [id: Int32, x: Float64 | data: Bytes, name: Str]
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use strand_types::FieldType;

use crate::error::{SchemaError, SchemaResult};

/// Largest id that still fits the one-byte header
pub const MAX_COMPACT_ID: u32 = 0xFE;

/// Header byte announcing a 4-byte extended id
pub const EXTENDED_ID_MARKER: u8 = 0xFF;

/// Event names used by the channel's own control surface
pub const RESERVED_EVENT_NAMES: &[&str] =
    &["close", "data", "drain", "end", "error", "pipe", "newListener"];

static EVENT_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[0-9a-z_-]+$").expect("event name pattern is valid")
});

static FIELD_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[a-z_][0-9a-z_]*$").expect("field name pattern is valid")
});

/// One named, typed field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }
}

/// A validated event with fields in wire order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDefinition {
    id: u32,
    name: String,
    fields: Vec<FieldDefinition>,
}

impl EventDefinition {
    /// Validate names and compute the wire order of `fields`
    ///
    /// Id and name uniqueness are the registry's concern; everything that
    /// can be checked from this one event alone is checked here.
    pub fn new<I, S>(id: u32, name: impl Into<String>, fields: I) -> SchemaResult<Self>
    where
        I: IntoIterator<Item = (S, FieldType)>,
        S: Into<String>,
    {
        let name = name.into();
        validate_event_name(&name)?;

        let mut fields: Vec<FieldDefinition> = fields
            .into_iter()
            .map(|(field, ty)| FieldDefinition::new(field, ty))
            .collect();

        for field in &fields {
            if !FIELD_NAME.is_match(&field.name) {
                return Err(SchemaError::invalid_field(
                    &name,
                    &field.name,
                    "must match [a-z_][0-9a-z_]*",
                ));
            }
        }

        fields.sort_by(|a, b| a.name.cmp(&b.name));
        if let Some(pair) = fields.windows(2).find(|pair| pair[0].name == pair[1].name) {
            return Err(SchemaError::invalid_field(
                &name,
                &pair[0].name,
                "defined more than once",
            ));
        }

        // sort_by_key is stable, so name order survives within each group
        fields.sort_by_key(|field| field.field_type.is_dynamic());

        Ok(Self { id, name, fields })
    }

    #[inline]
    pub fn id(&self) -> u32 {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields in wire order
    #[inline]
    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|field| field.name == name)
    }

    #[inline]
    pub fn is_extended(&self) -> bool {
        self.id > MAX_COMPACT_ID
    }

    /// Bytes taken by the id header: 1 compact, 5 extended
    #[inline]
    pub fn header_width(&self) -> usize {
        if self.is_extended() {
            5
        } else {
            1
        }
    }

    pub fn static_fields(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.fields.iter().filter(|field| field.field_type.is_static())
    }

    pub fn dynamic_fields(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.fields.iter().filter(|field| field.field_type.is_dynamic())
    }

    pub fn has_dynamic_fields(&self) -> bool {
        self.dynamic_fields().next().is_some()
    }
}

fn validate_event_name(name: &str) -> SchemaResult<()> {
    if !EVENT_NAME.is_match(name) {
        return Err(SchemaError::invalid_name(name, "must match [0-9a-z_-]+"));
    }
    if RESERVED_EVENT_NAMES.contains(&name) {
        return Err(SchemaError::invalid_name(name, "reserved for channel control"));
    }
    Ok(())
}
