//! Schema and codec errors
//!
//! Two families: [`SchemaError`] is raised synchronously while events are
//! being defined and always leaves the registry untouched; [`CodecError`]
//! covers encoding, decoding, framing and channel delivery. Each variant
//! carries enough context to identify the event and field involved.

use strand_types::{FieldType, FieldTypeError};
use thiserror::Error;

/// Rejections from [`Registry::define`](crate::Registry::define)
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// Event id is already taken by another event
    #[error("Event id {id} is already defined as '{existing}'")]
    DuplicateId { id: u32, existing: String },

    /// Event name is already taken by another event
    #[error("Event name '{name}' is already defined with id {existing_id}")]
    DuplicateName { name: String, existing_id: u32 },

    /// Event name fails the name pattern or is a reserved token
    #[error("Invalid event name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// Field name fails the field pattern or repeats within the event
    #[error("Invalid field '{field}' in event '{event}': {reason}")]
    InvalidField {
        event: String,
        field: String,
        reason: String,
    },

    /// Compact id table is full
    #[error("Too many compact events: limit is {limit} (use an id >= 255 for extended events)")]
    TooManyEvents { limit: usize },

    /// Registry already has compiled codecs and no longer accepts definitions
    #[error("Registry is frozen: cannot define '{name}' after codecs have been compiled")]
    Frozen { name: String },
}

impl SchemaError {
    pub fn invalid_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_field(
        event: impl Into<String>,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidField {
            event: event.into(),
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Errors from encoding, decoding, framing and delivery
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Record value does not match the declared field type
    #[error("Type mismatch in event '{event}': {source}")]
    FieldType {
        event: String,
        #[source]
        source: FieldTypeError,
    },

    /// Record is missing a field the event declares
    #[error("Event '{event}' requires field '{field}' ({expected})")]
    MissingField {
        event: String,
        field: String,
        expected: FieldType,
    },

    /// Dynamic value does not fit a 4-byte length prefix
    #[error("Field '{field}' in event '{event}' is {size} bytes, limit is {limit}")]
    FieldTooLarge {
        event: String,
        field: String,
        size: usize,
        limit: usize,
    },

    /// Outbound event name is not registered
    #[error("Unknown event '{name}'")]
    UnknownEvent { name: String },

    /// Inbound header names no registered event; framing cannot continue
    #[error("Unknown packet id {id} at stream offset {offset}: record length cannot be determined")]
    UnknownPacket { id: u32, offset: usize },

    /// Buffer ends before the layout does
    #[error("Truncated record for event '{event}': need {need} bytes, got {got}")]
    Truncated {
        event: String,
        need: usize,
        got: usize,
    },

    /// Declared record length disagrees with the layout
    #[error("Invalid record length for event '{event}': declared {declared}, {reason}")]
    InvalidLength {
        event: String,
        declared: usize,
        reason: String,
    },

    /// Record boundary is known but its dynamic fields do not fill it exactly
    #[error("Malformed record for event '{event}': {reason}")]
    Malformed { event: String, reason: String },

    /// String field bytes are not valid UTF-8
    #[error("Field '{field}' in event '{event}' is not valid UTF-8 at byte {valid_up_to}")]
    InvalidUtf8 {
        event: String,
        field: String,
        valid_up_to: usize,
    },

    /// Pending buffer grew past the configured ceiling
    #[error("Pending buffer overflow: {pending} bytes exceeds limit {limit}")]
    PendingOverflow { pending: usize, limit: usize },

    /// Framer was halted by an earlier fatal error
    #[error("Framing halted by an earlier error: {cause}")]
    FramingHalted { cause: String },

    /// Outbound sink can no longer accept bytes
    #[error("Sink closed: {reason}")]
    SinkClosed { reason: String },

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl CodecError {
    pub fn field_type(event: impl Into<String>, source: FieldTypeError) -> Self {
        Self::FieldType {
            event: event.into(),
            source,
        }
    }

    pub fn unknown_event(name: impl Into<String>) -> Self {
        Self::UnknownEvent { name: name.into() }
    }

    pub fn truncated(event: impl Into<String>, need: usize, got: usize) -> Self {
        Self::Truncated {
            event: event.into(),
            need,
            got,
        }
    }

    pub fn invalid_length(
        event: impl Into<String>,
        declared: usize,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidLength {
            event: event.into(),
            declared,
            reason: reason.into(),
        }
    }

    pub fn malformed(event: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            event: event.into(),
            reason: reason.into(),
        }
    }

    pub fn sink_closed(reason: impl Into<String>) -> Self {
        Self::SinkClosed {
            reason: reason.into(),
        }
    }

    /// Whether the error ends framing of the stream it came from
    ///
    /// Once a record boundary is lost there is no marker to resynchronise
    /// on, so everything after it is unreadable.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CodecError::UnknownPacket { .. }
                | CodecError::InvalidLength { .. }
                | CodecError::PendingOverflow { .. }
                | CodecError::FramingHalted { .. }
        )
    }
}

/// Result type for schema definition
pub type SchemaResult<T> = std::result::Result<T, SchemaError>;

/// Result type for codec operations
pub type CodecResult<T> = std::result::Result<T, CodecError>;
