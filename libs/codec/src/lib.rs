//! # Strand Codec - Schema-Driven Binary Record Protocol
//!
//! ## Purpose
//!
//! Encodes named records into compact, self-delimiting binary frames and
//! reassembles them from arbitrarily chunked streams. Both peers define the
//! same events (an id, a name and typed fields); the wire then carries no
//! field names, type tags or separators.
//!
//! ## Architecture Role
//!
//! ```text
//! libs/types → [codec] → transport (sockets, pipes, files)
//!     ↑           ↓              ↓
//! FieldType   Registry         Sink
//! Value       Compiler         RecordConsumer
//! Record      Framer/Channel
//! ```
//!
//! ## What This Crate Contains
//! - **Registry**: event definitions, O(1) lookup by id and name, schema fingerprint
//! - **CompiledCodec**: per-event layout and function-pointer encode/decode table
//! - **WireFramer**: chunk reassembly with halt-on-desync semantics
//! - **ProtocolChannel**: duplex endpoint routing records to handlers
//! - **Sink / RecordConsumer**: outbound and inbound seams, with mpsc impls
//!
//! ## What This Crate Does NOT Contain
//! - Socket management or connection handling
//! - Schema negotiation between peers (compare fingerprints instead)
//! - Versioning or migration of event layouts
//!
//! ## Wire Format
//!
//! Big-endian throughout. A one-byte id for ids 0-254, or `0xFF` followed by
//! a u32 id. Events with any string/bytes field then carry a u32 length
//! counted from that field to the end of the record. Static fields follow in
//! name order, then each dynamic field as `(u32 length, bytes)`.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use strand_codec::{FieldType, ProtocolChannel, Record, Registry};
//!
//! let mut registry = Registry::new();
//! registry.define(0, "ping", vec![("id", FieldType::Int32)]).unwrap();
//! let registry = Arc::new(registry);
//!
//! let bytes = registry.encode("ping", &Record::new().with("id", 42i32)).unwrap();
//! assert_eq!(bytes, [0x00, 0x00, 0x00, 0x00, 0x2A]);
//!
//! let mut channel = ProtocolChannel::new(registry, Vec::<u8>::new(), Vec::<(String, Record)>::new());
//! channel.receive(&bytes).unwrap();
//! assert_eq!(channel.consumer()[0].0, "ping");
//! ```

pub mod channel;
pub mod compiler;
pub mod config;
pub mod consumer;
pub mod error;
pub mod fingerprint;
pub mod framer;
pub mod layout;
pub mod registry;
pub mod schema;
pub mod sink;

pub use channel::ProtocolChannel;
pub use compiler::{CompiledCodec, MAX_DYNAMIC_FIELD_LEN};
pub use config::{CodecConfig, FramerConfig, RegistryConfig, MAX_COMPACT_EVENTS};
pub use consumer::RecordConsumer;
pub use error::{CodecError, CodecResult, SchemaError, SchemaResult};
pub use fingerprint::Fingerprint;
pub use framer::WireFramer;
pub use layout::{read_header, CompiledLayout, Header, EXTENDED_HEADER_WIDTH};
pub use registry::{DecodedRecord, Registry};
pub use schema::{
    EventDefinition, FieldDefinition, EXTENDED_ID_MARKER, MAX_COMPACT_ID, RESERVED_EVENT_NAMES,
};
pub use sink::Sink;

// Types crate re-exported so callers need a single dependency
pub use strand_types::{FieldType, FieldTypeError, Record, Value, LENGTH_PREFIX_WIDTH};
