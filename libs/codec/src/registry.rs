//! # Schema Registry
//!
//! ## Purpose
//!
//! Holds every event a protocol understands and the codecs compiled for
//! them. Lookups by id and by name are O(1): compact ids index a 255-slot
//! table, extended ids and names go through hash maps.
//!
//! ## Lifecycle
//!
//! ```text
//! define() … define() → compile_all() / first encode or decode → serve
//!        mutable              codecs cached, registry frozen      &self only
//! ```
//!
//! Codecs compile lazily into a `OnceCell` the first time an event is
//! encoded or decoded, or eagerly through [`Registry::compile_all`]. The
//! first compilation freezes the registry: later `define` calls fail with
//! [`SchemaError::Frozen`], so a layout a peer may already be using can never
//! shift underneath it.
//!
//! ## Thread Safety
//!
//! `Registry` is `Send + Sync`. Share it behind an `Arc` once defined; all
//! encode/decode paths take `&self` and the codec cache tolerates concurrent
//! first use.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use once_cell::sync::OnceCell;
use strand_types::{FieldType, Record};
use tracing::debug;

use crate::compiler::CompiledCodec;
use crate::config::{RegistryConfig, MAX_COMPACT_EVENTS};
use crate::error::{CodecError, CodecResult, SchemaError, SchemaResult};
use crate::fingerprint::Fingerprint;
use crate::layout::{read_header, Header};
use crate::schema::{EventDefinition, MAX_COMPACT_ID};

#[derive(Debug, Clone)]
struct EventEntry {
    definition: EventDefinition,
    codec: OnceCell<CompiledCodec>,
}

/// One record decoded from the front of a buffer
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedRecord<'a> {
    pub event: &'a EventDefinition,
    pub record: Record,
    /// Bytes the record occupied on the wire
    pub len: usize,
}

/// Event definitions plus their compiled codecs
#[derive(Debug)]
pub struct Registry {
    config: RegistryConfig,
    entries: Vec<EventEntry>,
    compact: Vec<Option<usize>>,
    extended: HashMap<u32, usize>,
    by_name: HashMap<String, usize>,
    compact_count: usize,
    frozen: AtomicBool,
    fingerprint: OnceCell<Fingerprint>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Registry {
    /// Clones share nothing but keep compiled codecs and the frozen state
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            entries: self.entries.clone(),
            compact: self.compact.clone(),
            extended: self.extended.clone(),
            by_name: self.by_name.clone(),
            compact_count: self.compact_count,
            frozen: AtomicBool::new(self.is_frozen()),
            fingerprint: self.fingerprint.clone(),
        }
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            config,
            entries: Vec::new(),
            compact: vec![None; MAX_COMPACT_EVENTS],
            extended: HashMap::new(),
            by_name: HashMap::new(),
            compact_count: 0,
            frozen: AtomicBool::new(false),
            fingerprint: OnceCell::new(),
        }
    }

    #[inline]
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Register an event
    ///
    /// `fields` is an unordered name → type mapping; wire order is derived
    /// from it (see [`EventDefinition::new`]). On error the registry is left
    /// exactly as it was.
    pub fn define<I, S>(&mut self, id: u32, name: impl Into<String>, fields: I) -> SchemaResult<()>
    where
        I: IntoIterator<Item = (S, FieldType)>,
        S: Into<String>,
    {
        let name = name.into();
        if self.is_frozen() {
            return Err(SchemaError::Frozen { name });
        }

        let definition = EventDefinition::new(id, name, fields)?;

        if let Some(existing) = self.lookup_by_id(id) {
            return Err(SchemaError::DuplicateId {
                id,
                existing: existing.name().to_string(),
            });
        }
        if let Some(existing) = self.lookup_by_name(definition.name()) {
            return Err(SchemaError::DuplicateName {
                name: definition.name().to_string(),
                existing_id: existing.id(),
            });
        }
        let compact = id <= MAX_COMPACT_ID;
        if compact && self.compact_count >= self.config.max_compact_events {
            return Err(SchemaError::TooManyEvents {
                limit: self.config.max_compact_events,
            });
        }

        debug!(
            "Defined event '{}' (id {}, {} fields, {})",
            definition.name(),
            id,
            definition.fields().len(),
            if compact { "compact" } else { "extended" }
        );

        let index = self.entries.len();
        if compact {
            self.compact[id as usize] = Some(index);
            self.compact_count += 1;
        } else {
            self.extended.insert(id, index);
        }
        self.by_name.insert(definition.name().to_string(), index);
        self.entries.push(EventEntry {
            definition,
            codec: OnceCell::new(),
        });
        self.fingerprint = OnceCell::new();
        Ok(())
    }

    pub fn lookup_by_id(&self, id: u32) -> Option<&EventDefinition> {
        self.index_by_id(id).map(|index| &self.entries[index].definition)
    }

    pub fn lookup_by_name(&self, name: &str) -> Option<&EventDefinition> {
        self.by_name
            .get(name)
            .map(|&index| &self.entries[index].definition)
    }

    /// Compiled codec for `id`, compiling on first use
    pub fn codec_by_id(&self, id: u32) -> Option<&CompiledCodec> {
        self.index_by_id(id).map(|index| self.codec_at(index))
    }

    /// Compiled codec for `name`, compiling on first use
    pub fn codec_by_name(&self, name: &str) -> Option<&CompiledCodec> {
        self.by_name.get(name).map(|&index| self.codec_at(index))
    }

    /// Codec matching a wire header
    ///
    /// A compact header only resolves compact ids and an extended header
    /// only resolves extended ids, so `FF 00 00 00 05` never aliases id 5.
    pub fn codec_for_header(&self, header: Header) -> Option<&CompiledCodec> {
        if header.extended != (header.id > MAX_COMPACT_ID) {
            return None;
        }
        self.codec_by_id(header.id)
    }

    /// Compile every codec now instead of on first use
    pub fn compile_all(&self) -> usize {
        for index in 0..self.entries.len() {
            self.codec_at(index);
        }
        debug!("Compiled {} event codecs", self.entries.len());
        self.entries.len()
    }

    /// Encode `record` as event `name`
    pub fn encode(&self, name: &str, record: &Record) -> CodecResult<Vec<u8>> {
        self.codec_by_name(name)
            .ok_or_else(|| CodecError::unknown_event(name))?
            .encode(record)
    }

    /// Decode the record at the front of `data`, returning its event name
    pub fn decode(&self, data: &[u8]) -> CodecResult<(&str, Record)> {
        let decoded = self.decode_prefix(data)?;
        Ok((decoded.event.name(), decoded.record))
    }

    /// Decode the record at the front of `data`, reporting its wire size
    pub fn decode_prefix(&self, data: &[u8]) -> CodecResult<DecodedRecord<'_>> {
        let header = read_header(data).ok_or_else(|| {
            let need = if data.is_empty() { 1 } else { 5 };
            CodecError::truncated("<header>", need, data.len())
        })?;
        let codec = self
            .codec_for_header(header)
            .ok_or(CodecError::UnknownPacket {
                id: header.id,
                offset: 0,
            })?;
        let (record, len) = codec.decode(data)?;
        Ok(DecodedRecord {
            event: self.lookup_by_id(header.id).ok_or(CodecError::UnknownPacket {
                id: header.id,
                offset: 0,
            })?,
            record,
            len,
        })
    }

    /// Encode then decode, for checking a schema against sample records
    pub fn reconstruct(&self, name: &str, record: &Record) -> CodecResult<(&str, Record)> {
        let bytes = self.encode(name, record)?;
        self.decode(&bytes)
    }

    /// Summary of the event set, memoized until the next `define`
    pub fn fingerprint(&self) -> Fingerprint {
        *self
            .fingerprint
            .get_or_init(|| Fingerprint::of(self.entries.iter().map(|entry| &entry.definition)))
    }

    /// Events in id order
    pub fn events(&self) -> Vec<&EventDefinition> {
        let mut events: Vec<_> = self.entries.iter().map(|entry| &entry.definition).collect();
        events.sort_by_key(|event| event.id());
        events
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True once any codec has been compiled
    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::Acquire)
    }

    #[inline]
    fn index_by_id(&self, id: u32) -> Option<usize> {
        if id <= MAX_COMPACT_ID {
            self.compact[id as usize]
        } else {
            self.extended.get(&id).copied()
        }
    }

    fn codec_at(&self, index: usize) -> &CompiledCodec {
        let entry = &self.entries[index];
        entry.codec.get_or_init(|| {
            self.frozen.store(true, Ordering::Release);
            let codec = CompiledCodec::compile(&entry.definition, self.config.typecheck);
            let layout = codec.layout();
            debug!(
                "Compiled codec '{}': header {}B, static {}B, {} dynamic, fixed={}",
                codec.name(),
                layout.header_width,
                layout.static_field_width,
                layout.dynamic_field_count,
                layout.is_fixed_size
            );
            codec
        })
    }
}
