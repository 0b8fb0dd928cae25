//! # Codec Compiler
//!
//! ## Purpose
//!
//! Turns one [`EventDefinition`] into a [`CompiledCodec`]: a flat table with
//! one slot per field, each static slot holding its absolute offset and a
//! read/write function pointer chosen once from the field type. Encoding and
//! decoding then walk the table; nothing branches on the field type per call.
//!
//! ## Encode Path
//!
//! ```text
//! measure dynamic fields → one allocation → header → length → statics → dynamics
//! ```
//!
//! Static-only events skip the measuring pass and allocate
//! `header_width + static_field_width` bytes directly. Floats are written
//! through `to_bits`, so NaN payloads and infinities survive bit-exactly.
//!
//! ## Decode Path
//!
//! Statics are read at fixed offsets; dynamics are read by advancing a cursor
//! over `(length, bytes)` pairs. The decoder reads exactly one record from the
//! front of the buffer and reports how many bytes it used.

use byteorder::{BigEndian, ByteOrder};
use strand_types::{FieldType, FieldTypeError, Record, Value, LENGTH_PREFIX_WIDTH};

use crate::error::{CodecError, CodecResult};
use crate::layout::CompiledLayout;
use crate::schema::EventDefinition;

/// Largest dynamic field the 4-byte length prefix can describe
pub const MAX_DYNAMIC_FIELD_LEN: usize = u32::MAX as usize;

/// Writes one static value; `Err` carries the type actually supplied
type WriteFn = fn(&mut [u8], &Value, bool) -> Result<(), FieldType>;

/// Reads one static value from a slice of exactly the field's width
type ReadFn = fn(&[u8]) -> Value;

#[derive(Debug, Clone)]
struct StaticSlot {
    name: String,
    field_type: FieldType,
    offset: usize,
    width: usize,
    write: WriteFn,
    read: ReadFn,
}

#[derive(Debug, Clone)]
struct DynamicSlot {
    name: String,
    field_type: FieldType,
}

/// Encoder/decoder pair specialised to one event's layout
#[derive(Debug, Clone)]
pub struct CompiledCodec {
    id: u32,
    name: String,
    layout: CompiledLayout,
    statics: Vec<StaticSlot>,
    dynamics: Vec<DynamicSlot>,
    typecheck: bool,
}

impl CompiledCodec {
    /// Build the slot table for `event`
    pub fn compile(event: &EventDefinition, typecheck: bool) -> Self {
        let layout = CompiledLayout::for_event(event);
        let mut statics = Vec::new();
        let mut dynamics = Vec::new();
        let mut offset = layout.static_offset();

        for field in event.fields() {
            match static_ops(field.field_type) {
                Some((width, write, read)) => {
                    statics.push(StaticSlot {
                        name: field.name.clone(),
                        field_type: field.field_type,
                        offset,
                        width,
                        write,
                        read,
                    });
                    offset += width;
                }
                None => dynamics.push(DynamicSlot {
                    name: field.name.clone(),
                    field_type: field.field_type,
                }),
            }
        }

        Self {
            id: event.id(),
            name: event.name().to_string(),
            layout,
            statics,
            dynamics,
            typecheck,
        }
    }

    #[inline]
    pub fn id(&self) -> u32 {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn layout(&self) -> &CompiledLayout {
        &self.layout
    }

    /// Exact encoded size of `record`, validating every field on the way
    pub fn encoded_len(&self, record: &Record) -> CodecResult<usize> {
        if let Some(size) = self.layout.fixed_size() {
            return Ok(size);
        }

        let mut size = self.layout.total_fixed_portion;
        for slot in &self.dynamics {
            size += self.dynamic_bytes(record, slot)?.len();
        }

        if size - self.layout.header_width > MAX_DYNAMIC_FIELD_LEN {
            return Err(CodecError::FieldTooLarge {
                event: self.name.clone(),
                field: self.dynamics.last().map(|s| s.name.clone()).unwrap_or_default(),
                size,
                limit: MAX_DYNAMIC_FIELD_LEN,
            });
        }
        Ok(size)
    }

    /// Encode `record` into a freshly allocated buffer of its exact size
    pub fn encode(&self, record: &Record) -> CodecResult<Vec<u8>> {
        let size = self.encoded_len(record)?;
        let mut buf = vec![0u8; size];
        let layout = &self.layout;

        layout.write_header(self.id, &mut buf);
        if !layout.is_fixed_size {
            BigEndian::write_u32(
                &mut buf[layout.header_width..layout.static_offset()],
                (size - layout.header_width) as u32,
            );
        }

        for slot in &self.statics {
            let value = self.value(record, &slot.name, slot.field_type)?;
            (slot.write)(
                &mut buf[slot.offset..slot.offset + slot.width],
                value,
                self.typecheck,
            )
            .map_err(|found| {
                CodecError::field_type(
                    &self.name,
                    FieldTypeError::mismatch(&slot.name, slot.field_type, found),
                )
            })?;
        }

        let mut cursor = layout.dynamic_offset();
        for slot in &self.dynamics {
            let bytes = self.dynamic_bytes(record, slot)?;
            BigEndian::write_u32(
                &mut buf[cursor..cursor + LENGTH_PREFIX_WIDTH],
                bytes.len() as u32,
            );
            cursor += LENGTH_PREFIX_WIDTH;
            buf[cursor..cursor + bytes.len()].copy_from_slice(bytes);
            cursor += bytes.len();
        }

        debug_assert_eq!(cursor, size);
        Ok(buf)
    }

    /// Decode one record from the front of `data`
    ///
    /// Returns the record and the number of bytes it occupied. The id header
    /// is assumed to have been matched to this codec by the caller.
    pub fn decode(&self, data: &[u8]) -> CodecResult<(Record, usize)> {
        let layout = &self.layout;
        let len = match layout.fixed_size() {
            Some(size) => size,
            None => {
                let prefix_end = layout.static_offset();
                if data.len() < prefix_end {
                    return Err(CodecError::truncated(
                        &self.name,
                        layout.total_fixed_portion,
                        data.len(),
                    ));
                }
                let declared = BigEndian::read_u32(&data[layout.header_width..prefix_end]);
                layout.record_len(&self.name, declared as usize)?
            }
        };

        if data.len() < len {
            return Err(CodecError::truncated(&self.name, len, data.len()));
        }
        let data = &data[..len];

        let mut record = Record::new();
        for slot in &self.statics {
            let value = (slot.read)(&data[slot.offset..slot.offset + slot.width]);
            record.insert(slot.name.clone(), value);
        }

        let mut cursor = layout.dynamic_offset();
        for slot in &self.dynamics {
            if cursor + LENGTH_PREFIX_WIDTH > len {
                return Err(CodecError::malformed(
                    &self.name,
                    format!("length prefix of '{}' runs past record end {}", slot.name, len),
                ));
            }
            let field_len =
                BigEndian::read_u32(&data[cursor..cursor + LENGTH_PREFIX_WIDTH]) as usize;
            cursor += LENGTH_PREFIX_WIDTH;

            let end = cursor
                .checked_add(field_len)
                .filter(|&end| end <= len)
                .ok_or_else(|| {
                    CodecError::malformed(
                        &self.name,
                        format!(
                            "field '{}' declares {} bytes at offset {}, record ends at {}",
                            slot.name, field_len, cursor, len
                        ),
                    )
                })?;

            let bytes = &data[cursor..end];
            let value = match slot.field_type {
                FieldType::Utf8String => {
                    Value::Str(String::from_utf8(bytes.to_vec()).map_err(|e| {
                        CodecError::InvalidUtf8 {
                            event: self.name.clone(),
                            field: slot.name.clone(),
                            valid_up_to: e.utf8_error().valid_up_to(),
                        }
                    })?)
                }
                _ => Value::Bytes(bytes.to_vec()),
            };
            record.insert(slot.name.clone(), value);
            cursor = end;
        }

        if cursor != len {
            return Err(CodecError::malformed(
                &self.name,
                format!("fields end at {} but record length is {}", cursor, len),
            ));
        }

        Ok((record, len))
    }

    #[inline]
    fn value<'r>(
        &self,
        record: &'r Record,
        field: &str,
        expected: FieldType,
    ) -> CodecResult<&'r Value> {
        record.get(field).ok_or_else(|| CodecError::MissingField {
            event: self.name.clone(),
            field: field.to_string(),
            expected,
        })
    }

    fn dynamic_bytes<'r>(&self, record: &'r Record, slot: &DynamicSlot) -> CodecResult<&'r [u8]> {
        let value = self.value(record, &slot.name, slot.field_type)?;
        let bytes = match (slot.field_type, value) {
            (FieldType::Utf8String, Value::Str(s)) => s.as_bytes(),
            (FieldType::RawBytes, Value::Bytes(b)) => b.as_slice(),
            (FieldType::RawBytes, Value::Str(s)) if !self.typecheck => s.as_bytes(),
            (FieldType::Utf8String, Value::Bytes(b)) if !self.typecheck => {
                if std::str::from_utf8(b).is_err() {
                    return Err(CodecError::field_type(
                        &self.name,
                        FieldTypeError::NotUtf8 {
                            field: slot.name.clone(),
                            expected: slot.field_type,
                        },
                    ));
                }
                b.as_slice()
            }
            (expected, other) => {
                return Err(CodecError::field_type(
                    &self.name,
                    FieldTypeError::mismatch(&slot.name, expected, other.field_type()),
                ))
            }
        };

        if bytes.len() > MAX_DYNAMIC_FIELD_LEN {
            return Err(CodecError::FieldTooLarge {
                event: self.name.clone(),
                field: slot.name.clone(),
                size: bytes.len(),
                limit: MAX_DYNAMIC_FIELD_LEN,
            });
        }
        Ok(bytes)
    }
}

/// Width and accessors for a static type; `None` for dynamic types
fn static_ops(field_type: FieldType) -> Option<(usize, WriteFn, ReadFn)> {
    let ops = match field_type {
        FieldType::Byte => (1, write_byte as WriteFn, read_byte as ReadFn),
        FieldType::Int16 => (2, write_i16 as WriteFn, read_i16 as ReadFn),
        FieldType::Int32 => (4, write_i32 as WriteFn, read_i32 as ReadFn),
        FieldType::Float32 => (4, write_f32 as WriteFn, read_f32 as ReadFn),
        FieldType::Float64 => (8, write_f64 as WriteFn, read_f64 as ReadFn),
        FieldType::Utf8String | FieldType::RawBytes => return None,
    };
    debug_assert_eq!(field_type.static_width(), Some(ops.0));
    Some(ops)
}

/// Numeric fallback when type checking is off; casts saturate
#[inline]
fn relaxed(value: &Value, typecheck: bool) -> Result<f64, FieldType> {
    if typecheck {
        return Err(value.field_type());
    }
    value.as_f64_lossy().ok_or_else(|| value.field_type())
}

fn write_byte(out: &mut [u8], value: &Value, typecheck: bool) -> Result<(), FieldType> {
    out[0] = match *value {
        Value::Byte(v) => v,
        _ => relaxed(value, typecheck)? as u8,
    };
    Ok(())
}

fn write_i16(out: &mut [u8], value: &Value, typecheck: bool) -> Result<(), FieldType> {
    let v = match *value {
        Value::Int16(v) => v,
        _ => relaxed(value, typecheck)? as i16,
    };
    BigEndian::write_i16(out, v);
    Ok(())
}

fn write_i32(out: &mut [u8], value: &Value, typecheck: bool) -> Result<(), FieldType> {
    let v = match *value {
        Value::Int32(v) => v,
        _ => relaxed(value, typecheck)? as i32,
    };
    BigEndian::write_i32(out, v);
    Ok(())
}

fn write_f32(out: &mut [u8], value: &Value, typecheck: bool) -> Result<(), FieldType> {
    let v = match *value {
        Value::Float32(v) => v,
        _ => relaxed(value, typecheck)? as f32,
    };
    BigEndian::write_u32(out, v.to_bits());
    Ok(())
}

fn write_f64(out: &mut [u8], value: &Value, typecheck: bool) -> Result<(), FieldType> {
    let v = match *value {
        Value::Float64(v) => v,
        _ => relaxed(value, typecheck)?,
    };
    BigEndian::write_u64(out, v.to_bits());
    Ok(())
}

fn read_byte(data: &[u8]) -> Value {
    Value::Byte(data[0])
}

fn read_i16(data: &[u8]) -> Value {
    Value::Int16(BigEndian::read_i16(data))
}

fn read_i32(data: &[u8]) -> Value {
    Value::Int32(BigEndian::read_i32(data))
}

fn read_f32(data: &[u8]) -> Value {
    Value::Float32(f32::from_bits(BigEndian::read_u32(data)))
}

fn read_f64(data: &[u8]) -> Value {
    Value::Float64(f64::from_bits(BigEndian::read_u64(data)))
}
