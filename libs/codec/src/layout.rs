//! # Wire Layout
//!
//! Offset plan shared by the encoder, the decoder and the framer.
//!
//! ```text
//! ┌────────┬────────────────┬──────────────┬───────────────┬──────────────────────────┐
//! │ id (1) │ ext id (4)     │ length (4)   │ static fields │ dynamic: len(4) + bytes  │
//! │ 0-254  │ if id byte=FF  │ if dynamic   │ layout order  │ layout order, repeated   │
//! └────────┴────────────────┴──────────────┴───────────────┴──────────────────────────┘
//! ```
//!
//! The length field counts from its own first byte to the end of the record,
//! so `record_len = header_width + length`.

use byteorder::{BigEndian, ByteOrder};
use strand_types::LENGTH_PREFIX_WIDTH;

use crate::error::{CodecError, CodecResult};
use crate::schema::{EventDefinition, EXTENDED_ID_MARKER};

/// Width of the extended header: marker byte plus big-endian u32 id
pub const EXTENDED_HEADER_WIDTH: usize = 5;

/// Sizing summary for one event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompiledLayout {
    /// 1 for compact ids, 5 for extended ids
    pub header_width: usize,
    /// Sum of static field widths
    pub static_field_width: usize,
    /// Number of length-prefixed fields
    pub dynamic_field_count: usize,
    /// True when the event has no dynamic fields
    pub is_fixed_size: bool,
    /// Bytes present in every record: header, length field, static fields
    /// and one prefix per dynamic field
    pub total_fixed_portion: usize,
}

impl CompiledLayout {
    pub fn for_event(event: &EventDefinition) -> Self {
        let header_width = event.header_width();
        let static_field_width = event
            .static_fields()
            .filter_map(|field| field.field_type.static_width())
            .sum();
        let dynamic_field_count = event.dynamic_fields().count();
        let is_fixed_size = dynamic_field_count == 0;
        let length_width = if is_fixed_size { 0 } else { LENGTH_PREFIX_WIDTH };

        Self {
            header_width,
            static_field_width,
            dynamic_field_count,
            is_fixed_size,
            total_fixed_portion: header_width
                + length_width
                + static_field_width
                + dynamic_field_count * LENGTH_PREFIX_WIDTH,
        }
    }

    /// Record size when it does not depend on the payload
    #[inline]
    pub fn fixed_size(&self) -> Option<usize> {
        self.is_fixed_size
            .then_some(self.header_width + self.static_field_width)
    }

    /// Offset of the first static field
    #[inline]
    pub fn static_offset(&self) -> usize {
        if self.is_fixed_size {
            self.header_width
        } else {
            self.header_width + LENGTH_PREFIX_WIDTH
        }
    }

    /// Offset of the first dynamic field's length prefix
    #[inline]
    pub fn dynamic_offset(&self) -> usize {
        self.static_offset() + self.static_field_width
    }

    /// Smallest legal value of the length field
    #[inline]
    pub fn min_declared_length(&self) -> usize {
        self.total_fixed_portion - self.header_width
    }

    /// Full record size given the value of the length field
    pub fn record_len(&self, event: &str, declared: usize) -> CodecResult<usize> {
        if declared < self.min_declared_length() {
            return Err(CodecError::invalid_length(
                event,
                declared,
                format!("layout needs at least {}", self.min_declared_length()),
            ));
        }
        Ok(self.header_width + declared)
    }

    /// Write the id header into the front of `out`
    #[inline]
    pub fn write_header(&self, id: u32, out: &mut [u8]) {
        if self.header_width == EXTENDED_HEADER_WIDTH {
            out[0] = EXTENDED_ID_MARKER;
            BigEndian::write_u32(&mut out[1..EXTENDED_HEADER_WIDTH], id);
        } else {
            out[0] = id as u8;
        }
    }
}

/// Event id as read from the front of a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub id: u32,
    pub extended: bool,
}

impl Header {
    #[inline]
    pub fn width(&self) -> usize {
        if self.extended {
            EXTENDED_HEADER_WIDTH
        } else {
            1
        }
    }
}

/// Read the id header, or `None` if `data` is too short to hold it
#[inline]
pub fn read_header(data: &[u8]) -> Option<Header> {
    match *data.first()? {
        EXTENDED_ID_MARKER => {
            if data.len() < EXTENDED_HEADER_WIDTH {
                return None;
            }
            Some(Header {
                id: BigEndian::read_u32(&data[1..EXTENDED_HEADER_WIDTH]),
                extended: true,
            })
        }
        id => Some(Header {
            id: id as u32,
            extended: false,
        }),
    }
}
