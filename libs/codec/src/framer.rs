//! # Wire Framer
//!
//! ## Purpose
//!
//! Reassembles records from a byte stream delivered in arbitrary chunks.
//! Records carry no separators: the framer learns each record's length from
//! its header and layout, so it must know every event the peer can send.
//!
//! ## Processing Loop
//!
//! ```text
//! chunk → pending ─┬─ < 1 byte (or < 5 after 0xFF)        → wait
//!                  ├─ id not registered                    → UnknownPacket (halt)
//!                  ├─ dynamic, length prefix incomplete    → wait
//!                  ├─ length prefix below fixed portion    → InvalidLength (halt)
//!                  ├─ fewer bytes than the record          → wait
//!                  └─ decode → consume / reject → advance → loop
//! ```
//!
//! When nothing is pending, records are framed straight out of the incoming
//! chunk and only the incomplete tail is copied.
//!
//! ## Failure Model
//!
//! Losing a record boundary is unrecoverable: there is no sync marker to scan
//! for. Fatal errors halt the framer and every later `feed` returns
//! [`CodecError::FramingHalted`] until [`WireFramer::reset`]. A record whose
//! boundary is known but whose body does not decode (bad UTF-8, dynamic
//! lengths that do not fill it) goes to [`RecordConsumer::reject`] and framing
//! carries on with the next record.

use std::sync::Arc;

use byteorder::{BigEndian, ByteOrder};
use tracing::{trace, warn};

use crate::config::FramerConfig;
use crate::consumer::RecordConsumer;
use crate::error::{CodecError, CodecResult};
use crate::layout::read_header;
use crate::registry::Registry;

/// Stream reassembler for one inbound connection
#[derive(Debug)]
pub struct WireFramer {
    registry: Arc<Registry>,
    config: FramerConfig,
    pending: Vec<u8>,
    halted: Option<CodecError>,
    /// Stream offset of `pending[0]`
    offset: usize,
}

/// Outcome of framing one buffer
struct Drained {
    used: usize,
    emitted: usize,
    error: Option<CodecError>,
}

impl WireFramer {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self::with_config(registry, FramerConfig::default())
    }

    pub fn with_config(registry: Arc<Registry>, config: FramerConfig) -> Self {
        Self {
            registry,
            config,
            pending: Vec::new(),
            halted: None,
            offset: 0,
        }
    }

    /// Append `chunk` to the stream and emit every record it completes
    ///
    /// Returns the number of records handed to `consumer.consume`.
    pub fn feed<C>(&mut self, chunk: &[u8], consumer: &mut C) -> CodecResult<usize>
    where
        C: RecordConsumer + ?Sized,
    {
        if let Some(cause) = &self.halted {
            return Err(CodecError::FramingHalted {
                cause: cause.to_string(),
            });
        }

        let drained = if self.pending.is_empty() {
            let drained = drain(&self.registry, chunk, self.offset, consumer);
            self.pending.extend_from_slice(&chunk[drained.used..]);
            drained
        } else {
            self.pending.extend_from_slice(chunk);
            let drained = drain(&self.registry, &self.pending, self.offset, consumer);
            self.pending.drain(..drained.used);
            drained
        };
        self.offset += drained.used;

        if let Some(error) = drained.error {
            if error.is_fatal() {
                return Err(self.halt(error));
            }
            return Err(error);
        }

        if let Some(limit) = self.config.max_pending_bytes {
            if self.pending.len() > limit {
                let error = CodecError::PendingOverflow {
                    pending: self.pending.len(),
                    limit,
                };
                return Err(self.halt(error));
            }
        }

        if !self.pending.is_empty() {
            trace!(
                "Holding {} pending bytes at stream offset {}",
                self.pending.len(),
                self.offset
            );
        }
        Ok(drained.emitted)
    }

    /// Bytes received but not yet part of an emitted record
    #[inline]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    #[inline]
    pub fn is_halted(&self) -> bool {
        self.halted.is_some()
    }

    /// Drop pending bytes and clear a halt, ready for a fresh stream
    pub fn reset(&mut self) {
        self.pending.clear();
        self.halted = None;
        self.offset = 0;
    }

    #[inline]
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    #[inline]
    pub fn config(&self) -> &FramerConfig {
        &self.config
    }

    fn halt(&mut self, error: CodecError) -> CodecError {
        warn!("Framing halted: {}", error);
        self.halted = Some(error.clone());
        error
    }
}

/// Frame and emit every complete record at the front of `buf`
fn drain<C>(registry: &Registry, buf: &[u8], base: usize, consumer: &mut C) -> Drained
where
    C: RecordConsumer + ?Sized,
{
    let mut used = 0;
    let mut emitted = 0;

    loop {
        let rest = &buf[used..];
        let Some(header) = read_header(rest) else {
            break;
        };

        let Some(codec) = registry.codec_for_header(header) else {
            return Drained {
                used,
                emitted,
                error: Some(CodecError::UnknownPacket {
                    id: header.id,
                    offset: base + used,
                }),
            };
        };

        let layout = codec.layout();
        let len = match layout.fixed_size() {
            Some(size) => size,
            None => {
                let prefix_end = layout.static_offset();
                if rest.len() < prefix_end {
                    trace!("Waiting for length prefix of '{}'", codec.name());
                    break;
                }
                let declared = BigEndian::read_u32(&rest[layout.header_width..prefix_end]);
                match layout.record_len(codec.name(), declared as usize) {
                    Ok(len) => len,
                    Err(error) => {
                        return Drained {
                            used,
                            emitted,
                            error: Some(error),
                        }
                    }
                }
            }
        };

        if rest.len() < len {
            trace!(
                "Waiting for '{}': have {} of {} bytes",
                codec.name(),
                rest.len(),
                len
            );
            break;
        }

        match codec.decode(&rest[..len]) {
            Ok((record, _)) => {
                if let Err(error) = consumer.consume(codec.name(), record) {
                    return Drained {
                        used: used + len,
                        emitted,
                        error: Some(error),
                    };
                }
                emitted += 1;
            }
            Err(error) => consumer.reject(error),
        }
        used += len;
    }

    Drained {
        used,
        emitted,
        error: None,
    }
}
