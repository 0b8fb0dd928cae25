//! Schema fingerprints
//!
//! CRC32 over a canonical byte form of the event set. Two registries holding
//! the same events produce the same fingerprint regardless of the order the
//! events or their fields were defined in. Suited to cheap peer comparison,
//! not to integrity protection.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::schema::EventDefinition;

/// Opaque, comparable summary of a registry's event set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(u32);

impl Fingerprint {
    /// Fingerprint a set of events in any order
    pub fn of<'a, I>(events: I) -> Self
    where
        I: IntoIterator<Item = &'a EventDefinition>,
    {
        let mut events: Vec<&EventDefinition> = events.into_iter().collect();
        events.sort_by_key(|event| event.id());

        let mut hasher = StreamingChecksum::new();
        hasher.update(&(events.len() as u32).to_be_bytes());
        for event in events {
            hasher.update(&event.id().to_be_bytes());
            hasher.update_str(event.name());
            hasher.update(&(event.fields().len() as u32).to_be_bytes());
            for field in event.fields() {
                hasher.update_str(&field.name);
                hasher.update(&[field.field_type.code()]);
            }
        }
        Self(hasher.finalize())
    }

    #[inline]
    pub fn as_u32(&self) -> u32 {
        self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0.to_be_bytes())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Streaming CRC32 with length-delimited string input
struct StreamingChecksum {
    hasher: crc32fast::Hasher,
}

impl StreamingChecksum {
    fn new() -> Self {
        Self {
            hasher: crc32fast::Hasher::new(),
        }
    }

    fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
    }

    // length prefix keeps ("ab", "c") distinct from ("a", "bc")
    fn update_str(&mut self, s: &str) {
        self.update(&(s.len() as u32).to_be_bytes());
        self.update(s.as_bytes());
    }

    fn finalize(self) -> u32 {
        self.hasher.finalize()
    }
}
