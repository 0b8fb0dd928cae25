//! # Codec Configuration
//!
//! Tunables for schema registration and stream framing. Defaults match the
//! wire format's own limits; presets and environment overrides cover the
//! usual deployment differences.

use serde::{Deserialize, Serialize};

/// Largest number of events addressable with a one-byte header
pub const MAX_COMPACT_EVENTS: usize = 255;

/// Aggregate configuration for a registry and the framers reading from it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecConfig {
    pub registry: RegistryConfig,
    pub framer: FramerConfig,
}

/// Schema registry behaviour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Reject record values whose variant differs from the declared type
    pub typecheck: bool,

    /// Ceiling on events with ids 0-254
    pub max_compact_events: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            typecheck: true,
            max_compact_events: MAX_COMPACT_EVENTS,
        }
    }
}

/// Stream reassembly behaviour
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FramerConfig {
    /// Maximum bytes held while waiting for a record to complete
    ///
    /// `None` waits indefinitely, which trusts the peer's length prefixes.
    pub max_pending_bytes: Option<usize>,
}

impl CodecConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("STRAND_TYPECHECK") {
            if let Ok(flag) = val.parse() {
                config.registry.typecheck = flag;
            }
        }

        if let Ok(val) = std::env::var("STRAND_MAX_COMPACT_EVENTS") {
            if let Ok(limit) = val.parse::<usize>() {
                config.registry.max_compact_events = limit.min(MAX_COMPACT_EVENTS);
            }
        }

        if let Ok(val) = std::env::var("STRAND_MAX_PENDING_BYTES") {
            if let Ok(limit) = val.parse() {
                config.framer.max_pending_bytes = Some(limit);
            }
        }

        config
    }

    /// Type checking on and a bounded pending buffer (16 MiB)
    pub fn strict() -> Self {
        Self {
            registry: RegistryConfig::default(),
            framer: FramerConfig {
                max_pending_bytes: Some(16 * 1024 * 1024),
            },
        }
    }

    /// Numeric values are converted between types instead of rejected
    pub fn permissive() -> Self {
        Self {
            registry: RegistryConfig {
                typecheck: false,
                max_compact_events: MAX_COMPACT_EVENTS,
            },
            framer: FramerConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CodecConfig::default();
        assert!(config.registry.typecheck);
        assert_eq!(config.registry.max_compact_events, 255);
        assert_eq!(config.framer.max_pending_bytes, None);
    }

    #[test]
    fn test_presets() {
        assert!(CodecConfig::strict().framer.max_pending_bytes.is_some());
        assert!(!CodecConfig::permissive().registry.typecheck);
    }

    #[test]
    fn test_serde_round_trip() {
        let config = CodecConfig::strict();
        let json = serde_json::to_string(&config).unwrap();
        let back: CodecConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
