//! Stream framing integration tests
//!
//! Feeds encoded streams to the framer in every chunking that matters:
//! single bytes, every cut point, many records per chunk, random splits.

use std::sync::Arc;

use proptest::prelude::*;
use strand_codec::{
    CodecError, FieldType, FramerConfig, Record, RecordConsumer, Registry, WireFramer,
};

fn registry() -> Arc<Registry> {
    let mut registry = Registry::new();
    registry
        .define(0, "ping", vec![("id", FieldType::Int32)])
        .unwrap();
    registry
        .define(
            1,
            "chunk",
            vec![("id", FieldType::Int32), ("data", FieldType::RawBytes)],
        )
        .unwrap();
    registry
        .define(
            300,
            "say",
            vec![
                ("from", FieldType::Utf8String),
                ("text", FieldType::Utf8String),
                ("volume", FieldType::Float32),
            ],
        )
        .unwrap();
    Arc::new(registry)
}

fn sample_stream(registry: &Registry) -> (Vec<u8>, Vec<(String, Record)>) {
    let records = vec![
        ("ping".to_string(), Record::new().with("id", 1i32)),
        (
            "chunk".to_string(),
            Record::new().with("id", 2i32).with("data", vec![9u8; 17]),
        ),
        (
            "say".to_string(),
            Record::new()
                .with("from", "alice")
                .with("text", "hello there")
                .with("volume", 0.5f32),
        ),
        ("ping".to_string(), Record::new().with("id", -1i32)),
    ];
    let mut stream = Vec::new();
    for (event, record) in &records {
        stream.extend(registry.encode(event, record).unwrap());
    }
    (stream, records)
}

#[test]
fn test_every_cut_point() {
    let registry = registry();
    let record = Record::new()
        .with("from", "bob")
        .with("text", "split me anywhere")
        .with("volume", 1.0f32);
    let bytes = registry.encode("say", &record).unwrap();

    for cut in 0..=bytes.len() {
        let mut framer = WireFramer::new(Arc::clone(&registry));
        let mut out: Vec<(String, Record)> = Vec::new();

        let first = framer.feed(&bytes[..cut], &mut out).unwrap();
        let second = framer.feed(&bytes[cut..], &mut out).unwrap();

        assert_eq!(first + second, 1, "cut at {}", cut);
        assert_eq!(out, vec![("say".to_string(), record.clone())]);
        assert_eq!(framer.pending_len(), 0);
    }
}

#[test]
fn test_every_pair_of_cut_points() {
    let registry = registry();
    let record = Record::new().with("id", 77i32).with("data", vec![1u8, 2, 3]);
    let bytes = registry.encode("chunk", &record).unwrap();

    for a in 0..=bytes.len() {
        for b in a..=bytes.len() {
            let mut framer = WireFramer::new(Arc::clone(&registry));
            let mut out: Vec<(String, Record)> = Vec::new();
            for piece in [&bytes[..a], &bytes[a..b], &bytes[b..]] {
                framer.feed(piece, &mut out).unwrap();
            }
            assert_eq!(out.len(), 1, "cuts at {} and {}", a, b);
            assert_eq!(out[0].1, record);
        }
    }
}

#[test]
fn test_many_records_in_one_chunk() {
    let registry = registry();
    let (stream, expected) = sample_stream(&registry);

    let mut framer = WireFramer::new(Arc::clone(&registry));
    let mut out: Vec<(String, Record)> = Vec::new();
    assert_eq!(framer.feed(&stream, &mut out).unwrap(), expected.len());
    assert_eq!(out, expected);
}

#[test]
fn test_one_byte_at_a_time() {
    let registry = registry();
    let (stream, expected) = sample_stream(&registry);

    let mut framer = WireFramer::new(Arc::clone(&registry));
    let mut out: Vec<(String, Record)> = Vec::new();
    for byte in &stream {
        framer.feed(std::slice::from_ref(byte), &mut out).unwrap();
    }
    assert_eq!(out, expected);
}

#[test]
fn test_unknown_packet_emits_nothing() {
    let registry = registry();
    let mut framer = WireFramer::new(Arc::clone(&registry));
    let mut out: Vec<(String, Record)> = Vec::new();

    let err = framer.feed(&[0x42, 0, 0, 0, 0], &mut out).unwrap_err();
    assert_eq!(err, CodecError::UnknownPacket { id: 0x42, offset: 0 });
    assert!(err.is_fatal());
    assert!(out.is_empty());
    assert!(framer.is_halted());
}

#[test]
fn test_unknown_extended_id_reports_stream_offset() {
    let registry = registry();
    let mut framer = WireFramer::new(Arc::clone(&registry));
    let mut out: Vec<(String, Record)> = Vec::new();

    let ping = registry.encode("ping", &Record::new().with("id", 1i32)).unwrap();
    framer.feed(&ping, &mut out).unwrap();
    framer.feed(&ping[..2], &mut out).unwrap();

    let mut rest = ping[2..].to_vec();
    rest.extend([0xFF, 0x00, 0x00, 0x01, 0x2D]); // id 301
    let err = framer.feed(&rest, &mut out).unwrap_err();
    assert_eq!(err, CodecError::UnknownPacket { id: 301, offset: 10 });
    assert_eq!(out.len(), 2);
}

#[test]
fn test_halted_until_reset() {
    let registry = registry();
    let mut framer = WireFramer::new(Arc::clone(&registry));
    let mut out: Vec<(String, Record)> = Vec::new();

    assert!(framer.feed(&[0x09], &mut out).is_err());
    let ping = registry.encode("ping", &Record::new().with("id", 5i32)).unwrap();
    assert!(matches!(
        framer.feed(&ping, &mut out),
        Err(CodecError::FramingHalted { .. })
    ));

    framer.reset();
    assert_eq!(framer.feed(&ping, &mut out).unwrap(), 1);
    assert_eq!(out[0].1.get_i32("id"), Some(5));
}

#[test]
fn test_rejected_record_does_not_desync() {
    #[derive(Default)]
    struct Tally {
        accepted: usize,
        rejected: usize,
    }

    impl RecordConsumer for Tally {
        fn consume(&mut self, _event: &str, _record: Record) -> strand_codec::CodecResult<()> {
            self.accepted += 1;
            Ok(())
        }

        fn reject(&mut self, _error: CodecError) {
            self.rejected += 1;
        }
    }

    let registry = registry();
    let mut say = registry
        .encode(
            "say",
            &Record::new()
                .with("from", "x")
                .with("text", "yz")
                .with("volume", 0f32),
        )
        .unwrap();
    // corrupt the last byte of "text" into a lone continuation byte
    let last = say.len() - 1;
    say[last] = 0x80;

    let ping = registry.encode("ping", &Record::new().with("id", 8i32)).unwrap();
    let mut stream = say;
    stream.extend(&ping);

    let mut framer = WireFramer::new(Arc::clone(&registry));
    let mut tally = Tally::default();
    assert_eq!(framer.feed(&stream, &mut tally).unwrap(), 1);
    assert_eq!(tally.rejected, 1);
    assert_eq!(tally.accepted, 1);
    assert!(!framer.is_halted());
}

#[test]
fn test_pending_limit() {
    let registry = registry();
    let config = FramerConfig {
        max_pending_bytes: Some(64),
    };
    let mut framer = WireFramer::with_config(Arc::clone(&registry), config);
    let mut out: Vec<(String, Record)> = Vec::new();

    let big = registry
        .encode(
            "chunk",
            &Record::new().with("id", 1i32).with("data", vec![0u8; 100]),
        )
        .unwrap();

    // whole records never count against the limit
    assert_eq!(framer.feed(&big, &mut out).unwrap(), 1);

    framer.feed(&big[..60], &mut out).unwrap();
    let err = framer.feed(&big[60..80], &mut out).unwrap_err();
    assert_eq!(
        err,
        CodecError::PendingOverflow {
            pending: 80,
            limit: 64
        }
    );
}

#[test]
fn test_consumer_error_keeps_remaining_bytes() {
    let registry = registry();
    let (stream, expected) = sample_stream(&registry);

    let mut framer = WireFramer::new(Arc::clone(&registry));
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<(String, Record)>();
    drop(rx);
    let mut closed = tx;

    let err = framer.feed(&stream, &mut closed).unwrap_err();
    assert!(matches!(err, CodecError::SinkClosed { .. }));
    assert!(!framer.is_halted());

    // first record was taken off the stream, the rest is still pending
    let first_len = registry
        .encode(&expected[0].0, &expected[0].1)
        .unwrap()
        .len();
    assert_eq!(framer.pending_len(), stream.len() - first_len);

    let mut out: Vec<(String, Record)> = Vec::new();
    assert_eq!(framer.feed(&[], &mut out).unwrap(), expected.len() - 1);
    assert_eq!(out, expected[1..].to_vec());
}

proptest! {
    #[test]
    fn prop_random_chunking(cuts in prop::collection::vec(any::<prop::sample::Index>(), 0..8)) {
        let registry = registry();
        let (stream, expected) = sample_stream(&registry);

        let mut points: Vec<usize> = cuts.iter().map(|i| i.index(stream.len() + 1)).collect();
        points.push(0);
        points.push(stream.len());
        points.sort_unstable();

        let mut framer = WireFramer::new(Arc::clone(&registry));
        let mut out: Vec<(String, Record)> = Vec::new();
        for window in points.windows(2) {
            framer.feed(&stream[window[0]..window[1]], &mut out).unwrap();
        }
        prop_assert_eq!(out, expected);
        prop_assert_eq!(framer.pending_len(), 0);
    }
}
