//! Channel integration over tokio mpsc
//!
//! Two channels share one registry; the outbound side's sink feeds the
//! inbound side's `receive`, the way a socket reader task would.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use strand_codec::{
    consumer, sink, CodecConfig, CodecError, FieldType, ProtocolChannel, Record, Registry,
};
use tokio::sync::mpsc;

fn registry() -> Arc<Registry> {
    let mut registry = Registry::with_config(CodecConfig::strict().registry);
    registry
        .define(0, "ping", vec![("id", FieldType::Int32)])
        .unwrap();
    registry
        .define(
            1,
            "message",
            vec![("id", FieldType::Int32), ("message", FieldType::Utf8String)],
        )
        .unwrap();
    registry
        .define(
            500,
            "blob",
            vec![("owner", FieldType::Byte), ("data", FieldType::RawBytes)],
        )
        .unwrap();
    Arc::new(registry)
}

#[tokio::test]
async fn test_mpsc_round_trip() {
    let registry = registry();
    let (wire_tx, mut wire_rx) = mpsc::unbounded_channel::<Vec<u8>>();
    let (record_tx, mut record_rx) = mpsc::unbounded_channel::<(String, Record)>();

    let mut outbound = ProtocolChannel::new(Arc::clone(&registry), wire_tx, Vec::<(String, Record)>::new());
    let mut inbound = ProtocolChannel::new(Arc::clone(&registry), Vec::<u8>::new(), record_tx);
    assert_eq!(outbound.compile_all(), 3);

    outbound.send("ping", &Record::new().with("id", 1i32)).unwrap();
    outbound
        .send(
            "message",
            &Record::new().with("id", 2i32).with("message", "QUANTUM LEAP"),
        )
        .unwrap();
    outbound
        .send(
            "blob",
            &Record::new().with("owner", 7u8).with("data", vec![0xABu8; 300]),
        )
        .unwrap();
    drop(outbound);

    // re-chunk the wire into 7-byte reads
    let mut wire = Vec::new();
    while let Some(frame) = wire_rx.recv().await {
        wire.extend(frame);
    }
    for piece in wire.chunks(7) {
        inbound.receive(piece).unwrap();
    }
    drop(inbound);

    let mut received = Vec::new();
    while let Some(pair) = record_rx.recv().await {
        received.push(pair);
    }

    let names: Vec<&str> = received.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, ["ping", "message", "blob"]);
    assert_eq!(received[1].1.get_str("message"), Some("QUANTUM LEAP"));
    assert_eq!(received[2].1.get_bytes("data").map(<[u8]>::len), Some(300));
}

#[tokio::test]
async fn test_closed_sink() {
    let (tx, rx) = mpsc::unbounded_channel::<Vec<u8>>();
    let mut channel = ProtocolChannel::new(registry(), tx, Vec::<(String, Record)>::new());
    drop(rx);

    let err = channel
        .send("ping", &Record::new().with("id", 1i32))
        .unwrap_err();
    assert!(matches!(err, CodecError::SinkClosed { .. }));
}

#[test]
fn test_closure_sink_and_handlers() {
    let registry = registry();
    let written = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&written);

    let mut outbound = ProtocolChannel::new(
        Arc::clone(&registry),
        sink::from_fn(move |bytes: Vec<u8>| {
            counter.fetch_add(bytes.len(), Ordering::Relaxed);
            Ok(())
        }),
        Vec::<(String, Record)>::new(),
    );
    outbound.send("ping", &Record::new().with("id", 4i32)).unwrap();
    assert_eq!(written.load(Ordering::Relaxed), 5);

    let pings = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&pings);
    let mut others = Vec::new();
    {
        let mut inbound = ProtocolChannel::new(
            Arc::clone(&registry),
            Vec::<Vec<u8>>::new(),
            consumer::from_fn(|event: &str, _record: Record| {
                others.push(event.to_string());
                Ok(())
            }),
        );
        inbound
            .on("ping", move |record| {
                assert_eq!(record.get_i32("id"), Some(4));
                seen.fetch_add(1, Ordering::Relaxed);
            })
            .unwrap();

        let mut wire = registry.encode("ping", &Record::new().with("id", 4i32)).unwrap();
        wire.extend(
            registry
                .encode("message", &Record::new().with("id", 1i32).with("message", ""))
                .unwrap(),
        );
        assert_eq!(inbound.receive(&wire).unwrap(), 2);
    }

    assert_eq!(pings.load(Ordering::Relaxed), 1);
    assert_eq!(others, vec!["message".to_string()]);
}

#[test]
fn test_halted_channel_recovers_after_reset() {
    let registry = registry();
    let mut inbound = ProtocolChannel::new(
        Arc::clone(&registry),
        Vec::<u8>::new(),
        Vec::<(String, Record)>::new(),
    );

    assert!(inbound.receive(&[0x63]).unwrap_err().is_fatal());
    assert!(inbound.framer().is_halted());

    inbound.reset();
    let ping = registry.encode("ping", &Record::new().with("id", 1i32)).unwrap();
    assert_eq!(inbound.receive(&ping).unwrap(), 1);

    let (_, records) = inbound.into_parts();
    assert_eq!(records.len(), 1);
}
