//! # Protocol Channel
//!
//! Duplex endpoint over one registry: outbound records are encoded and
//! written to a [`Sink`]; inbound chunks are framed and each decoded record
//! is routed to the handler registered for its event with [`ProtocolChannel::on`],
//! or to the channel's [`RecordConsumer`] when no handler matches.
//!
//! ```text
//! send(event, record) → Registry::encode → Sink::write
//! receive(chunk)      → WireFramer::feed → handler(event) | RecordConsumer
//! ```
//!
//! The channel keeps no state beyond the framer's pending buffer. Encoding
//! and decoding share the registry through an `Arc`, so many channels can
//! serve one protocol definition.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use strand_types::Record;
use tracing::trace;

use crate::config::FramerConfig;
use crate::consumer::RecordConsumer;
use crate::error::{CodecError, CodecResult};
use crate::framer::WireFramer;
use crate::registry::Registry;
use crate::sink::Sink;

type Handler = Box<dyn FnMut(Record) + Send>;

/// Encoder/decoder pair bound to a sink and a consumer
pub struct ProtocolChannel<S, C> {
    registry: Arc<Registry>,
    framer: WireFramer,
    sink: S,
    consumer: C,
    handlers: HashMap<String, Handler>,
}

impl<S, C> fmt::Debug for ProtocolChannel<S, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProtocolChannel")
            .field("events", &self.registry.len())
            .field("fingerprint", &self.registry.fingerprint())
            .field("pending", &self.framer.pending_len())
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

impl<S: Sink, C: RecordConsumer> ProtocolChannel<S, C> {
    pub fn new(registry: Arc<Registry>, sink: S, consumer: C) -> Self {
        Self::with_config(registry, FramerConfig::default(), sink, consumer)
    }

    pub fn with_config(registry: Arc<Registry>, config: FramerConfig, sink: S, consumer: C) -> Self {
        Self {
            framer: WireFramer::with_config(Arc::clone(&registry), config),
            registry,
            sink,
            consumer,
            handlers: HashMap::new(),
        }
    }

    /// Compile every codec up front; returns the number of events
    pub fn compile_all(&self) -> usize {
        self.registry.compile_all()
    }

    /// Encode `record` as `event` and write it to the sink
    pub fn send(&mut self, event: &str, record: &Record) -> CodecResult<()> {
        let bytes = self.registry.encode(event, record)?;
        trace!("Sending '{}' ({} bytes)", event, bytes.len());
        self.sink.write(bytes)
    }

    /// Route records of `event` to `handler` instead of the consumer
    ///
    /// Registering a second handler for the same event replaces the first.
    pub fn on<F>(&mut self, event: &str, handler: F) -> CodecResult<()>
    where
        F: FnMut(Record) + Send + 'static,
    {
        if self.registry.lookup_by_name(event).is_none() {
            return Err(CodecError::unknown_event(event));
        }
        self.handlers.insert(event.to_string(), Box::new(handler));
        Ok(())
    }

    /// Feed inbound bytes; returns the number of records dispatched
    pub fn receive(&mut self, chunk: &[u8]) -> CodecResult<usize> {
        let mut dispatch = Dispatch {
            handlers: &mut self.handlers,
            consumer: &mut self.consumer,
        };
        self.framer.feed(chunk, &mut dispatch)
    }

    #[inline]
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    #[inline]
    pub fn framer(&self) -> &WireFramer {
        &self.framer
    }

    /// Clear the inbound stream state, including a halt
    pub fn reset(&mut self) {
        self.framer.reset();
    }

    #[inline]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    #[inline]
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    #[inline]
    pub fn consumer(&self) -> &C {
        &self.consumer
    }

    #[inline]
    pub fn consumer_mut(&mut self) -> &mut C {
        &mut self.consumer
    }

    /// Take back the sink and consumer; pending inbound bytes are dropped
    pub fn into_parts(self) -> (S, C) {
        (self.sink, self.consumer)
    }
}

struct Dispatch<'a, C> {
    handlers: &'a mut HashMap<String, Handler>,
    consumer: &'a mut C,
}

impl<C: RecordConsumer> RecordConsumer for Dispatch<'_, C> {
    fn consume(&mut self, event: &str, record: Record) -> CodecResult<()> {
        match self.handlers.get_mut(event) {
            Some(handler) => {
                handler(record);
                Ok(())
            }
            None => self.consumer.consume(event, record),
        }
    }

    fn reject(&mut self, error: CodecError) {
        self.consumer.reject(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use strand_types::FieldType;

    fn registry() -> Arc<Registry> {
        let mut registry = Registry::new();
        registry
            .define(0, "ping", vec![("id", FieldType::Int32)])
            .unwrap();
        registry
            .define(1, "chat", vec![("text", FieldType::Utf8String)])
            .unwrap();
        Arc::new(registry)
    }

    type Loopback = ProtocolChannel<Vec<u8>, Vec<(String, Record)>>;

    #[test]
    fn test_send_then_receive() {
        let mut tx: Loopback = ProtocolChannel::new(registry(), Vec::new(), Vec::new());
        tx.send("ping", &Record::new().with("id", 1i32)).unwrap();
        tx.send("chat", &Record::new().with("text", "hi")).unwrap();
        let (wire, _) = tx.into_parts();

        let mut rx: Loopback = ProtocolChannel::new(registry(), Vec::new(), Vec::new());
        assert_eq!(rx.receive(&wire).unwrap(), 2);
        let received = rx.consumer();
        assert_eq!(received[0].0, "ping");
        assert_eq!(received[1].1.get_str("text"), Some("hi"));
    }

    #[test]
    fn test_send_unknown_event() {
        let mut tx: Loopback = ProtocolChannel::new(registry(), Vec::new(), Vec::new());
        let err = tx.send("pong", &Record::new()).unwrap_err();
        assert_eq!(err, CodecError::unknown_event("pong"));
        assert!(tx.sink().is_empty());
    }

    #[test]
    fn test_handlers_take_precedence() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut rx: Loopback = ProtocolChannel::new(registry(), Vec::new(), Vec::new());

        let sink = Arc::clone(&seen);
        rx.on("chat", move |record| {
            if let Some(text) = record.get_str("text") {
                sink.lock().unwrap().push(text.to_string());
            }
        })
        .unwrap();
        assert_eq!(
            rx.on("pong", |_| {}).unwrap_err(),
            CodecError::unknown_event("pong")
        );

        let mut wire = Vec::new();
        wire.extend(registry().encode("chat", &Record::new().with("text", "a")).unwrap());
        wire.extend(registry().encode("ping", &Record::new().with("id", 5i32)).unwrap());
        assert_eq!(rx.receive(&wire).unwrap(), 2);

        assert_eq!(*seen.lock().unwrap(), vec!["a".to_string()]);
        assert_eq!(rx.consumer().len(), 1);
        assert_eq!(rx.consumer()[0].0, "ping");
    }

    #[test]
    fn test_compile_all_freezes_shared_registry() {
        let rx: Loopback = ProtocolChannel::new(registry(), Vec::new(), Vec::new());
        assert_eq!(rx.compile_all(), 2);
        assert!(rx.registry().is_frozen());
    }
}
