//! Inbound record consumers
//!
//! The framer hands every decoded record to a [`RecordConsumer`], together
//! with the name of the event it was decoded as. Records that were framed
//! correctly but failed to decode go to [`RecordConsumer::reject`] instead.

use strand_types::Record;
use tokio::sync::mpsc;
use tracing::warn;

use crate::error::{CodecError, CodecResult};

/// Receiver of decoded records
pub trait RecordConsumer {
    /// Accept one decoded record
    ///
    /// An error stops the current `feed` after this record; bytes not yet
    /// framed stay pending for the next call.
    fn consume(&mut self, event: &str, record: Record) -> CodecResult<()>;

    /// A complete record that could not be decoded and was skipped
    fn reject(&mut self, error: CodecError) {
        warn!("Skipping undecodable record: {}", error);
    }
}

impl RecordConsumer for Vec<(String, Record)> {
    fn consume(&mut self, event: &str, record: Record) -> CodecResult<()> {
        self.push((event.to_string(), record));
        Ok(())
    }
}

impl RecordConsumer for mpsc::UnboundedSender<(String, Record)> {
    fn consume(&mut self, event: &str, record: Record) -> CodecResult<()> {
        self.send((event.to_string(), record))
            .map_err(|_| CodecError::sink_closed("record receiver dropped"))
    }
}

impl<T: RecordConsumer + ?Sized> RecordConsumer for &mut T {
    fn consume(&mut self, event: &str, record: Record) -> CodecResult<()> {
        (**self).consume(event, record)
    }

    fn reject(&mut self, error: CodecError) {
        (**self).reject(error)
    }
}

impl<T: RecordConsumer + ?Sized> RecordConsumer for Box<T> {
    fn consume(&mut self, event: &str, record: Record) -> CodecResult<()> {
        (**self).consume(event, record)
    }

    fn reject(&mut self, error: CodecError) {
        (**self).reject(error)
    }
}

/// Consumer backed by a closure, see [`from_fn`]
pub struct FnConsumer<F>(F);

impl<F> std::fmt::Debug for FnConsumer<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FnConsumer")
    }
}

impl<F> RecordConsumer for FnConsumer<F>
where
    F: FnMut(&str, Record) -> CodecResult<()>,
{
    fn consume(&mut self, event: &str, record: Record) -> CodecResult<()> {
        (self.0)(event, record)
    }
}

/// Wrap a closure as a [`RecordConsumer`]; rejections are logged
pub fn from_fn<F>(f: F) -> FnConsumer<F>
where
    F: FnMut(&str, Record) -> CodecResult<()>,
{
    FnConsumer(f)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_consumer() {
        let mut records: Vec<(String, Record)> = Vec::new();
        records
            .consume("ping", Record::new().with("id", 1i32))
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].0, "ping");
        // default reject only logs
        records.reject(CodecError::truncated("ping", 5, 1));
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_closure_consumer() {
        let mut names = Vec::new();
        {
            let mut consumer = from_fn(|event: &str, _record: Record| {
                names.push(event.to_string());
                Ok(())
            });
            consumer.consume("a", Record::new()).unwrap();
            consumer.consume("b", Record::new()).unwrap();
        }
        assert_eq!(names, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_channel_consumer() {
        let (mut tx, mut rx) = mpsc::unbounded_channel::<(String, Record)>();
        tx.consume("ping", Record::new().with("id", 3i32)).unwrap();
        let (event, record) = rx.recv().await.unwrap();
        assert_eq!(event, "ping");
        assert_eq!(record.get_i32("id"), Some(3));

        drop(rx);
        assert!(matches!(
            tx.consume("ping", Record::new()),
            Err(CodecError::SinkClosed { .. })
        ));
    }
}
