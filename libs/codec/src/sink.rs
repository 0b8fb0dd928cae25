//! Outbound byte sinks
//!
//! A [`Sink`] receives each encoded record as one owned buffer. Transport
//! concerns (sockets, framing for a particular medium) live behind it.

use tokio::sync::mpsc;

use crate::error::{CodecError, CodecResult};

/// Destination for encoded records
pub trait Sink {
    /// Accept one complete encoded record
    fn write(&mut self, bytes: Vec<u8>) -> CodecResult<()>;
}

/// One buffer per record
impl Sink for Vec<Vec<u8>> {
    fn write(&mut self, bytes: Vec<u8>) -> CodecResult<()> {
        self.push(bytes);
        Ok(())
    }
}

/// Records appended into one contiguous stream
impl Sink for Vec<u8> {
    fn write(&mut self, bytes: Vec<u8>) -> CodecResult<()> {
        self.extend_from_slice(&bytes);
        Ok(())
    }
}

impl Sink for mpsc::UnboundedSender<Vec<u8>> {
    fn write(&mut self, bytes: Vec<u8>) -> CodecResult<()> {
        self.send(bytes)
            .map_err(|_| CodecError::sink_closed("receiver dropped"))
    }
}

impl<T: Sink + ?Sized> Sink for &mut T {
    fn write(&mut self, bytes: Vec<u8>) -> CodecResult<()> {
        (**self).write(bytes)
    }
}

impl<T: Sink + ?Sized> Sink for Box<T> {
    fn write(&mut self, bytes: Vec<u8>) -> CodecResult<()> {
        (**self).write(bytes)
    }
}

/// Sink backed by a closure, see [`from_fn`]
pub struct FnSink<F>(F);

impl<F> std::fmt::Debug for FnSink<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FnSink")
    }
}

impl<F> Sink for FnSink<F>
where
    F: FnMut(Vec<u8>) -> CodecResult<()>,
{
    fn write(&mut self, bytes: Vec<u8>) -> CodecResult<()> {
        (self.0)(bytes)
    }
}

/// Wrap a closure as a [`Sink`]
pub fn from_fn<F>(f: F) -> FnSink<F>
where
    F: FnMut(Vec<u8>) -> CodecResult<()>,
{
    FnSink(f)
}
