use crate::buffer::Buffer;
use crate::constants::EventFlags;
use crate::errors::Result;

/// Notification delivered by the reactor to the client.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Event {
    /// New bytes are waiting in the transport's input buffer.
    DataArrived,
    /// The output buffer was written out. Reserved, the client ignores it.
    DataSent,
    StatusChanged(EventFlags),
}

/// Duplex byte stream owned by one client.
pub trait Transport {
    fn input(&mut self) -> &mut Buffer;
    fn output(&mut self) -> &mut Buffer;

    /// Starts connecting; the outcome arrives later as a status change.
    fn connect(&mut self, addr: &str) -> Result<()>;

    /// Hands whatever sits in the output buffer to the socket.
    fn flush(&mut self) -> Result<()>;

    fn close(&mut self) -> Result<()>;
}

/// Source of transports. A client asks for a fresh one whenever the previous
/// one failed, so a half torn down stream is never reused.
pub trait Reactor {
    type Transport: Transport;

    fn transport(&mut self) -> Result<Self::Transport>;
}
