use bytes::{Buf, Bytes, BytesMut};

use crate::constants::CRLF;

/// Byte buffer sitting on either side of a transport.
///
/// The input side is drained line by line with strict CRLF framing, the
/// output side is appended to and handed to the socket in one piece.
#[derive(Debug, Default)]
pub struct Buffer {
    inner: BytesMut,
    // Prefix of `inner` already known to hold no CRLF.
    scanned: usize,
}

impl Buffer {
    pub fn new() -> Buffer {
        Buffer {
            inner: BytesMut::new(),
            scanned: 0,
        }
    }

    pub fn with_capacity(capacity: usize) -> Buffer {
        Buffer {
            inner: BytesMut::with_capacity(capacity),
            scanned: 0,
        }
    }

    pub fn add(&mut self, data: &[u8]) {
        self.inner.extend_from_slice(data);
    }

    /// Removes and returns the next line without its terminator.
    ///
    /// A line only exists once `\r\n` has been seen; a lone `\n` does not end
    /// one. Incomplete data is left untouched.
    pub fn read_line(&mut self) -> Option<Bytes> {
        // A CR at the end of the scanned prefix may still pair with a later LF.
        let from = self.scanned.saturating_sub(CRLF.len() - 1);
        let position = match self.inner[from..].windows(CRLF.len()).position(|w| w == CRLF) {
            Some(offset) => from + offset,
            None => {
                self.scanned = self.inner.len();
                return None;
            }
        };
        self.scanned = 0;
        let line = self.inner.split_to(position).freeze();
        self.inner.advance(CRLF.len());
        Some(line)
    }

    /// Drains the whole buffer.
    pub fn take(&mut self) -> Bytes {
        self.scanned = 0;
        self.inner.split().freeze()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.inner
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn clear(&mut self) {
        self.scanned = 0;
        self.inner.clear();
    }
}
