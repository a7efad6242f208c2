use bytes::BytesMut;

use crate::buffer::Buffer;
use crate::constants::{CRLF, END, RESPONSE_MAXIMUM_SIZE};
use crate::errors::{ErrorKind, Result};
use crate::protocol;

/// Accumulates the lines of one in-flight response until its `END` line.
#[derive(Debug)]
pub struct StreamReader {
    response: BytesMut,
    // Bytes of value payload (terminator included) still expected, during
    // which an `END` line is data rather than the end of the response.
    payload_remaining: usize,
    limit: usize,
}

impl Default for StreamReader {
    fn default() -> StreamReader {
        StreamReader::new(RESPONSE_MAXIMUM_SIZE)
    }
}

impl StreamReader {
    pub fn new(limit: usize) -> StreamReader {
        StreamReader {
            response: BytesMut::new(),
            payload_remaining: 0,
            limit,
        }
    }

    /// Drains every complete line currently in `input`.
    ///
    /// Returns `Ok(true)` once the terminator was seen, the transcript is then
    /// ready for parsing. `Ok(false)` means more data is needed.
    pub fn read(&mut self, input: &mut Buffer) -> Result<bool> {
        while let Some(line) = input.read_line() {
            if self.payload_remaining > 0 {
                self.payload_remaining = self
                    .payload_remaining
                    .saturating_sub(line.len() + CRLF.len());
            } else if line.as_ref() == END {
                trace!("Response complete with {} bytes", self.response.len());
                return Ok(true);
            } else if let Some(length) = protocol::payload_length(&line) {
                self.payload_remaining = match length.checked_add(CRLF.len()) {
                    Some(remaining) if remaining <= self.limit => remaining,
                    _ => bail!(ErrorKind::TransportRead(format!(
                        "value of {} bytes exceeds {} bytes",
                        length, self.limit
                    ))),
                };
            }

            if self.response.len() + line.len() + CRLF.len() > self.limit {
                bail!(ErrorKind::TransportRead(format!(
                    "response exceeds {} bytes",
                    self.limit
                )));
            }
            self.response.extend_from_slice(&line);
            self.response.extend_from_slice(CRLF);
        }
        // Bytes still waiting for their CRLF count against the same bound.
        if self.response.len() + input.len() > self.limit {
            bail!(ErrorKind::TransportRead(format!(
                "unterminated line of {} bytes exceeds {} bytes",
                input.len(),
                self.limit
            )));
        }
        Ok(false)
    }

    pub fn clear(&mut self) {
        self.response.clear();
        self.payload_remaining = 0;
    }

    pub fn response(&self) -> &[u8] {
        &self.response
    }
}
