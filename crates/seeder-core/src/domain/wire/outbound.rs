//! Outgoing message assembly.

use super::header::{checksum, encode_command, header_len};
use crate::ports::Digest256;

/// Send buffer holding only complete, framed messages.
///
/// A message is assembled in place: the header is reserved first, the
/// payload appended, then length and checksum are patched in. Bytes can only
/// be taken once `write_message` has returned, so a partial message is never
/// handed to the socket.
#[derive(Debug, Clone)]
pub struct OutboundBuffer {
    magic: [u8; 4],
    buffer: Vec<u8>,
}

impl OutboundBuffer {
    /// Create an empty buffer for the given network magic.
    pub fn new(magic: [u8; 4]) -> Self {
        Self {
            magic,
            buffer: Vec::new(),
        }
    }

    /// Frame one message at stream `version`; `fill` writes the payload.
    pub fn write_message<F>(&mut self, command: &str, version: i32, digest: &dyn Digest256, fill: F)
    where
        F: FnOnce(&mut Vec<u8>),
    {
        let start = self.buffer.len();
        let hdr_len = header_len(version);

        self.buffer.extend_from_slice(&self.magic);
        self.buffer.extend_from_slice(&encode_command(command));
        self.buffer.resize(start + hdr_len, 0);

        fill(&mut self.buffer);

        let payload_start = start + hdr_len;
        let payload_len = (self.buffer.len() - payload_start) as u32;
        self.buffer[start + 16..start + 20].copy_from_slice(&payload_len.to_le_bytes());
        if hdr_len > 20 {
            let sum = checksum(digest, &self.buffer[payload_start..]);
            self.buffer[start + 20..start + 24].copy_from_slice(&sum);
        }
    }

    /// Whether any bytes are waiting to be sent.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Take every complete message written so far.
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buffer)
    }
}
