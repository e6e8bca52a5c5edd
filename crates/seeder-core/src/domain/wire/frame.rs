//! Framing of the accumulating receive buffer.

use tracing::trace;

use super::header::{decode_header, find_frame, header_len, verify_checksum, HEADER_LEN};
use crate::domain::WireError;
use crate::ports::Digest256;

/// One complete message cut out of the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Command name.
    pub command: String,
    /// Raw payload.
    pub payload: Vec<u8>,
}

/// Receive buffer that cuts complete messages out of a byte stream.
///
/// Bytes before a magic are garbage and are dropped; bytes from a magic
/// onward are kept until the message they start is complete.
#[derive(Debug, Clone)]
pub struct FrameDecoder {
    magic: [u8; 4],
    buffer: Vec<u8>,
}

impl FrameDecoder {
    /// Create an empty decoder for the given network magic.
    pub fn new(magic: [u8; 4]) -> Self {
        Self {
            magic,
            buffer: Vec::new(),
        }
    }

    /// Append freshly received bytes.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Bytes currently held back for the next read.
    pub fn buffered(&self) -> &[u8] {
        &self.buffer
    }

    /// Cut the next message out of the buffer.
    ///
    /// Returns `Ok(None)` when more bytes are needed. A checksum mismatch
    /// consumes the offending message and returns `Err(ChecksumMismatch)`;
    /// the caller may keep decoding. Any other error is fatal for the stream.
    pub fn next_frame(
        &mut self,
        version: i32,
        digest: &dyn Digest256,
    ) -> Result<Option<Frame>, WireError> {
        let start = match find_frame(&self.buffer, &self.magic) {
            Some(start) => start,
            None => {
                // A magic may still be forming across reads.
                let keep = self.buffer.len().min(HEADER_LEN - 1);
                self.buffer.drain(..self.buffer.len() - keep);
                return Ok(None);
            }
        };
        if start > 0 {
            trace!(skipped = start, "dropping bytes before magic");
            self.buffer.drain(..start);
        }

        let hdr_len = header_len(version);
        if self.buffer.len() < hdr_len {
            return Ok(None);
        }

        let header = decode_header(&self.buffer[..hdr_len], &self.magic, version)?;
        let total = hdr_len + header.payload_len as usize;
        if self.buffer.len() < total {
            return Ok(None);
        }

        let payload = self.buffer[hdr_len..total].to_vec();
        self.buffer.drain(..total);

        if let Some(expected) = header.checksum {
            if !verify_checksum(digest, &payload, &expected) {
                return Err(WireError::ChecksumMismatch {
                    command: header.command,
                });
            }
        }

        Ok(Some(Frame {
            command: header.command,
            payload,
        }))
    }
}
