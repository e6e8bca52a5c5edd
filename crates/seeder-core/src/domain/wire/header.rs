//! Message header layout, magic scanning and checksum verification.

use crate::domain::{WireError, CHECKSUM_VERSION};
use crate::ports::Digest256;

/// Width of the NUL-padded command field.
pub const COMMAND_LEN: usize = 12;

/// Hard cap on a declared payload length (32 MiB).
pub const MAX_PAYLOAD_LEN: u32 = 0x0200_0000;

/// Header length when the checksum field is present.
pub const HEADER_LEN: usize = 24;

/// Header length for streams older than the checksum version.
pub const HEADER_LEN_NO_CHECKSUM: usize = 20;

/// Header length for a stream running at `version`.
pub fn header_len(version: i32) -> usize {
    if version >= CHECKSUM_VERSION {
        HEADER_LEN
    } else {
        HEADER_LEN_NO_CHECKSUM
    }
}

/// A decoded message header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHeader {
    /// Command name without padding.
    pub command: String,
    /// Declared payload length.
    pub payload_len: u32,
    /// Checksum field, absent on pre-checksum streams.
    pub checksum: Option<[u8; 4]>,
}

/// Offset of the first occurrence of `magic` in `buffer`.
pub fn find_frame(buffer: &[u8], magic: &[u8; 4]) -> Option<usize> {
    buffer.windows(magic.len()).position(|w| w == magic)
}

/// Decode a header from `bytes` (which must start with the magic).
///
/// `bytes` must hold at least `header_len(version)` bytes.
pub fn decode_header(bytes: &[u8], magic: &[u8; 4], version: i32) -> Result<MessageHeader, WireError> {
    let len = header_len(version);
    if bytes.len() < len {
        return Err(WireError::Malformed("short header"));
    }
    if &bytes[..4] != magic {
        return Err(WireError::Malformed("bad magic"));
    }

    let raw_command = &bytes[4..4 + COMMAND_LEN];
    let command = decode_command(raw_command)?;

    let mut len_bytes = [0u8; 4];
    len_bytes.copy_from_slice(&bytes[16..20]);
    let payload_len = u32::from_le_bytes(len_bytes);
    if payload_len > MAX_PAYLOAD_LEN {
        return Err(WireError::Oversized {
            declared: payload_len,
            max: MAX_PAYLOAD_LEN,
        });
    }

    let checksum = if len == HEADER_LEN {
        let mut sum = [0u8; 4];
        sum.copy_from_slice(&bytes[20..24]);
        Some(sum)
    } else {
        None
    };

    Ok(MessageHeader {
        command,
        payload_len,
        checksum,
    })
}

/// Printable ASCII up to the first NUL, only NULs after it.
fn decode_command(raw: &[u8]) -> Result<String, WireError> {
    let end = raw.iter().position(|b| *b == 0).unwrap_or(raw.len());
    if end == 0 {
        return Err(WireError::Malformed("empty command"));
    }
    if !raw[..end].iter().all(|b| (0x20..=0x7E).contains(b)) {
        return Err(WireError::Malformed("non-printable command"));
    }
    if raw[end..].iter().any(|b| *b != 0) {
        return Err(WireError::Malformed("command padding not NUL"));
    }
    Ok(String::from_utf8_lossy(&raw[..end]).into_owned())
}

/// Encode a command into its fixed-width field.
pub fn encode_command(command: &str) -> [u8; COMMAND_LEN] {
    let mut out = [0u8; COMMAND_LEN];
    let bytes = command.as_bytes();
    let len = bytes.len().min(COMMAND_LEN);
    out[..len].copy_from_slice(&bytes[..len]);
    out
}

/// First four bytes of the payload digest.
pub fn checksum(digest: &dyn Digest256, payload: &[u8]) -> [u8; 4] {
    let full = digest.digest256(payload);
    [full[0], full[1], full[2], full[3]]
}

/// Whether `expected` matches the payload digest.
pub fn verify_checksum(digest: &dyn Digest256, payload: &[u8], expected: &[u8; 4]) -> bool {
    checksum(digest, payload) == *expected
}
