//! # Wire Codec
//!
//! Stateless encoding and decoding of the peer protocol: message framing
//! (magic, command, length, checksum) and the payloads of `version`,
//! `verack`, `getaddr` and `addr`.
//!
//! Everything read here comes from an untrusted socket. Lengths are checked
//! before anything is allocated.

mod cursor;
mod frame;
mod header;
mod messages;
mod outbound;

pub use cursor::{write_compact_size, write_var_str, ByteReader};
pub use frame::{Frame, FrameDecoder};
pub use header::{
    checksum, decode_header, encode_command, find_frame, header_len, verify_checksum,
    MessageHeader, COMMAND_LEN, HEADER_LEN, HEADER_LEN_NO_CHECKSUM, MAX_PAYLOAD_LEN,
};
pub use messages::{
    command, decode_address_list, encode_address_list, NetAddr, VersionMessage, MAX_ADDR_ENTRIES,
    MAX_SUB_VERSION_LEN,
};
pub use outbound::OutboundBuffer;

#[cfg(test)]
mod tests;
