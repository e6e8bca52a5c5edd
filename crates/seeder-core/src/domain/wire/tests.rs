//! Tests for the wire codec.

use super::*;
use crate::adapters::Sha256dDigest;
use crate::domain::{DiscoveredAddress, Endpoint, IpAddr, ServiceFlags, Timestamp, WireError};
use proptest::prelude::*;

const MAGIC: [u8; 4] = [0xF9, 0xBE, 0xB4, 0xD9];

fn framed(command: &str, payload: &[u8], version: i32) -> Vec<u8> {
    let mut out = OutboundBuffer::new(MAGIC);
    let payload = payload.to_vec();
    out.write_message(command, version, &Sha256dDigest, move |buf| buf.extend_from_slice(&payload));
    out.take()
}

// =============================================================================
// TEST GROUP 1: Header
// =============================================================================

#[test]
fn test_header_layout() {
    let bytes = framed("ping", &[1, 2, 3], 70015);
    assert_eq!(bytes.len(), HEADER_LEN + 3);
    assert_eq!(&bytes[..4], &MAGIC);
    assert_eq!(&bytes[4..16], b"ping\0\0\0\0\0\0\0\0");
    assert_eq!(&bytes[16..20], &3u32.to_le_bytes());
    assert_eq!(&bytes[20..24], &checksum(&Sha256dDigest, &[1, 2, 3]));

    let header = decode_header(&bytes, &MAGIC, 70015).unwrap();
    assert_eq!(header.command, "ping");
    assert_eq!(header.payload_len, 3);
    assert!(header.checksum.is_some());
}

#[test]
fn test_pre_checksum_header_has_no_checksum() {
    let bytes = framed("verack", &[], 200);
    assert_eq!(bytes.len(), HEADER_LEN_NO_CHECKSUM);
    let header = decode_header(&bytes, &MAGIC, 200).unwrap();
    assert_eq!(header.checksum, None);
}

#[test]
fn test_empty_payload_checksum_is_sha256d_of_nothing() {
    // First four bytes of SHA256(SHA256("")).
    let bytes = framed("verack", &[], 70015);
    assert_eq!(&bytes[20..24], &[0x5D, 0xF6, 0xE0, 0xE2]);
}

#[test]
fn test_header_rejects_bad_commands() {
    let mut bytes = framed("verack", &[], 70015);
    bytes[6] = 0x01;
    assert!(matches!(decode_header(&bytes, &MAGIC, 70015), Err(WireError::Malformed(_))));

    let mut bytes = framed("verack", &[], 70015);
    bytes[15] = b'x';
    assert!(matches!(decode_header(&bytes, &MAGIC, 70015), Err(WireError::Malformed(_))));

    let mut bytes = framed("verack", &[], 70015);
    bytes[4] = 0;
    assert!(matches!(decode_header(&bytes, &MAGIC, 70015), Err(WireError::Malformed(_))));
}

#[test]
fn test_header_rejects_wrong_magic_and_oversize() {
    let bytes = framed("verack", &[], 70015);
    assert!(matches!(
        decode_header(&bytes, &[0, 0, 0, 0], 70015),
        Err(WireError::Malformed(_))
    ));

    let mut bytes = framed("verack", &[], 70015);
    bytes[16..20].copy_from_slice(&(MAX_PAYLOAD_LEN + 1).to_le_bytes());
    assert_eq!(
        decode_header(&bytes, &MAGIC, 70015),
        Err(WireError::Oversized {
            declared: MAX_PAYLOAD_LEN + 1,
            max: MAX_PAYLOAD_LEN
        })
    );
}

// =============================================================================
// TEST GROUP 2: Framing
// =============================================================================

#[test]
fn test_find_frame() {
    assert_eq!(find_frame(&[1, 2, 0xF9, 0xBE, 0xB4, 0xD9, 0], &MAGIC), Some(2));
    assert_eq!(find_frame(&[0xF9, 0xBE, 0xB4], &MAGIC), None);
    assert_eq!(find_frame(&[], &MAGIC), None);
}

#[test]
fn test_garbage_then_truncated_header_keeps_bytes_from_magic() {
    let mut decoder = FrameDecoder::new(MAGIC);
    let message = framed("verack", &[], 70015);
    let mut bytes = vec![0x11, 0x22, 0x33, 0x44, 0x55];
    bytes.extend_from_slice(&message[..10]);
    decoder.extend(&bytes);

    assert_eq!(decoder.next_frame(70015, &Sha256dDigest), Ok(None));
    assert_eq!(decoder.buffered(), &message[..10]);

    decoder.extend(&message[10..]);
    let frame = decoder.next_frame(70015, &Sha256dDigest).unwrap().unwrap();
    assert_eq!(frame.command, "verack");
    assert!(decoder.buffered().is_empty());
}

#[test]
fn test_garbage_without_magic_is_trimmed() {
    let mut decoder = FrameDecoder::new(MAGIC);
    decoder.extend(&[0x42; 100]);
    assert_eq!(decoder.next_frame(70015, &Sha256dDigest), Ok(None));
    assert_eq!(decoder.buffered().len(), HEADER_LEN - 1);
}

#[test]
fn test_incomplete_payload_waits() {
    let mut decoder = FrameDecoder::new(MAGIC);
    let message = framed("addr", &[0u8; 40], 70015);
    decoder.extend(&message[..HEADER_LEN + 10]);
    assert_eq!(decoder.next_frame(70015, &Sha256dDigest), Ok(None));
    assert_eq!(decoder.buffered().len(), HEADER_LEN + 10);

    decoder.extend(&message[HEADER_LEN + 10..]);
    let frame = decoder.next_frame(70015, &Sha256dDigest).unwrap().unwrap();
    assert_eq!(frame.payload, vec![0u8; 40]);
}

#[test]
fn test_several_messages_in_one_read() {
    let mut decoder = FrameDecoder::new(MAGIC);
    let mut bytes = framed("verack", &[], 70015);
    bytes.extend(framed("ping", &[9; 8], 70015));
    decoder.extend(&bytes);

    let first = decoder.next_frame(70015, &Sha256dDigest).unwrap().unwrap();
    let second = decoder.next_frame(70015, &Sha256dDigest).unwrap().unwrap();
    assert_eq!(first.command, "verack");
    assert_eq!(second.command, "ping");
    assert_eq!(decoder.next_frame(70015, &Sha256dDigest), Ok(None));
}

#[test]
fn test_checksum_mismatch_skips_only_that_message() {
    let mut decoder = FrameDecoder::new(MAGIC);
    let mut bad = framed("ping", &[1, 2, 3, 4], 70015);
    bad[HEADER_LEN] ^= 0xFF;
    bad.extend(framed("pong", &[5], 70015));
    decoder.extend(&bad);

    assert_eq!(
        decoder.next_frame(70015, &Sha256dDigest),
        Err(WireError::ChecksumMismatch {
            command: "ping".to_string()
        })
    );
    let next = decoder.next_frame(70015, &Sha256dDigest).unwrap().unwrap();
    assert_eq!(next.command, "pong");
}

#[test]
fn test_pre_checksum_stream_skips_verification() {
    let mut decoder = FrameDecoder::new(MAGIC);
    decoder.extend(&framed("ping", &[1, 2], 200));
    let frame = decoder.next_frame(200, &Sha256dDigest).unwrap().unwrap();
    assert_eq!(frame.payload, vec![1, 2]);
}

// =============================================================================
// TEST GROUP 3: Payloads
// =============================================================================

#[test]
fn test_version_decode_maps_10300() {
    let msg = VersionMessage::outgoing(
        10300,
        ServiceFlags::NETWORK,
        Timestamp::new(1_700_000_000),
        Endpoint::new(IpAddr::v4(1, 2, 3, 4), 8333),
        99,
        "/x/",
        5,
    );
    let mut buf = Vec::new();
    msg.encode(&mut buf);
    let decoded = VersionMessage::decode(&buf).unwrap();
    assert_eq!(decoded.version, 300);
    assert_eq!(decoded.user_agent, "/x/");
    assert_eq!(decoded.start_height, 5);
    assert_eq!(decoded.receiver.endpoint, Endpoint::new(IpAddr::v4(1, 2, 3, 4), 8333));
}

#[test]
fn test_version_decode_minimal_payload() {
    // version + services + time + addr_recv only
    let mut buf = Vec::new();
    buf.extend_from_slice(&70015i32.to_le_bytes());
    buf.extend_from_slice(&1u64.to_le_bytes());
    buf.extend_from_slice(&0i64.to_le_bytes());
    buf.extend_from_slice(&[0u8; 26]);
    let decoded = VersionMessage::decode(&buf).unwrap();
    assert_eq!(decoded.version, 70015);
    assert_eq!(decoded.user_agent, "");
    assert_eq!(decoded.start_height, 0);
}

#[test]
fn test_version_rejects_huge_user_agent() {
    let mut msg = VersionMessage::outgoing(
        70015,
        ServiceFlags::NONE,
        Timestamp::new(0),
        Endpoint::new(IpAddr::v4(1, 2, 3, 4), 8333),
        1,
        "",
        0,
    );
    msg.user_agent = "a".repeat(MAX_SUB_VERSION_LEN + 1);
    let mut buf = Vec::new();
    msg.encode(&mut buf);
    assert!(matches!(VersionMessage::decode(&buf), Err(WireError::Malformed(_))));
}

#[test]
fn test_addr_entry_layout() {
    let entry = DiscoveredAddress::new(
        Endpoint::new(IpAddr::v4(10, 0, 0, 1), 8333),
        ServiceFlags::NETWORK,
        Timestamp::new(0x0102_0304),
    );
    let mut buf = Vec::new();
    encode_address_list(&mut buf, &[entry], 70015);
    assert_eq!(buf.len(), 1 + 30);
    assert_eq!(&buf[1..5], &[0x04, 0x03, 0x02, 0x01]);
    assert_eq!(&buf[13..25], &[0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0xFF, 0xFF]);
    assert_eq!(&buf[29..31], &[0x20, 0x8D]);
}

#[test]
fn test_addr_count_must_fit_payload() {
    let mut buf = Vec::new();
    write_compact_size(&mut buf, 3);
    buf.extend_from_slice(&[0u8; 30]);
    assert!(matches!(decode_address_list(&buf, 70015), Err(WireError::Malformed(_))));
}

#[test]
fn test_compact_size_rejects_non_canonical() {
    let mut reader = ByteReader::new(&[0xFD, 0x10, 0x00]);
    assert!(reader.read_compact_size().is_err());

    let mut buf = Vec::new();
    write_compact_size(&mut buf, 0x1_0000);
    assert_eq!(buf, vec![0xFE, 0x00, 0x00, 0x01, 0x00]);
    assert_eq!(ByteReader::new(&buf).read_compact_size(), Ok(0x1_0000));
}

// =============================================================================
// TEST GROUP 4: Properties
// =============================================================================

fn address_strategy() -> impl Strategy<Value = DiscoveredAddress> {
    (
        prop_oneof![
            any::<[u8; 4]>().prop_map(IpAddr::V4),
            any::<[u8; 16]>().prop_map(IpAddr::v6),
        ],
        any::<u16>(),
        any::<u64>(),
        any::<u32>(),
    )
        .prop_map(|(ip, port, services, time)| {
            DiscoveredAddress::new(
                Endpoint::new(ip, port),
                ServiceFlags::from_bits(services),
                Timestamp::new(u64::from(time)),
            )
        })
}

proptest! {
    #[test]
    fn prop_address_list_round_trips(addresses in prop::collection::vec(address_strategy(), 0..50)) {
        let mut buf = Vec::new();
        encode_address_list(&mut buf, &addresses, 70015);
        prop_assert_eq!(decode_address_list(&buf, 70015).unwrap(), addresses);
    }

    #[test]
    fn prop_checksum_detects_bit_flips(
        payload in prop::collection::vec(any::<u8>(), 1..256),
        bit in any::<prop::sample::Index>(),
    ) {
        let sum = checksum(&Sha256dDigest, &payload);
        prop_assert!(verify_checksum(&Sha256dDigest, &payload, &sum));

        let mut flipped = payload.clone();
        let i = bit.index(payload.len() * 8);
        flipped[i / 8] ^= 1 << (i % 8);
        prop_assert!(!verify_checksum(&Sha256dDigest, &flipped, &sum));
    }

    #[test]
    fn prop_decoder_never_panics_on_noise(noise in prop::collection::vec(any::<u8>(), 0..512)) {
        let mut decoder = FrameDecoder::new(MAGIC);
        decoder.extend(&noise);
        for _ in 0..8 {
            match decoder.next_frame(70015, &Sha256dDigest) {
                Ok(Some(_)) | Err(WireError::ChecksumMismatch { .. }) => continue,
                _ => break,
            }
        }
    }
}
