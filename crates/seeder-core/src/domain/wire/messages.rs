//! Payloads of the four messages the seeder speaks.

use super::cursor::{write_compact_size, write_var_str, ByteReader};
use super::outbound::OutboundBuffer;
use crate::domain::{
    DiscoveredAddress, Endpoint, IpAddr, ServiceFlags, Timestamp, WireError, ADDR_TIME_VERSION,
    CHECKSUM_VERSION, SUB_VERSION_VERSION,
};
use crate::ports::Digest256;

/// Command names.
pub mod command {
    pub const VERSION: &str = "version";
    pub const VERACK: &str = "verack";
    pub const GETADDR: &str = "getaddr";
    pub const ADDR: &str = "addr";
}

/// Most entries a single `addr` message may carry.
pub const MAX_ADDR_ENTRIES: u64 = 1000;

/// Longest accepted user agent.
pub const MAX_SUB_VERSION_LEN: usize = 256;

/// Services + IPv6-mapped address + big-endian port.
const NET_ADDR_LEN: usize = 26;

/// Address as it appears inside `version` (no timestamp).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetAddr {
    pub services: ServiceFlags,
    pub endpoint: Endpoint,
}

impl NetAddr {
    /// The all-zero address used when we do not know our own.
    pub fn unspecified() -> Self {
        Self {
            services: ServiceFlags::NONE,
            endpoint: Endpoint::new(IpAddr::v4(0, 0, 0, 0), 0),
        }
    }

    fn read(reader: &mut ByteReader<'_>) -> Result<Self, WireError> {
        let services = ServiceFlags::from_bits(reader.read_u64_le()?);
        let endpoint = read_endpoint(reader)?;
        Ok(Self { services, endpoint })
    }

    fn write(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.services.bits().to_le_bytes());
        write_endpoint(buf, &self.endpoint);
    }
}

fn read_endpoint(reader: &mut ByteReader<'_>) -> Result<Endpoint, WireError> {
    let ip = IpAddr::from_wire(reader.read_array::<16>()?);
    let port = reader.read_u16_be()?;
    Ok(Endpoint::new(ip, port))
}

fn write_endpoint(buf: &mut Vec<u8>, endpoint: &Endpoint) {
    buf.extend_from_slice(&endpoint.ip.to_wire());
    buf.extend_from_slice(&endpoint.port.to_be_bytes());
}

/// The `version` handshake message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionMessage {
    pub version: i32,
    pub services: ServiceFlags,
    pub timestamp: i64,
    pub receiver: NetAddr,
    pub sender: NetAddr,
    pub nonce: u64,
    pub user_agent: String,
    pub start_height: i32,
}

impl VersionMessage {
    /// Build our outgoing `version` for a connection to `peer`.
    #[allow(clippy::too_many_arguments)]
    pub fn outgoing(
        version: i32,
        services: ServiceFlags,
        now: Timestamp,
        peer: Endpoint,
        nonce: u64,
        user_agent: &str,
        best_height: i32,
    ) -> Self {
        Self {
            version,
            services,
            timestamp: now.as_secs() as i64,
            receiver: NetAddr {
                services: ServiceFlags::NONE,
                endpoint: peer,
            },
            sender: NetAddr::unspecified(),
            nonce,
            user_agent: user_agent.to_string(),
            start_height: best_height,
        }
    }

    /// Serialize the payload.
    pub fn encode(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.version.to_le_bytes());
        buf.extend_from_slice(&self.services.bits().to_le_bytes());
        buf.extend_from_slice(&self.timestamp.to_le_bytes());
        self.receiver.write(buf);
        self.sender.write(buf);
        buf.extend_from_slice(&self.nonce.to_le_bytes());
        write_var_str(buf, &self.user_agent);
        buf.extend_from_slice(&self.start_height.to_le_bytes());
    }

    /// Parse a peer's payload. Optional trailing fields depend on the
    /// announced version and on whether bytes remain.
    pub fn decode(payload: &[u8]) -> Result<Self, WireError> {
        let mut reader = ByteReader::new(payload);

        let mut version = reader.read_i32_le()?;
        if version == 10300 {
            version = 300;
        }
        let services = ServiceFlags::from_bits(reader.read_u64_le()?);
        let timestamp = reader.read_i64_le()?;
        let receiver = NetAddr::read(&mut reader)?;

        let mut msg = Self {
            version,
            services,
            timestamp,
            receiver,
            sender: NetAddr::unspecified(),
            nonce: 0,
            user_agent: String::new(),
            start_height: 0,
        };

        if version >= SUB_VERSION_VERSION && reader.remaining() > 0 {
            msg.sender = NetAddr::read(&mut reader)?;
            msg.nonce = reader.read_u64_le()?;
            if reader.remaining() > 0 {
                msg.user_agent = reader.read_var_str(MAX_SUB_VERSION_LEN)?;
            }
        }
        if version >= CHECKSUM_VERSION && reader.remaining() >= 4 {
            msg.start_height = reader.read_i32_le()?;
        }

        Ok(msg)
    }
}

/// Serialize an `addr` payload at stream `version`.
pub fn encode_address_list(buf: &mut Vec<u8>, addresses: &[DiscoveredAddress], version: i32) {
    write_compact_size(buf, addresses.len() as u64);
    for addr in addresses {
        if version >= ADDR_TIME_VERSION {
            let time = addr.timestamp.as_secs().min(u64::from(u32::MAX)) as u32;
            buf.extend_from_slice(&time.to_le_bytes());
        }
        buf.extend_from_slice(&addr.services.bits().to_le_bytes());
        write_endpoint(buf, &addr.endpoint);
    }
}

/// Parse an `addr` payload at stream `version`.
///
/// Entries on streams without timestamps decode with timestamp 0.
pub fn decode_address_list(payload: &[u8], version: i32) -> Result<Vec<DiscoveredAddress>, WireError> {
    let mut reader = ByteReader::new(payload);
    let count = reader.read_compact_size()?;
    if count > MAX_ADDR_ENTRIES {
        return Err(WireError::Malformed("too many addr entries"));
    }

    let has_time = version >= ADDR_TIME_VERSION;
    let entry_len = NET_ADDR_LEN + if has_time { 4 } else { 0 };
    if (count as usize) * entry_len > reader.remaining() {
        return Err(WireError::Malformed("addr count exceeds payload"));
    }

    let mut out = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let time = if has_time { reader.read_u32_le()? } else { 0 };
        let net = NetAddr::read(&mut reader)?;
        out.push(DiscoveredAddress::new(
            net.endpoint,
            net.services,
            Timestamp::new(u64::from(time)),
        ));
    }
    Ok(out)
}

impl OutboundBuffer {
    /// Queue our `version`.
    pub fn push_version(&mut self, msg: &VersionMessage, version: i32, digest: &dyn Digest256) {
        self.write_message(command::VERSION, version, digest, |buf| msg.encode(buf));
    }

    /// Queue an empty `verack`.
    pub fn push_verack(&mut self, version: i32, digest: &dyn Digest256) {
        self.write_message(command::VERACK, version, digest, |_| {});
    }

    /// Queue an empty `getaddr`.
    pub fn push_getaddr(&mut self, version: i32, digest: &dyn Digest256) {
        self.write_message(command::GETADDR, version, digest, |_| {});
    }

    /// Queue an `addr` carrying `addresses`.
    pub fn push_addr(&mut self, addresses: &[DiscoveredAddress], version: i32, digest: &dyn Digest256) {
        self.write_message(command::ADDR, version, digest, |buf| {
            encode_address_list(buf, addresses, version)
        });
    }
}
