//! Core Domain Entities for the Seeder
//!
//! Endpoints are the identity key of every address record, so equality,
//! hashing and ordering here define what "the same peer" means.

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

/// OnionCat prefix (fd87:d87e:eb43::/48) used to carry Tor v2 addresses in IPv6 slots.
const ONIONCAT_PREFIX: [u8; 6] = [0xFD, 0x87, 0xD8, 0x7E, 0xEB, 0x43];

/// IPv4-mapped IPv6 prefix (::ffff:0:0/96).
const IPV4_MAPPED_PREFIX: [u8; 12] = [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0xFF, 0xFF];

/// Network family an endpoint belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// Plain IPv4.
    Ipv4,
    /// Plain IPv6.
    Ipv6,
    /// Tor hidden service carried as OnionCat IPv6.
    Onion,
}

impl Network {
    /// Every network the seeder knows about.
    pub const ALL: [Network; 3] = [Network::Ipv4, Network::Ipv6, Network::Onion];

    /// Anonymised networks are slower to connect to and answer.
    pub fn is_anonymized(&self) -> bool {
        matches!(self, Network::Onion)
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ipv4 => write!(f, "ipv4"),
            Self::Ipv6 => write!(f, "ipv6"),
            Self::Onion => write!(f, "onion"),
        }
    }
}

/// Set of networks a caller can route to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Network>", into = "Vec<Network>")]
pub struct AllowedNetworks {
    ipv4: bool,
    ipv6: bool,
    onion: bool,
}

impl AllowedNetworks {
    /// All networks allowed.
    pub fn all() -> Self {
        Self {
            ipv4: true,
            ipv6: true,
            onion: true,
        }
    }

    /// IPv4 and IPv6 only.
    pub fn clearnet() -> Self {
        Self {
            ipv4: true,
            ipv6: true,
            onion: false,
        }
    }

    /// Exactly the listed networks.
    pub fn only(networks: &[Network]) -> Self {
        let mut allowed = Self {
            ipv4: false,
            ipv6: false,
            onion: false,
        };
        for network in networks {
            allowed.insert(*network);
        }
        allowed
    }

    /// Allow one more network.
    pub fn insert(&mut self, network: Network) {
        match network {
            Network::Ipv4 => self.ipv4 = true,
            Network::Ipv6 => self.ipv6 = true,
            Network::Onion => self.onion = true,
        }
    }

    /// Check whether a network is allowed.
    pub fn contains(&self, network: Network) -> bool {
        match network {
            Network::Ipv4 => self.ipv4,
            Network::Ipv6 => self.ipv6,
            Network::Onion => self.onion,
        }
    }
}

impl Default for AllowedNetworks {
    fn default() -> Self {
        Self::all()
    }
}

impl From<Vec<Network>> for AllowedNetworks {
    fn from(networks: Vec<Network>) -> Self {
        Self::only(&networks)
    }
}

impl From<AllowedNetworks> for Vec<Network> {
    fn from(allowed: AllowedNetworks) -> Self {
        Network::ALL
            .into_iter()
            .filter(|n| allowed.contains(*n))
            .collect()
    }
}

/// IP address enum supporting both IPv4 and IPv6.
///
/// IPv4-mapped IPv6 addresses are always normalised to `V4`, so the same peer
/// never shows up under two keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IpAddr {
    /// IPv4 address (4 bytes).
    V4([u8; 4]),
    /// IPv6 address (16 bytes).
    V6([u8; 16]),
}

impl IpAddr {
    /// Create an IPv4 address
    pub fn v4(a: u8, b: u8, c: u8, d: u8) -> Self {
        IpAddr::V4([a, b, c, d])
    }

    /// Create an IPv6 address from bytes, unmapping IPv4-mapped addresses.
    pub fn v6(bytes: [u8; 16]) -> Self {
        Self::from_wire(bytes)
    }

    /// Decode the 16-byte wire representation.
    pub fn from_wire(bytes: [u8; 16]) -> Self {
        if bytes[..12] == IPV4_MAPPED_PREFIX {
            IpAddr::V4([bytes[12], bytes[13], bytes[14], bytes[15]])
        } else {
            IpAddr::V6(bytes)
        }
    }

    /// Encode as the 16-byte wire representation (IPv4 as ::ffff:a.b.c.d).
    pub fn to_wire(&self) -> [u8; 16] {
        match self {
            IpAddr::V4(v4) => {
                let mut out = [0u8; 16];
                out[..12].copy_from_slice(&IPV4_MAPPED_PREFIX);
                out[12..].copy_from_slice(v4);
                out
            }
            IpAddr::V6(v6) => *v6,
        }
    }

    /// Network family of this address.
    pub fn network(&self) -> Network {
        match self {
            IpAddr::V4(_) => Network::Ipv4,
            IpAddr::V6(bytes) if bytes[..6] == ONIONCAT_PREFIX => Network::Onion,
            IpAddr::V6(_) => Network::Ipv6,
        }
    }

    /// Whether the address is reachable on the public internet (or Tor).
    pub fn is_routable(&self) -> bool {
        match self {
            IpAddr::V4(bytes) => is_routable_v4(Ipv4Addr::from(*bytes)),
            IpAddr::V6(bytes) if bytes[..12] == IPV4_MAPPED_PREFIX => {
                is_routable_v4(Ipv4Addr::new(bytes[12], bytes[13], bytes[14], bytes[15]))
            }
            IpAddr::V6(bytes) if bytes[..6] == ONIONCAT_PREFIX => true,
            IpAddr::V6(bytes) => is_routable_v6(Ipv6Addr::from(*bytes)),
        }
    }

    /// Convert to the standard library representation.
    pub fn to_std(&self) -> std::net::IpAddr {
        match self {
            IpAddr::V4(bytes) => std::net::IpAddr::V4(Ipv4Addr::from(*bytes)),
            IpAddr::V6(bytes) => std::net::IpAddr::V6(Ipv6Addr::from(*bytes)),
        }
    }
}

impl From<std::net::IpAddr> for IpAddr {
    fn from(ip: std::net::IpAddr) -> Self {
        match ip {
            std::net::IpAddr::V4(v4) => IpAddr::V4(v4.octets()),
            std::net::IpAddr::V6(v6) => IpAddr::from_wire(v6.octets()),
        }
    }
}

fn is_routable_v4(ip: Ipv4Addr) -> bool {
    let o = ip.octets();
    !(ip.is_unspecified()
        || ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_broadcast()
        || ip.is_multicast()
        || ip.is_documentation()
        || o[0] == 0
        // RFC2544 benchmarking
        || (o[0] == 198 && (o[1] & 0xFE) == 18))
}

fn is_routable_v6(ip: Ipv6Addr) -> bool {
    let s = ip.segments();
    !(ip.is_unspecified()
        || ip.is_loopback()
        || ip.is_multicast()
        // RFC4193 unique local
        || (s[0] & 0xFE00) == 0xFC00
        // RFC4862 link local
        || (s[0] & 0xFFC0) == 0xFE80
        // RFC3849 documentation
        || (s[0] == 0x2001 && s[1] == 0x0DB8)
        // RFC4843 ORCHID
        || (s[0] == 0x2001 && (s[1] & 0xFFF0) == 0x0010))
}

/// Network endpoint (IP + port): the identity key of an address record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    /// IP address (v4 or v6).
    pub ip: IpAddr,
    /// Port number.
    pub port: u16,
}

impl Endpoint {
    /// Create a new endpoint from IP and port.
    pub fn new(ip: IpAddr, port: u16) -> Self {
        Self { ip, port }
    }

    /// Network family of this endpoint.
    pub fn network(&self) -> Network {
        self.ip.network()
    }

    /// Whether the endpoint can be handed out and probed.
    pub fn is_routable(&self) -> bool {
        self.port != 0 && self.ip.is_routable()
    }

    /// Convert to the standard library representation.
    pub fn to_std(&self) -> std::net::SocketAddr {
        std::net::SocketAddr::new(self.ip.to_std(), self.port)
    }
}

impl From<std::net::SocketAddr> for Endpoint {
    fn from(addr: std::net::SocketAddr) -> Self {
        Self::new(IpAddr::from(addr.ip()), addr.port())
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_std())
    }
}

/// Service bits advertised by a peer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceFlags(u64);

impl ServiceFlags {
    /// No services.
    pub const NONE: ServiceFlags = ServiceFlags(0);
    /// Full node serving the complete chain.
    pub const NETWORK: ServiceFlags = ServiceFlags(1);
    /// UTXO queries.
    pub const GETUTXO: ServiceFlags = ServiceFlags(1 << 1);
    /// Bloom-filtered connections.
    pub const BLOOM: ServiceFlags = ServiceFlags(1 << 2);
    /// Segregated witness data.
    pub const WITNESS: ServiceFlags = ServiceFlags(1 << 3);
    /// Pruned node serving recent blocks only.
    pub const NETWORK_LIMITED: ServiceFlags = ServiceFlags(1 << 10);

    /// Wrap raw service bits.
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Raw service bits.
    pub const fn bits(&self) -> u64 {
        self.0
    }

    /// Whether every bit of `required` is present.
    pub fn contains(&self, required: ServiceFlags) -> bool {
        self.0 & required.0 == required.0
    }
}

impl BitOr for ServiceFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ServiceFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for ServiceFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Unix timestamp in seconds
///
/// Timestamps are clamped to a reasonable maximum so peer-supplied values
/// cannot overflow arithmetic in age calculations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Maximum reasonable timestamp (year 9999).
    pub const MAX_REASONABLE: u64 = 253_402_300_799;

    /// Create a new timestamp, clamping to MAX_REASONABLE.
    pub fn new(secs: u64) -> Self {
        Self(secs.min(Self::MAX_REASONABLE))
    }

    /// Get the underlying seconds value.
    pub fn as_secs(&self) -> u64 {
        self.0
    }

    /// Add seconds to timestamp (saturating at MAX_REASONABLE).
    pub fn add_secs(&self, secs: u64) -> Self {
        Self(self.0.saturating_add(secs).min(Self::MAX_REASONABLE))
    }

    /// Subtract seconds from timestamp (saturating at 0).
    pub fn sub_secs(&self, secs: u64) -> Self {
        Self(self.0.saturating_sub(secs))
    }

    /// Seconds elapsed since `earlier` (0 if `earlier` is in the future).
    pub fn secs_since(&self, earlier: Timestamp) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Metadata a peer reported about itself in its `version` message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerMeta {
    /// Protocol version (0 if never seen).
    pub client_version: i32,
    /// User agent string.
    pub sub_version: String,
    /// Declared chain height at connect time.
    pub height: i32,
}

/// An address learned from gossip or the seed list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredAddress {
    /// Where the peer listens.
    pub endpoint: Endpoint,
    /// Services the gossiping peer claims it offers.
    pub services: ServiceFlags,
    /// When the address was last seen alive, per the gossiping peer.
    pub timestamp: Timestamp,
}

impl DiscoveredAddress {
    /// Create a discovered address.
    pub fn new(endpoint: Endpoint, services: ServiceFlags, timestamp: Timestamp) -> Self {
        Self {
            endpoint,
            services,
            timestamp,
        }
    }
}
