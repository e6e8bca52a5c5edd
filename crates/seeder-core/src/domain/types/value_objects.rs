//! Value Objects for the Seeder
//!
//! Network parameters are consumed as static configuration: the seeder never
//! derives them, it only checks peers against them.

use serde::{Deserialize, Serialize};

use super::entities::ServiceFlags;

/// Protocol version that introduced the header checksum.
pub const CHECKSUM_VERSION: i32 = 209;

/// Protocol version that introduced the `addr` entry timestamp.
pub const ADDR_TIME_VERSION: i32 = 31402;

/// Protocol version that introduced the user agent in `version`.
pub const SUB_VERSION_VERSION: i32 = 106;

/// Static parameters of the network being crawled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainParams {
    /// Message start bytes.
    #[serde(with = "hex_magic")]
    pub magic: [u8; 4],
    /// Port good nodes are expected to listen on.
    pub default_port: u16,
    /// Protocol version we announce.
    pub protocol_version: i32,
    /// Lowest peer protocol version that can be good.
    pub min_peer_version: i32,
    /// User agent we announce.
    pub user_agent: String,
    /// Chain height we announce.
    pub best_height: i32,
    /// Lowest reported height that can be good (0 disables the check).
    pub min_height: i32,
    /// Services a node must advertise to be good.
    pub required_services: ServiceFlags,
}

impl Default for ChainParams {
    fn default() -> Self {
        Self {
            magic: [0xF9, 0xBE, 0xB4, 0xD9],
            default_port: 8333,
            protocol_version: 70015,
            min_peer_version: 70001,
            user_agent: "/seeder:0.1.0/".to_string(),
            best_height: 0,
            min_height: 0,
            required_services: ServiceFlags::NETWORK,
        }
    }
}

impl ChainParams {
    /// Parameters for unit tests: a private magic and port.
    #[cfg(test)]
    pub fn for_testing() -> Self {
        Self {
            magic: [0x0B, 0x11, 0x09, 0x07],
            default_port: 18333,
            ..Self::default()
        }
    }
}

/// Magic bytes travel through config files as an 8-digit hex string.
mod hex_magic {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(magic: &[u8; 4], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(magic))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 4], D::Error> {
        let text = String::deserialize(deserializer)?;
        let bytes = hex::decode(text.trim_start_matches("0x")).map_err(D::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| D::Error::custom("magic must be exactly 4 bytes"))
    }
}
