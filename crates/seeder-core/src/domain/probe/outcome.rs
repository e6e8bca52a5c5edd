//! What a probe is asked to do and what it reports back.

use std::fmt;

use crate::domain::{BanReason, DiscoveredAddress, Endpoint, PeerMeta, ProbeFailure, ServiceFlags};

/// A probe job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeRequest {
    pub target: Endpoint,
    /// Send `getaddr` after the handshake.
    pub request_addresses: bool,
}

/// How a probe ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Handshake completed (and the address request, if any, was drained).
    Success,
    /// Nothing hostile, but no usable answer.
    Failure(ProbeFailure),
    /// The peer misbehaved.
    Banned(BanReason),
}

impl ProbeOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failure(e) => write!(f, "failure ({})", e),
            Self::Banned(r) => write!(f, "banned ({})", r),
        }
    }
}

/// Everything a finished probe hands to the store.
///
/// Discovered addresses are reported whatever the outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    pub target: Endpoint,
    pub outcome: ProbeOutcome,
    /// Recommended ban in seconds; non-zero only for `Banned`.
    pub ban_secs: u64,
    pub peer: PeerMeta,
    /// Services the peer advertised in its `version`.
    pub services: ServiceFlags,
    pub discovered: Vec<DiscoveredAddress>,
}
