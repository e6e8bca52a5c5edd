//! Domain Errors for the Seeder
//!
//! Probe-level failures are values (see `ProbeOutcome`), not errors. The
//! types here describe *why* a probe failed or a peer was banned.

use std::fmt;

use thiserror::Error;

/// Structural failures of the wire codec.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    /// Header or payload failed structural validation.
    #[error("malformed message: {0}")]
    Malformed(&'static str),
    /// Declared payload length exceeds the hard maximum.
    #[error("payload of {declared} bytes exceeds maximum of {max}")]
    Oversized {
        /// Length the peer declared.
        declared: u32,
        /// Hard maximum.
        max: u32,
    },
    /// Payload digest does not match the header checksum.
    #[error("checksum mismatch on '{command}'")]
    ChecksumMismatch {
        /// Command of the discarded message.
        command: String,
    },
}

/// Why a probe ended without a usable answer. Never a ban by itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeFailure {
    /// TCP connect failed or timed out.
    ConnectFailure(String),
    /// A deadline expired while waiting for the peer.
    Timeout,
    /// The remote side closed the connection.
    ConnectionClosed,
    /// Reading or writing the socket failed.
    Io(String),
}

impl fmt::Display for ProbeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectFailure(e) => write!(f, "connect failed: {}", e),
            Self::Timeout => write!(f, "timed out"),
            Self::ConnectionClosed => write!(f, "connection closed by peer"),
            Self::Io(e) => write!(f, "i/o error: {}", e),
        }
    }
}

/// Why a probe recommends banning its peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BanReason {
    /// The peer sent bytes the codec rejected.
    Wire(WireError),
    /// The peer sent a well-formed message out of order.
    ProtocolViolation(&'static str),
}

impl fmt::Display for BanReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wire(e) => write!(f, "{}", e),
            Self::ProtocolViolation(what) => write!(f, "protocol violation: {}", what),
        }
    }
}

/// Errors returned by address store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The endpoint has no address record.
    #[error("no record for {0}")]
    UnknownEndpoint(String),
    /// A snapshot contradicts itself.
    #[error("inconsistent snapshot: {0}")]
    InconsistentSnapshot(String),
    /// A snapshot written by an incompatible version.
    #[error("unsupported snapshot version {0}")]
    UnsupportedSnapshotVersion(u32),
}

/// A configuration value outside its allowed range.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid config value for {field}: {reason}")]
pub struct InvalidConfig {
    /// Dotted path of the offending field.
    pub field: &'static str,
    /// What is wrong with it.
    pub reason: &'static str,
}
