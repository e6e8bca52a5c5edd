//! # Driven Ports (Outbound SPI)
//!
//! These are the interfaces the crawler **requires** from the host.

use async_trait::async_trait;

use crate::domain::{ProbeReport, ProbeRequest, SeederConfig, Timestamp};

/// 256-bit digest used for message checksums and snapshot trailers.
///
/// The protocol default is double SHA-256 (`adapters::Sha256dDigest`).
pub trait Digest256: Send + Sync {
    /// Digest of a complete buffer.
    fn digest256(&self, data: &[u8]) -> [u8; 32];

    /// Incremental digest over data fed in pieces.
    fn accumulator(&self) -> Box<dyn DigestAccumulator>;
}

/// Running state of an incremental `Digest256`.
pub trait DigestAccumulator: Send {
    fn update(&mut self, data: &[u8]);

    /// Consume the accumulator and produce the digest.
    fn finalize(self: Box<Self>) -> [u8; 32];
}

/// Abstract interface for time-related operations.
///
/// Enables deterministic testing by injecting controllable time sources.
pub trait TimeSource: Send + Sync {
    /// Get the current timestamp.
    fn now(&self) -> Timestamp;
}

/// Abstract interface for configuration loading.
pub trait ConfigProvider: Send + Sync {
    /// Full seeder configuration.
    fn get_seeder_config(&self) -> SeederConfig;

    /// `host:port` seeds to admit at start.
    fn get_seeds(&self) -> Vec<String> {
        self.get_seeder_config().crawler.seeds
    }
}

/// Runs one probe to completion.
///
/// A probe never fails as a call: every connection problem, timeout or
/// misbehaviour ends up in the report's outcome.
#[async_trait]
pub trait PeerProber: Send + Sync {
    async fn probe(&self, request: ProbeRequest) -> ProbeReport;
}
