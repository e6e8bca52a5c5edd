//! # Seeder Crawler Core
//!
//! The crawling half of a DNS seeder for a Bitcoin-family peer-to-peer
//! network: it keeps probing every known address, ranks each one by
//! exponentially decaying reliability, and answers "give me some good
//! nodes" queries for a DNS front-end.
//!
//! ## Pure Core
//!
//! The domain layer (wire codec, reliability statistics, address book,
//! probe state machine) is synchronous and does no I/O. Sockets, config
//! files and the worker pool are feature-gated:
//!
//! - `network` - Tokio TCP prober, TOML config, crawl scheduler (default)
//! - `test-utils` - `FixedTimeSource`, `ScriptedProber`
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture with:
//! - **Domain Layer:** codec, statistics, records, address book, probe machine
//! - **Ports Layer:** `Digest256`, `TimeSource`, `ConfigProvider`, `PeerProber`, `SeedQuery`
//! - **Service Layer:** `AddressStore` (shared book), `CrawlScheduler` (workers)
//! - **Adapters Layer:** double SHA-256, system clock, TCP, snapshot files
//!
//! ## Example
//!
//! ```rust
//! use seeder_core::{
//!     AddressBook, AllowedNetworks, ChainParams, DiscoveredAddress, Endpoint, IpAddr, PeerMeta,
//!     PolicyConfig, Selection, ServiceFlags, Timestamp,
//! };
//! use rand::thread_rng;
//!
//! let params = ChainParams::default();
//! let mut book = AddressBook::new(params, PolicyConfig::default());
//! let now = Timestamp::new(1_700_000_000);
//!
//! let seed = Endpoint::new(IpAddr::v4(8, 8, 8, 8), 8333);
//! book.ingest(&[DiscoveredAddress::new(seed, ServiceFlags::NETWORK, now)], true, now);
//!
//! let Selection::Candidate(candidate) = book.select(now, &mut thread_rng()) else {
//!     panic!("seed should be due");
//! };
//! book.record_good(&candidate.endpoint, PeerMeta::default(), now).unwrap();
//!
//! let answer = book.query_good(ServiceFlags::NETWORK, 10, AllowedNetworks::all(), &mut thread_rng());
//! assert_eq!(answer, vec![seed]);
//! ```

// =============================================================================
// CORE MODULES
// =============================================================================

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

// =============================================================================
// FEATURE-GATED MODULES
// =============================================================================

/// Test utilities (FixedTimeSource, ScriptedProber)
/// Requires feature: `test-utils`
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// =============================================================================
// CORE RE-EXPORTS (Always Available)
// =============================================================================

// Domain entities
pub use domain::{
    AllowedNetworks, ChainParams, DiscoveredAddress, Endpoint, IpAddr, Network, PeerMeta,
    ServiceFlags, Timestamp,
};

// Address book and policy
pub use domain::{
    AddressBook, AddressRecord, BadOutcome, BookSnapshot, Candidate, DumpEntry, PolicyConfig,
    ReliabilityStat, ReliabilityStats, Selection, StoreStats, Window,
};

// Probe
pub use domain::{ProbeConfig, ProbeMachine, ProbeOutcome, ProbeReport, ProbeRequest, ProbeState};

// Configuration and errors
pub use domain::{
    BanReason, CrawlerConfig, InvalidConfig, LogConfig, ProbeFailure, SeederConfig, StoreConfig,
    StoreError, WireError,
};

// Port traits
pub use ports::{ConfigProvider, Digest256, DigestAccumulator, PeerProber, SeedQuery, TimeSource};

// Service
pub use service::AddressStore;

// Adapters
pub use adapters::{
    load_snapshot, save_snapshot, write_dump, PersistenceError, Sha256dDigest,
    StaticConfigProvider, SystemTimeSource,
};

// =============================================================================
// NETWORK RE-EXPORTS (Requires `network` feature)
// =============================================================================

#[cfg(feature = "network")]
pub use adapters::{ConfigError, TcpProber, TomlConfigProvider};

#[cfg(feature = "network")]
pub use service::{CrawlScheduler, CrawlStep};

// =============================================================================
// TEST UTILITIES (Requires `test-utils` feature)
// =============================================================================

#[cfg(feature = "test-utils")]
pub use test_utils::{FixedTimeSource, ScriptedProber, ScriptedResponse};
