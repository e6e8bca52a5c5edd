//! Domain Layer - Pure crawler logic with no I/O
//!
//! This module contains:
//! - Endpoint, network and service-flag types
//! - The wire codec (framing, checksums, `version` / `addr` payloads)
//! - Exponentially decaying reliability statistics
//! - Address records and the good / ban / ignore policy
//! - The address book with its Unknown / Tracked / Good / Banned indices
//! - The sans-I/O peer probe state machine

pub mod address_record;
pub mod address_store;
pub mod config;
pub mod errors;
pub mod probe;
pub mod reliability;
/// Core domain types (entities, values)
pub mod types;
pub mod wire;

pub use address_record::{AddressRecord, PolicyConfig};
pub use address_store::{
    AddressBook, BadOutcome, BanTable, BookSnapshot, Candidate, DumpEntry, Selection, StoreStats,
    SNAPSHOT_VERSION,
};
pub use config::{CrawlerConfig, LogConfig, SeederConfig, StoreConfig};
pub use errors::{BanReason, InvalidConfig, ProbeFailure, StoreError, WireError};
pub use probe::{ProbeConfig, ProbeMachine, ProbeOutcome, ProbeReport, ProbeRequest, ProbeState};
pub use reliability::{ReliabilityStat, ReliabilityStats, Window};
pub use types::*;
