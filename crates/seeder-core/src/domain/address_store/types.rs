//! Values returned by the address book.

use crate::domain::{Endpoint, ServiceFlags, Timestamp};

/// Internal record key. Never reused within one book.
pub type RecordId = u64;

/// A record handed out for probing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub endpoint: Endpoint,
    pub services: ServiceFlags,
    pub our_last_success: Timestamp,
}

/// Result of asking the book for something to probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Probe this endpoint, then report the outcome.
    Candidate(Candidate),
    /// Nothing is due; ask again after `retry_after_secs`.
    Empty { retry_after_secs: u64 },
}

/// Whether `record_bad` kept or banned the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadOutcome {
    /// Re-queued for a later retry.
    Retained,
    /// Record deleted and endpoint banned for `ban_secs`.
    Banned { ban_secs: u64 },
}

/// Point-in-time counters for the status line.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StoreStats {
    pub records: usize,
    pub unknown: usize,
    pub tracked: usize,
    pub good: usize,
    pub banned: usize,
    /// Selected and not yet reported back.
    pub in_flight: usize,
    /// Mean reliability per window over records we have probed.
    pub avg_reliability: [f64; 5],
    /// Mean seconds since our last probe over records we have probed.
    pub avg_probe_age_secs: u64,
}

/// One line of the human-readable dump.
#[derive(Debug, Clone, PartialEq)]
pub struct DumpEntry {
    pub endpoint: Endpoint,
    pub good: bool,
    pub last_success: Timestamp,
    pub reliabilities: [f64; 5],
    pub height: i32,
    pub services: ServiceFlags,
    pub client_version: i32,
    pub sub_version: String,
}
