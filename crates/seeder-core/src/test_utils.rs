//! Test utilities for the seeder.
//!
//! Deterministic stand-ins for the clock and the network.
//! Enable with the `test-utils` feature flag.
//!
//! # Example
//!
//! ```rust,ignore
//! use seeder_core::test_utils::FixedTimeSource;
//! use seeder_core::TimeSource;
//!
//! let time_source = FixedTimeSource::new(1000);
//! time_source.advance(5);
//! assert_eq!(time_source.now().as_secs(), 1005);
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::domain::{
    BanReason, DiscoveredAddress, Endpoint, PeerMeta, ProbeFailure, ProbeOutcome, ProbeReport,
    ProbeRequest, ServiceFlags, Timestamp,
};
use crate::ports::{PeerProber, TimeSource};

/// A time source that only moves when told to.
#[derive(Debug, Default)]
pub struct FixedTimeSource {
    timestamp: AtomicU64,
}

impl FixedTimeSource {
    /// Create a time source stopped at `timestamp` seconds.
    pub fn new(timestamp: u64) -> Self {
        Self {
            timestamp: AtomicU64::new(timestamp),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, secs: u64) {
        self.timestamp.fetch_add(secs, Ordering::SeqCst);
    }

    /// Set the clock.
    pub fn set(&self, timestamp: u64) {
        self.timestamp.store(timestamp, Ordering::SeqCst);
    }
}

impl TimeSource for FixedTimeSource {
    fn now(&self) -> Timestamp {
        Timestamp::new(self.timestamp.load(Ordering::SeqCst))
    }
}

/// Scripted answer for one endpoint.
#[derive(Debug, Clone)]
pub enum ScriptedResponse {
    /// Handshake succeeds; `discovered` is returned if addresses were requested.
    Answer {
        peer: PeerMeta,
        services: ServiceFlags,
        discovered: Vec<DiscoveredAddress>,
    },
    /// The probe fails without a ban.
    Fail(ProbeFailure),
    /// The peer misbehaves.
    Misbehave { ban_secs: u64 },
}

/// Prober that answers from a script instead of the network.
///
/// Endpoints without a script entry fail with `ConnectFailure`. Every
/// request is recorded for later inspection.
#[derive(Debug, Default)]
pub struct ScriptedProber {
    script: Mutex<HashMap<Endpoint, ScriptedResponse>>,
    requests: Mutex<Vec<ProbeRequest>>,
}

impl ScriptedProber {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script `endpoint` to answer with a standard peer and `discovered`.
    pub fn answer(self, endpoint: Endpoint, discovered: Vec<DiscoveredAddress>) -> Self {
        let peer = PeerMeta {
            client_version: 70015,
            sub_version: "/scripted:1.0/".to_string(),
            height: 800_000,
        };
        self.respond(
            endpoint,
            ScriptedResponse::Answer {
                peer,
                services: ServiceFlags::NETWORK,
                discovered,
            },
        )
    }

    /// Script an arbitrary response for `endpoint`.
    pub fn respond(self, endpoint: Endpoint, response: ScriptedResponse) -> Self {
        self.set(endpoint, response);
        self
    }

    /// Replace the response for `endpoint` while in use.
    pub fn set(&self, endpoint: Endpoint, response: ScriptedResponse) {
        self.script.lock().insert(endpoint, response);
    }

    /// Every request seen so far, in order.
    pub fn requests(&self) -> Vec<ProbeRequest> {
        self.requests.lock().clone()
    }

    /// Number of probes of `endpoint`.
    pub fn probe_count(&self, endpoint: &Endpoint) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.target == *endpoint)
            .count()
    }
}

#[async_trait]
impl PeerProber for ScriptedProber {
    async fn probe(&self, request: ProbeRequest) -> ProbeReport {
        self.requests.lock().push(request);
        let response = self.script.lock().get(&request.target).cloned();

        let mut report = ProbeReport {
            target: request.target,
            outcome: ProbeOutcome::Failure(ProbeFailure::ConnectFailure("unscripted".to_string())),
            ban_secs: 0,
            peer: PeerMeta::default(),
            services: ServiceFlags::NONE,
            discovered: Vec::new(),
        };
        match response {
            Some(ScriptedResponse::Answer {
                peer,
                services,
                discovered,
            }) => {
                report.outcome = ProbeOutcome::Success;
                report.peer = peer;
                report.services = services;
                if request.request_addresses {
                    report.discovered = discovered;
                }
            }
            Some(ScriptedResponse::Fail(failure)) => report.outcome = ProbeOutcome::Failure(failure),
            Some(ScriptedResponse::Misbehave { ban_secs }) => {
                report.outcome = ProbeOutcome::Banned(BanReason::ProtocolViolation("scripted"));
                report.ban_secs = ban_secs;
            }
            None => {}
        }
        report
    }
}
