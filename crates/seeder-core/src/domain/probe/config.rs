//! Probe timeouts and limits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::Network;

/// Probe configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// TCP connect timeout.
    pub connect_timeout_secs: u64,
    /// Idle wait during the handshake, and the drain deadline after `getaddr`.
    pub response_timeout_secs: u64,
    /// Connect timeout for anonymised networks.
    pub anonymized_connect_timeout_secs: u64,
    /// Response timeout for anonymised networks.
    pub anonymized_response_timeout_secs: u64,
    /// Remaining drain time once a real `addr` batch has arrived.
    pub drain_after_batch_secs: u64,
    /// Collected addresses that end the probe at once.
    pub max_addresses: usize,
    /// Ban for malformed input or protocol violations.
    pub misbehavior_ban_secs: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 5,
            response_timeout_secs: 30,
            anonymized_connect_timeout_secs: 20,
            anonymized_response_timeout_secs: 120,
            drain_after_batch_secs: 1,
            max_addresses: 1000,
            misbehavior_ban_secs: 100_000,
        }
    }
}

impl ProbeConfig {
    /// Connect timeout for an endpoint on `network`.
    pub fn connect_timeout(&self, network: Network) -> Duration {
        if network.is_anonymized() {
            Duration::from_secs(self.anonymized_connect_timeout_secs)
        } else {
            Duration::from_secs(self.connect_timeout_secs)
        }
    }

    /// Response timeout for an endpoint on `network`.
    pub fn response_timeout(&self, network: Network) -> Duration {
        if network.is_anonymized() {
            Duration::from_secs(self.anonymized_response_timeout_secs)
        } else {
            Duration::from_secs(self.response_timeout_secs)
        }
    }
}
