//! The record type and its classification.

use serde::{Deserialize, Serialize};

use super::policy::PolicyConfig;
use crate::domain::reliability::ReliabilityStats;
use crate::domain::{ChainParams, Endpoint, PeerMeta, ServiceFlags, Timestamp};

/// Everything the store knows about one endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressRecord {
    pub endpoint: Endpoint,
    pub services: ServiceFlags,
    /// Last time anyone (gossip or us) saw the peer.
    pub last_try: Timestamp,
    /// Last time we probed it; zero if never.
    pub our_last_try: Timestamp,
    pub our_last_success: Timestamp,
    /// Lifetime probe counters.
    pub total: u32,
    pub success: u32,
    pub stats: ReliabilityStats,
    /// Not selected again before this time; zero means no cooldown.
    pub ignore_till: Timestamp,
    pub peer: PeerMeta,
}

impl AddressRecord {
    /// Fresh record with zero counters.
    pub fn new(endpoint: Endpoint, services: ServiceFlags, last_try: Timestamp) -> Self {
        Self {
            endpoint,
            services,
            last_try,
            our_last_try: Timestamp::default(),
            our_last_success: Timestamp::default(),
            total: 0,
            success: 0,
            stats: ReliabilityStats::default(),
            ignore_till: Timestamp::default(),
            peer: PeerMeta::default(),
        }
    }

    /// Whether we have probed this record ourselves.
    pub fn probed_by_us(&self) -> bool {
        self.our_last_try.as_secs() != 0
    }

    /// Whether an ignore cooldown is still running at `now`.
    pub fn is_ignored(&self, now: Timestamp) -> bool {
        self.ignore_till.as_secs() != 0 && self.ignore_till > now
    }

    /// Record one probe outcome at `now`.
    ///
    /// The first probe has no previous sample to decay against, so it fully
    /// defines every statistic.
    pub fn record_outcome(&mut self, good: bool, now: Timestamp, params: &ChainParams, policy: &PolicyConfig) {
        let age = if self.probed_by_us() {
            now.secs_since(self.our_last_try)
        } else {
            u64::MAX
        };

        self.last_try = now;
        self.our_last_try = now;
        self.total = self.total.saturating_add(1);
        if good {
            self.success = self.success.saturating_add(1);
            self.our_last_success = now;
        }
        self.stats.update_all(good, age);

        let ignore = self.ignore_secs(params, policy);
        if ignore > 0 {
            let until = now.add_secs(ignore);
            if self.ignore_till < until {
                self.ignore_till = until;
            }
        }
    }

    /// Merge a gossip observation. Services only ever gain bits.
    pub fn merge(&mut self, services: ServiceFlags, seen: Timestamp) {
        if seen > self.last_try {
            self.last_try = seen;
        }
        self.services |= services;
    }

    /// Whether the record may be handed to DNS queriers.
    pub fn is_good(&self, params: &ChainParams, policy: &PolicyConfig) -> bool {
        if self.endpoint.port != params.default_port {
            return false;
        }
        if !self.services.contains(params.required_services) {
            return false;
        }
        if !self.endpoint.ip.is_routable() {
            return false;
        }
        if self.peer.client_version != 0 && self.peer.client_version < params.min_peer_version {
            return false;
        }
        if self.peer.height != 0 && self.peer.height < params.min_height {
            return false;
        }
        if self.total <= policy.small_sample_max_total
            && u64::from(self.success) * 2 >= u64::from(self.total)
        {
            return true;
        }
        policy.good_rules.iter().any(|rule| {
            let stat = self.stats.get(rule.window);
            stat.reliability() > rule.min_reliability && stat.count() > rule.min_count
        })
    }

    /// Terrible-reliability ban in seconds; zero when not terrible.
    pub fn ban_secs(&self, params: &ChainParams, policy: &PolicyConfig) -> u64 {
        if self.is_good(params, policy) {
            return 0;
        }
        policy
            .ban_rules
            .iter()
            .find(|rule| {
                let stat = self.stats.get(rule.window);
                stat.optimistic_reliability() < rule.max_score && stat.count() > rule.min_count
            })
            .map_or(0, |rule| rule.ban_secs)
    }

    /// Ignore cooldown in seconds; zero when the record may be retried normally.
    pub fn ignore_secs(&self, params: &ChainParams, policy: &PolicyConfig) -> u64 {
        if self.is_good(params, policy) {
            return 0;
        }
        policy
            .ignore_rules
            .iter()
            .find(|rule| {
                let stat = self.stats.get(rule.window);
                stat.optimistic_reliability() < rule.max_score && stat.count() > rule.min_count
            })
            .map_or(0, |rule| rule.ignore_secs)
    }
}
