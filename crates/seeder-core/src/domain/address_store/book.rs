//! The unsynchronised address book.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, info};

use super::banned::BanTable;
use super::types::{BadOutcome, Candidate, DumpEntry, RecordId, Selection, StoreStats};
use crate::domain::address_record::{AddressRecord, PolicyConfig};
use crate::domain::reliability::Window;
use crate::domain::{
    AllowedNetworks, ChainParams, DiscoveredAddress, Endpoint, PeerMeta, ServiceFlags, StoreError,
    Timestamp,
};

/// How long an expired ban is remembered. Gossip older than this never
/// reaches the book, so it cannot revive a pruned entry.
const BAN_RETENTION_SECS: u64 = 7 * 86400;

/// All address records plus the membership indices over them.
///
/// Invariants:
/// - a record is in at most one of `unknown` and `tracked_set`;
/// - a record selected for probing is in neither until its outcome is recorded;
/// - `good` only holds ids of live records;
/// - a banned endpoint has no record.
///
/// `tracked` may hold ids of deleted records; they are skipped when reached.
#[derive(Debug, Clone)]
pub struct AddressBook {
    pub(super) params: ChainParams,
    pub(super) policy: PolicyConfig,
    pub(super) next_id: RecordId,
    pub(super) records: HashMap<RecordId, AddressRecord>,
    pub(super) by_endpoint: HashMap<Endpoint, RecordId>,
    pub(super) unknown: BTreeSet<RecordId>,
    pub(super) tracked: VecDeque<RecordId>,
    pub(super) tracked_set: HashSet<RecordId>,
    pub(super) good: BTreeSet<RecordId>,
    pub(super) banned: BanTable,
}

impl AddressBook {
    /// Create an empty book.
    pub fn new(params: ChainParams, policy: PolicyConfig) -> Self {
        Self {
            params,
            policy,
            next_id: 0,
            records: HashMap::new(),
            by_endpoint: HashMap::new(),
            unknown: BTreeSet::new(),
            tracked: VecDeque::new(),
            tracked_set: HashSet::new(),
            good: BTreeSet::new(),
            banned: BanTable::new(),
        }
    }

    pub fn params(&self) -> &ChainParams {
        &self.params
    }

    pub fn policy(&self) -> &PolicyConfig {
        &self.policy
    }

    /// Record for an endpoint, if any.
    pub fn get(&self, endpoint: &Endpoint) -> Option<&AddressRecord> {
        self.by_endpoint.get(endpoint).and_then(|id| self.records.get(id))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_unknown(&self, endpoint: &Endpoint) -> bool {
        self.by_endpoint
            .get(endpoint)
            .is_some_and(|id| self.unknown.contains(id))
    }

    pub fn is_tracked(&self, endpoint: &Endpoint) -> bool {
        self.by_endpoint
            .get(endpoint)
            .is_some_and(|id| self.tracked_set.contains(id))
    }

    pub fn is_good(&self, endpoint: &Endpoint) -> bool {
        self.by_endpoint
            .get(endpoint)
            .is_some_and(|id| self.good.contains(id))
    }

    pub fn is_banned(&self, endpoint: &Endpoint, now: Timestamp) -> bool {
        self.banned.is_banned(endpoint, now)
    }

    // =========================================================================
    // CANDIDATE SELECTION
    // =========================================================================

    /// Pick the next endpoint to probe.
    ///
    /// Draws between unknown and tracked in proportion to their sizes. A
    /// tracked draw takes the queue head and declines if it was probed less
    /// than `min_retry_secs` ago. Records under an ignore cooldown go back
    /// to the tail of the tracked queue.
    pub fn select<R: Rng + ?Sized>(&mut self, now: Timestamp, rng: &mut R) -> Selection {
        let empty = Selection::Empty {
            retry_after_secs: self.policy.empty_retry_secs,
        };

        // Every record can be pushed back at most once per call.
        let attempts = self.unknown.len() + self.tracked_set.len();
        for _ in 0..=attempts {
            self.drop_stale_tracked_head();
            let total = self.unknown.len() + self.tracked_set.len();
            if total == 0 {
                return empty;
            }

            let id = if rng.gen_range(0..total) < self.unknown.len() {
                match self.unknown.pop_last() {
                    Some(id) => id,
                    None => return empty,
                }
            } else {
                let Some(&head) = self.tracked.front() else {
                    return empty;
                };
                let since = self
                    .records
                    .get(&head)
                    .map_or(u64::MAX, |r| now.secs_since(r.our_last_try));
                if since < self.policy.min_retry_secs {
                    return Selection::Empty {
                        retry_after_secs: self.policy.min_retry_secs - since,
                    };
                }
                self.tracked.pop_front();
                self.tracked_set.remove(&head);
                head
            };

            let Some(record) = self.records.get(&id) else {
                continue;
            };
            if record.is_ignored(now) {
                self.push_tracked(id);
                continue;
            }

            return Selection::Candidate(Candidate {
                endpoint: record.endpoint,
                services: record.services,
                our_last_success: record.our_last_success,
            });
        }

        empty
    }

    fn drop_stale_tracked_head(&mut self) {
        while let Some(&head) = self.tracked.front() {
            if self.tracked_set.contains(&head) && self.records.contains_key(&head) {
                break;
            }
            self.tracked.pop_front();
        }
    }

    fn push_tracked(&mut self, id: RecordId) {
        if self.tracked_set.insert(id) {
            self.tracked.push_back(id);
        }
    }

    // =========================================================================
    // INGEST
    // =========================================================================

    /// Learn addresses from gossip or the seed list. Returns how many were new.
    ///
    /// Without `force`, non-routable endpoints are dropped and a banned
    /// endpoint is only re-admitted once its ban has expired and the gossip
    /// is newer than the expiry. `force` re-admits banned endpoints and
    /// clears ignore cooldowns.
    pub fn ingest(&mut self, discovered: &[DiscoveredAddress], force: bool, now: Timestamp) -> usize {
        let mut added = 0;
        for addr in discovered {
            let endpoint = addr.endpoint;
            if !force && !endpoint.is_routable() {
                continue;
            }

            if let Some(until) = self.banned.expiry(&endpoint) {
                if force || (until < now && addr.timestamp > until) {
                    self.banned.remove(&endpoint);
                } else {
                    continue;
                }
            }

            if let Some(id) = self.by_endpoint.get(&endpoint) {
                if let Some(record) = self.records.get_mut(id) {
                    record.merge(addr.services, addr.timestamp);
                    if force {
                        record.ignore_till = Timestamp::default();
                    }
                }
                continue;
            }

            let id = self.next_id;
            self.next_id += 1;
            self.records
                .insert(id, AddressRecord::new(endpoint, addr.services, addr.timestamp));
            self.by_endpoint.insert(endpoint, id);
            self.unknown.insert(id);
            added += 1;
        }

        if added > 0 {
            debug!(added, total = self.records.len(), "ingested addresses");
        }
        added
    }

    // =========================================================================
    // OUTCOME RECORDING
    // =========================================================================

    /// Apply a successful probe.
    pub fn record_good(&mut self, endpoint: &Endpoint, peer: PeerMeta, now: Timestamp) -> Result<(), StoreError> {
        let id = self.lookup(endpoint)?;
        self.unknown.remove(&id);
        self.banned.remove(endpoint);

        let record = self
            .records
            .get_mut(&id)
            .ok_or_else(|| StoreError::UnknownEndpoint(endpoint.to_string()))?;
        record.peer = peer;
        record.record_outcome(true, now, &self.params, &self.policy);

        if record.is_good(&self.params, &self.policy) {
            if self.good.insert(id) {
                info!(endpoint = %endpoint, good = self.good.len(), "endpoint is good");
            }
        } else if self.good.remove(&id) {
            debug!(endpoint = %endpoint, good = self.good.len(), "endpoint no longer good");
        }

        self.push_tracked(id);
        Ok(())
    }

    /// Apply a failed probe, banning for at least `ban_hint_secs`.
    ///
    /// The effective ban is the larger of the hint and the record's own
    /// terrible-reliability ban. A banned record is deleted outright.
    pub fn record_bad(&mut self, endpoint: &Endpoint, ban_hint_secs: u64, now: Timestamp) -> Result<BadOutcome, StoreError> {
        let id = self.lookup(endpoint)?;
        self.unknown.remove(&id);

        let record = self
            .records
            .get_mut(&id)
            .ok_or_else(|| StoreError::UnknownEndpoint(endpoint.to_string()))?;
        record.record_outcome(false, now, &self.params, &self.policy);
        let ban_secs = ban_hint_secs.max(record.ban_secs(&self.params, &self.policy));

        if ban_secs > 0 {
            self.banned.ban(*endpoint, now.add_secs(ban_secs));
            self.remove_record(id);
            info!(endpoint = %endpoint, ban_secs, "endpoint banned");
            return Ok(BadOutcome::Banned { ban_secs });
        }

        if self.good.remove(&id) {
            debug!(endpoint = %endpoint, good = self.good.len(), "endpoint no longer good");
        }
        self.push_tracked(id);
        Ok(BadOutcome::Retained)
    }

    /// Return a candidate that was not probed. Statistics are untouched.
    pub fn record_skipped(&mut self, endpoint: &Endpoint) -> Result<(), StoreError> {
        let id = self.lookup(endpoint)?;
        self.unknown.remove(&id);
        self.push_tracked(id);
        Ok(())
    }

    fn lookup(&self, endpoint: &Endpoint) -> Result<RecordId, StoreError> {
        self.by_endpoint
            .get(endpoint)
            .copied()
            .ok_or_else(|| StoreError::UnknownEndpoint(endpoint.to_string()))
    }

    fn remove_record(&mut self, id: RecordId) {
        if let Some(record) = self.records.remove(&id) {
            self.by_endpoint.remove(&record.endpoint);
        }
        self.unknown.remove(&id);
        self.tracked_set.remove(&id);
        self.good.remove(&id);
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Up to `max` good endpoints offering `services`, reachable on `networks`.
    ///
    /// `max` is clamped to at least one. The sample is drawn before the
    /// network filter, so fewer than `max` may come back. With no good
    /// records at all, a single tracked (else unknown) record is offered so
    /// a cold store still answers.
    pub fn query_good<R: Rng + ?Sized>(
        &self,
        services: ServiceFlags,
        max: usize,
        networks: AllowedNetworks,
        rng: &mut R,
    ) -> Vec<Endpoint> {
        if self.good.is_empty() {
            let fallback = self
                .tracked
                .iter()
                .find(|id| self.tracked_set.contains(id) && self.records.contains_key(id))
                .or_else(|| self.unknown.first())
                .and_then(|id| self.records.get(id));
            return fallback
                .filter(|r| r.services.contains(services))
                .map(|r| vec![r.endpoint])
                .unwrap_or_default();
        }

        let filtered: Vec<&AddressRecord> = self
            .good
            .iter()
            .filter_map(|id| self.records.get(id))
            .filter(|r| r.services.contains(services))
            .collect();
        if filtered.is_empty() {
            return Vec::new();
        }

        let amount = max.clamp(1, filtered.len());
        filtered
            .choose_multiple(rng, amount)
            .filter(|r| networks.contains(r.endpoint.network()))
            .map(|r| r.endpoint)
            .collect()
    }

    /// Clear every ignore cooldown.
    pub fn reset_ignores(&mut self) {
        for record in self.records.values_mut() {
            record.ignore_till = Timestamp::default();
        }
    }

    /// Forget bans that expired more than a week before `now`.
    pub fn prune_bans(&mut self, now: Timestamp) -> usize {
        self.banned.prune_expired(now.sub_secs(BAN_RETENTION_SECS))
    }

    /// Counters for the status line.
    pub fn stats(&self, now: Timestamp) -> StoreStats {
        let probed: Vec<&AddressRecord> = self.records.values().filter(|r| r.probed_by_us()).collect();

        let mut avg_reliability = [0.0; 5];
        let mut avg_probe_age_secs = 0;
        if !probed.is_empty() {
            let n = probed.len() as f64;
            for record in &probed {
                for (slot, value) in avg_reliability.iter_mut().zip(record.stats.reliabilities()) {
                    *slot += value / n;
                }
            }
            let total_age: u64 = probed.iter().map(|r| now.secs_since(r.our_last_try)).sum();
            avg_probe_age_secs = total_age / probed.len() as u64;
        }

        StoreStats {
            records: self.records.len(),
            unknown: self.unknown.len(),
            tracked: self.tracked_set.len(),
            good: self.good.len(),
            banned: self.banned.count(now),
            in_flight: self.records.len() - self.unknown.len() - self.tracked_set.len(),
            avg_reliability,
            avg_probe_age_secs,
        }
    }

    /// Every record that ever answered a probe, most reliable first.
    pub fn dump_entries(&self) -> Vec<DumpEntry> {
        let mut entries: Vec<DumpEntry> = self
            .records
            .iter()
            .filter(|(_, r)| r.success > 0)
            .map(|(id, r)| DumpEntry {
                endpoint: r.endpoint,
                good: self.good.contains(id),
                last_success: r.our_last_success,
                reliabilities: r.stats.reliabilities(),
                height: r.peer.height,
                services: r.services,
                client_version: r.peer.client_version,
                sub_version: r.peer.sub_version.clone(),
            })
            .collect();

        let month = Window::OneMonth.index();
        entries.sort_by(|a, b| {
            b.reliabilities[month]
                .total_cmp(&a.reliabilities[month])
                .then_with(|| a.endpoint.cmp(&b.endpoint))
        });
        entries
    }
}
