//! Banned endpoint tracking.

use std::collections::HashMap;

use crate::domain::{Endpoint, Timestamp};

/// Endpoints excluded from crawling, with the time their ban ends.
///
/// A banned endpoint has no address record. An expired entry is kept until
/// the endpoint is rediscovered or the entry is pruned, so stale gossip
/// cannot revive it.
#[derive(Debug, Clone, Default)]
pub struct BanTable {
    entries: HashMap<Endpoint, Timestamp>,
}

impl BanTable {
    /// Create an empty ban table.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Ban until `until`, replacing any earlier entry.
    pub fn ban(&mut self, endpoint: Endpoint, until: Timestamp) {
        self.entries.insert(endpoint, until);
    }

    /// Ban expiry for an endpoint, expired or not.
    pub fn expiry(&self, endpoint: &Endpoint) -> Option<Timestamp> {
        self.entries.get(endpoint).copied()
    }

    /// Check if an endpoint is currently banned.
    pub fn is_banned(&self, endpoint: &Endpoint, now: Timestamp) -> bool {
        self.entries.get(endpoint).is_some_and(|until| *until > now)
    }

    /// Forget an endpoint's ban.
    pub fn remove(&mut self, endpoint: &Endpoint) -> bool {
        self.entries.remove(endpoint).is_some()
    }

    /// Drop entries that expired before `before`. Returns how many went.
    pub fn prune_expired(&mut self, before: Timestamp) -> usize {
        let len = self.entries.len();
        self.entries.retain(|_, until| *until >= before);
        len - self.entries.len()
    }

    /// Get count of active bans
    pub fn count(&self, now: Timestamp) -> usize {
        self.entries.values().filter(|until| **until > now).count()
    }

    /// Every entry, including expired ones.
    pub fn iter(&self) -> impl Iterator<Item = (&Endpoint, &Timestamp)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
