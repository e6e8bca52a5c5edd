use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::domain::{
    AddressBook, AllowedNetworks, BadOutcome, BookSnapshot, DiscoveredAddress, DumpEntry, Endpoint,
    PeerMeta, ProbeOutcome, ProbeReport, Selection, ServiceFlags, StoreError, StoreStats, Timestamp,
};
use crate::ports::{SeedQuery, TimeSource};

/// Shared handle on the address book.
///
/// Cloning is cheap; every clone sees the same book. Mutations take the
/// write lock for the duration of one book operation, queries take the
/// read lock, and no lock is held across an await point.
///
/// # Example
///
/// ```rust,ignore
/// let store = AddressStore::new(AddressBook::new(params, policy), Arc::new(SystemTimeSource));
/// store.ingest(&seeds, true);
/// let answer = store.query_good(ServiceFlags::NETWORK, 25, AllowedNetworks::clearnet());
/// ```
#[derive(Clone)]
pub struct AddressStore {
    book: Arc<RwLock<AddressBook>>,
    time_source: Arc<dyn TimeSource>,
}

impl AddressStore {
    pub fn new(book: AddressBook, time_source: Arc<dyn TimeSource>) -> Self {
        Self {
            book: Arc::new(RwLock::new(book)),
            time_source,
        }
    }

    /// Get the current timestamp from the time source.
    pub fn now(&self) -> Timestamp {
        self.time_source.now()
    }

    /// Run `f` against the book under the read lock.
    pub fn read<T>(&self, f: impl FnOnce(&AddressBook) -> T) -> T {
        f(&self.book.read())
    }

    pub fn select(&self) -> Selection {
        let now = self.now();
        self.book.write().select(now, &mut rand::thread_rng())
    }

    pub fn ingest(&self, discovered: &[DiscoveredAddress], force: bool) -> usize {
        let now = self.now();
        self.book.write().ingest(discovered, force, now)
    }

    pub fn record_good(&self, endpoint: &Endpoint, peer: PeerMeta) -> Result<(), StoreError> {
        let now = self.now();
        self.book.write().record_good(endpoint, peer, now)
    }

    pub fn record_bad(&self, endpoint: &Endpoint, ban_hint_secs: u64) -> Result<BadOutcome, StoreError> {
        let now = self.now();
        self.book.write().record_bad(endpoint, ban_hint_secs, now)
    }

    pub fn record_skipped(&self, endpoint: &Endpoint) -> Result<(), StoreError> {
        self.book.write().record_skipped(endpoint)
    }

    /// Apply a finished probe: its outcome first, then whatever it learned.
    pub fn apply_report(&self, report: &ProbeReport) -> Result<(), StoreError> {
        let now = self.now();
        let mut book = self.book.write();
        match report.outcome {
            ProbeOutcome::Success => book.record_good(&report.target, report.peer.clone(), now)?,
            _ => {
                book.record_bad(&report.target, report.ban_secs, now)?;
            }
        }
        if !report.discovered.is_empty() {
            book.ingest(&report.discovered, false, now);
        }
        Ok(())
    }

    /// Clear every ignore cooldown, e.g. after a local outage.
    pub fn reset_ignores(&self) {
        self.book.write().reset_ignores();
        info!("ignore cooldowns cleared");
    }

    /// Forget long-expired bans so the ban table does not grow without bound.
    pub fn prune_bans(&self) -> usize {
        let now = self.now();
        let pruned = self.book.write().prune_bans(now);
        if pruned > 0 {
            debug!(pruned, "expired bans pruned");
        }
        pruned
    }

    pub fn snapshot(&self) -> BookSnapshot {
        self.book.read().snapshot()
    }

    pub fn dump_entries(&self) -> Vec<DumpEntry> {
        self.book.read().dump_entries()
    }
}

impl SeedQuery for AddressStore {
    fn query_good(&self, services: ServiceFlags, max: usize, networks: AllowedNetworks) -> Vec<Endpoint> {
        self.book
            .read()
            .query_good(services, max, networks, &mut rand::thread_rng())
    }

    fn stats(&self) -> StoreStats {
        let now = self.now();
        self.book.read().stats(now)
    }
}
