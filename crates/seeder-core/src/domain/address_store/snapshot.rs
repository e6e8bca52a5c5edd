//! Serializable image of an address book.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::book::AddressBook;
use crate::domain::address_record::{AddressRecord, PolicyConfig};
use crate::domain::{ChainParams, Endpoint, StoreError, Timestamp};

/// Bumped whenever the snapshot layout changes.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Every record with full statistics, plus the ban table.
///
/// Membership indices are not stored; they are rebuilt on restore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookSnapshot {
    pub version: u32,
    pub records: Vec<AddressRecord>,
    pub banned: Vec<(Endpoint, Timestamp)>,
}

impl AddressBook {
    /// Capture the book. Records come out in creation order.
    pub fn snapshot(&self) -> BookSnapshot {
        let mut ids: Vec<_> = self.records.keys().copied().collect();
        ids.sort_unstable();
        let records = ids
            .iter()
            .filter_map(|id| self.records.get(id))
            .cloned()
            .collect();

        let mut banned: Vec<_> = self.banned.iter().map(|(e, t)| (*e, *t)).collect();
        banned.sort_unstable();

        BookSnapshot {
            version: SNAPSHOT_VERSION,
            records,
            banned,
        }
    }

    /// Rebuild a book from a snapshot.
    ///
    /// Records we probed become tracked, oldest probe first; the rest are
    /// unknown. A record is good again if its last probe succeeded and it
    /// still classifies as good.
    pub fn restore(snapshot: BookSnapshot, params: ChainParams, policy: PolicyConfig) -> Result<Self, StoreError> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(StoreError::UnsupportedSnapshotVersion(snapshot.version));
        }

        let mut book = AddressBook::new(params, policy);
        for (endpoint, until) in snapshot.banned {
            book.banned.ban(endpoint, until);
        }

        let mut probed = Vec::new();
        for record in snapshot.records {
            let endpoint = record.endpoint;
            if book.by_endpoint.contains_key(&endpoint) {
                return Err(StoreError::InconsistentSnapshot(format!("duplicate record for {}", endpoint)));
            }
            if book.banned.expiry(&endpoint).is_some() {
                return Err(StoreError::InconsistentSnapshot(format!("{} is both banned and recorded", endpoint)));
            }

            let id = book.next_id;
            book.next_id += 1;
            if record.probed_by_us() {
                probed.push((record.our_last_try, id));
                if record.our_last_success == record.our_last_try && record.is_good(&book.params, &book.policy) {
                    book.good.insert(id);
                }
            } else {
                book.unknown.insert(id);
            }
            book.by_endpoint.insert(endpoint, id);
            book.records.insert(id, record);
        }

        probed.sort_unstable();
        for (_, id) in probed {
            book.tracked_set.insert(id);
            book.tracked.push_back(id);
        }

        debug!(
            records = book.records.len(),
            good = book.good.len(),
            banned = book.banned.len(),
            "address book restored"
        );
        Ok(book)
    }
}
