//! # Address Book
//!
//! The set of address records and the indices the crawler schedules from:
//!
//! - **Unknown**: heard about, never probed by us
//! - **Tracked**: probed at least once, queued for re-probing
//! - **Good**: currently fit to hand out to DNS queriers
//! - **Banned**: endpoint to ban expiry, no record kept
//!
//! The book itself is not synchronised; `service::AddressStore` owns the lock.

mod banned;
mod book;
mod snapshot;
mod types;

pub use banned::BanTable;
pub use book::AddressBook;
pub use snapshot::{BookSnapshot, SNAPSHOT_VERSION};
pub use types::{BadOutcome, Candidate, DumpEntry, RecordId, Selection, StoreStats};

#[cfg(test)]
mod tests;
