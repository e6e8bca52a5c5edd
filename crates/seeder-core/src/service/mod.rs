//! # Seeder Services
//!
//! - `AddressStore`: the shared, lock-owning handle on the address book.
//!   Crawler workers write through it; the DNS front-end reads through
//!   the `SeedQuery` port.
//! - `CrawlScheduler`: the worker pool that keeps selecting, probing and
//!   recording (requires the `network` feature).

mod store;
#[cfg(feature = "network")]
mod scheduler;

pub use store::AddressStore;
#[cfg(feature = "network")]
pub use scheduler::{CrawlScheduler, CrawlStep};
