//! # Driving Ports (Inbound API)
//!
//! The read side a DNS front-end answers queries from.

use crate::domain::{AllowedNetworks, Endpoint, ServiceFlags, StoreStats};

/// Good-node lookup for DNS answers.
///
/// Implementations must not block on I/O: the front-end calls this on
/// every query.
///
/// # Example
///
/// ```rust,ignore
/// fn answer<Q: SeedQuery>(store: &Q) -> Vec<Endpoint> {
///     store.query_good(ServiceFlags::NETWORK, 25, AllowedNetworks::clearnet())
/// }
/// ```
pub trait SeedQuery: Send + Sync {
    /// Up to `max` good endpoints offering `services`, reachable on `networks`.
    ///
    /// With no good endpoints at all, at most one not-yet-good endpoint is
    /// returned so a cold seeder still answers.
    fn query_good(&self, services: ServiceFlags, max: usize, networks: AllowedNetworks) -> Vec<Endpoint>;

    /// Current store counters.
    fn stats(&self) -> StoreStats;
}
