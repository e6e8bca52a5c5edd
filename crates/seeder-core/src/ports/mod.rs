//! # Ports Layer - Hexagonal Architecture Boundaries
//!
//! - **Driving Ports (Inbound):** what the DNS front-end calls
//! - **Driven Ports (Outbound):** what the crawler needs from its host

pub mod inbound;
pub mod outbound;

pub use inbound::SeedQuery;
pub use outbound::{ConfigProvider, Digest256, DigestAccumulator, PeerProber, TimeSource};
