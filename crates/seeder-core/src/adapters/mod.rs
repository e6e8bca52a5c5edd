//! # Adapters
//!
//! Concrete implementations of the outbound ports.
//!
//! - `hashing` - double SHA-256 digest
//! - `network` - system clock, config providers, tokio TCP prober
//! - `persistence` - snapshot files and the text dump

pub mod hashing;
pub mod network;
pub mod persistence;

pub use hashing::Sha256dDigest;
pub use network::{StaticConfigProvider, SystemTimeSource};
pub use persistence::{
    load_snapshot, save_snapshot, write_dump, HashingReader, HashingWriter, PersistenceError,
};

#[cfg(feature = "network")]
pub use network::{ConfigError, TcpProber, TomlConfigProvider};
