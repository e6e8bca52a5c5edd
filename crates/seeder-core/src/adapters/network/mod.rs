//! # Network Adapters
//!
//! ## Adapters Provided
//!
//! - `SystemTimeSource` - Production time source using system clock
//! - `StaticConfigProvider` - In-code configuration
//! - `TomlConfigProvider` - Config file loading (requires "network" feature)
//! - `TcpProber` - Tokio TCP driver for the probe state machine (requires "network" feature)

/// Configuration providers
pub mod config;
/// Time source adapters
pub mod time;
/// TCP probe driver
#[cfg(feature = "network")]
pub mod tcp;

pub use config::StaticConfigProvider;
pub use time::SystemTimeSource;

#[cfg(feature = "network")]
pub use config::{ConfigError, TomlConfigProvider};

#[cfg(feature = "network")]
pub use tcp::TcpProber;
