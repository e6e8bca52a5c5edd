//! Seeder Configuration
//!
//! One aggregate with a section per component. Every field has a default,
//! so a config file only needs to name what it changes.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::address_record::PolicyConfig;
use super::errors::InvalidConfig;
use super::probe::ProbeConfig;
use super::types::{AllowedNetworks, ChainParams};

/// Crawler worker pool settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Concurrent probes.
    pub workers: usize,
    /// Networks we can open connections to. Others are never probed.
    pub probe_networks: AllowedNetworks,
    /// `host:port` entries admitted unconditionally at start.
    pub seeds: Vec<String>,
    /// Ask a peer for addresses only if our last success with it is older than this.
    pub getaddr_interval_secs: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            workers: 24,
            probe_networks: AllowedNetworks::clearnet(),
            seeds: Vec::new(),
            getaddr_interval_secs: 86400,
        }
    }
}

/// On-disk state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Binary snapshot restored at start and rewritten periodically.
    pub snapshot_path: PathBuf,
    /// Human-readable dump, written alongside each snapshot.
    pub dump_path: Option<PathBuf>,
    /// Seconds between snapshots.
    pub snapshot_interval_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            snapshot_path: PathBuf::from("seeder.dat"),
            dump_path: Some(PathBuf::from("seeder.dump")),
            snapshot_interval_secs: 600,
        }
    }
}

/// Logging defaults; `RUST_LOG` takes precedence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Complete seeder configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeederConfig {
    pub chain: ChainParams,
    pub crawler: CrawlerConfig,
    pub probe: ProbeConfig,
    pub policy: PolicyConfig,
    pub store: StoreConfig,
    pub log: LogConfig,
}

impl SeederConfig {
    /// Reject values the crawler cannot run with.
    pub fn validate(&self) -> Result<(), InvalidConfig> {
        let checks: [(bool, &'static str, &'static str); 6] = [
            (self.crawler.workers == 0, "crawler.workers", "must be at least 1"),
            (self.probe.max_addresses == 0, "probe.max_addresses", "must be at least 1"),
            (self.probe.response_timeout_secs == 0, "probe.response_timeout_secs", "must be positive"),
            (self.probe.connect_timeout_secs == 0, "probe.connect_timeout_secs", "must be positive"),
            (self.chain.default_port == 0, "chain.default_port", "must be non-zero"),
            (self.store.snapshot_interval_secs == 0, "store.snapshot_interval_secs", "must be positive"),
        ];
        for (failed, field, reason) in checks {
            if failed {
                return Err(InvalidConfig { field, reason });
            }
        }
        Ok(())
    }

    /// Small, fast settings for unit tests.
    #[cfg(test)]
    pub fn for_testing() -> Self {
        Self {
            chain: ChainParams::for_testing(),
            crawler: CrawlerConfig {
                workers: 2,
                ..CrawlerConfig::default()
            },
            policy: PolicyConfig::for_testing(),
            ..Self::default()
        }
    }
}
