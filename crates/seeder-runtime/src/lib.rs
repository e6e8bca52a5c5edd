//! # Seeder Runtime Library
//!
//! Wires the crawler core to the outside world: configuration, the
//! address store snapshot, seed resolution and the long-running tasks.
//! The main entry point is the `seeder` binary.
//!
//! ## Tasks
//!
//! - **Crawler**: `CrawlScheduler` workers probing the network
//! - **Housekeeping**: periodic snapshot + dump, status line every 30 s
//!
//! Both stop on the shared `watch` shutdown signal; a final snapshot is
//! written after they have joined.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use seeder_core::{
    load_snapshot, save_snapshot, write_dump, AddressBook, AddressStore, ConfigProvider,
    CrawlScheduler, Digest256, DiscoveredAddress, Endpoint, PeerProber, PersistenceError,
    SeedQuery, SeederConfig, ServiceFlags, Sha256dDigest, StaticConfigProvider, StoreConfig, StoreStats,
    SystemTimeSource, TcpProber, TimeSource, Timestamp, TomlConfigProvider, Window,
};

/// Interval of the store status line.
const STATUS_INTERVAL: Duration = Duration::from_secs(30);

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Load configuration from `path` (or built-in defaults) and append
/// `extra_seeds` to the configured seed list.
pub fn load_config(path: Option<&Path>, extra_seeds: Vec<String>) -> Result<SeederConfig> {
    let provider: Box<dyn ConfigProvider> = match path {
        Some(path) => Box::new(
            TomlConfigProvider::load(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
        ),
        None => Box::new(StaticConfigProvider::new()),
    };

    let mut config = provider.get_seeder_config();
    let mut seeds = provider.get_seeds();
    seeds.extend(extra_seeds);
    config.crawler.seeds = seeds;
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// `host:port` lookup target for a seed, adding `default_port` when absent.
pub fn seed_target(seed: &str, default_port: u16) -> String {
    if let Some((host, port)) = seed.rsplit_once(':') {
        let bare_host = !host.contains(':') || (host.starts_with('[') && host.ends_with(']'));
        if !host.is_empty() && bare_host && port.parse::<u16>().is_ok() {
            return seed.to_string();
        }
    }
    if seed.contains(':') && !seed.starts_with('[') {
        format!("[{seed}]:{default_port}")
    } else {
        format!("{seed}:{default_port}")
    }
}

/// Resolve seeds through the system resolver. Unresolvable seeds are logged
/// and skipped.
pub async fn resolve_seeds(seeds: &[String], default_port: u16, now: Timestamp) -> Vec<DiscoveredAddress> {
    let mut resolved = Vec::new();
    for seed in seeds {
        let target = seed_target(seed, default_port);
        match tokio::net::lookup_host(target.as_str()).await {
            Ok(addrs) => {
                let before = resolved.len();
                resolved.extend(
                    addrs.map(|addr| DiscoveredAddress::new(Endpoint::from(addr), ServiceFlags::NETWORK, now)),
                );
                debug!(seed = %seed, addresses = resolved.len() - before, "resolved seed");
            }
            Err(e) => warn!(seed = %seed, error = %e, "could not resolve seed"),
        };
    }
    resolved
}

// =============================================================================
// PERSISTENCE
// =============================================================================

/// Restore the store from its snapshot, or start empty.
///
/// A missing snapshot is normal on first start; an unreadable or
/// inconsistent one is logged and discarded.
pub fn restore_store(config: &SeederConfig, digest: &dyn Digest256, time_source: Arc<dyn TimeSource>) -> AddressStore {
    let path = &config.store.snapshot_path;
    let fresh = || AddressBook::new(config.chain.clone(), config.policy.clone());

    let book = match load_snapshot(path, digest) {
        Ok(Some(snapshot)) => match AddressBook::restore(snapshot, config.chain.clone(), config.policy.clone()) {
            Ok(book) => {
                info!(path = %path.display(), records = book.len(), "restored address store");
                book
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "snapshot rejected, starting empty");
                fresh()
            }
        },
        Ok(None) => {
            info!(path = %path.display(), "no snapshot found, starting empty");
            fresh()
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not read snapshot, starting empty");
            fresh()
        }
    };
    AddressStore::new(book, time_source)
}

/// Prune long-expired bans, then write the snapshot and, if configured,
/// the text dump.
pub fn persist(store: &AddressStore, digest: &dyn Digest256, config: &StoreConfig) -> Result<(), PersistenceError> {
    store.prune_bans();
    save_snapshot(&config.snapshot_path, &store.snapshot(), digest)?;
    if let Some(dump_path) = &config.dump_path {
        write_dump(dump_path, &store.dump_entries())?;
    }
    Ok(())
}

/// Average reliability per window, e.g. `2h 99.00% 8h 97.50% ...`.
pub fn reliability_summary(avg_reliability: &[f64; 5]) -> String {
    Window::ALL
        .iter()
        .zip(avg_reliability)
        .map(|(window, r)| format!("{} {:.2}%", window.label(), r * 100.0))
        .collect::<Vec<_>>()
        .join(" ")
}

fn log_status(stats: &StoreStats) {
    let reliability = reliability_summary(&stats.avg_reliability);
    info!(
        records = stats.records,
        unknown = stats.unknown,
        tracked = stats.tracked,
        good = stats.good,
        banned = stats.banned,
        in_flight = stats.in_flight,
        avg_age_secs = stats.avg_probe_age_secs,
        "status: {}",
        reliability
    );
}

/// Resolves once the shutdown signal reads `true` or its sender is gone.
async fn stopped(mut shutdown: watch::Receiver<bool>) {
    while !*shutdown.borrow_and_update() {
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

async fn housekeeping(
    store: AddressStore,
    digest: Arc<dyn Digest256>,
    config: StoreConfig,
    shutdown: watch::Receiver<bool>,
) {
    let period = Duration::from_secs(config.snapshot_interval_secs);
    let mut snapshots = interval_at(Instant::now() + period, period);
    snapshots.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut status = interval_at(Instant::now() + STATUS_INTERVAL, STATUS_INTERVAL);
    status.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let stop = stopped(shutdown);
    tokio::pin!(stop);

    loop {
        tokio::select! {
            _ = snapshots.tick() => match persist(&store, digest.as_ref(), &config) {
                Ok(()) => debug!(path = %config.snapshot_path.display(), "snapshot written"),
                Err(e) => warn!(error = %e, "periodic snapshot failed"),
            },
            _ = status.tick() => log_status(&store.stats()),
            _ = &mut stop => break,
        }
    }
}

// =============================================================================
// RUNTIME
// =============================================================================

/// The seeder process: one address store, one crawler, one housekeeper.
pub struct SeederRuntime {
    config: SeederConfig,
    store: AddressStore,
    prober: Arc<dyn PeerProber>,
    digest: Arc<dyn Digest256>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl SeederRuntime {
    /// Create the runtime with the TCP prober, system clock and double SHA-256.
    pub fn new(config: SeederConfig) -> Self {
        let digest: Arc<dyn Digest256> = Arc::new(Sha256dDigest::new());
        let time_source: Arc<dyn TimeSource> = Arc::new(SystemTimeSource);
        let prober = Arc::new(TcpProber::new(
            config.chain.clone(),
            config.probe.clone(),
            Arc::clone(&digest),
            Arc::clone(&time_source),
        ));
        Self::with_components(config, prober, time_source, digest)
    }

    /// Create the runtime around explicit collaborators.
    pub fn with_components(
        config: SeederConfig,
        prober: Arc<dyn PeerProber>,
        time_source: Arc<dyn TimeSource>,
        digest: Arc<dyn Digest256>,
    ) -> Self {
        info!("Creating seeder runtime");
        let store = restore_store(&config, digest.as_ref(), time_source);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            config,
            store,
            prober,
            digest,
            shutdown_tx,
            shutdown_rx,
            tasks: Vec::new(),
        }
    }

    /// Shared store handle; also the `SeedQuery` for a DNS front-end.
    pub fn store(&self) -> AddressStore {
        self.store.clone()
    }

    /// Resolve and admit the configured seeds, then spawn the crawler and
    /// housekeeping tasks.
    pub async fn start(&mut self) -> Result<()> {
        info!("===========================================");
        info!("  Seeder Runtime v{}", env!("CARGO_PKG_VERSION"));
        info!("  Network magic: {}", hex::encode(self.config.chain.magic));
        info!("===========================================");

        let seeds = resolve_seeds(&self.config.crawler.seeds, self.config.chain.default_port, self.store.now()).await;
        let admitted = self.store.ingest(&seeds, true);
        info!(configured = self.config.crawler.seeds.len(), admitted, "seeds admitted");
        if self.store.stats().records == 0 {
            warn!("address store is empty and no seed resolved; nothing to crawl");
        }

        let crawler = CrawlScheduler::new(self.store.clone(), Arc::clone(&self.prober), self.config.crawler.clone());
        self.tasks.push(tokio::spawn(crawler.run(self.shutdown_rx.clone())));
        self.tasks.push(tokio::spawn(housekeeping(
            self.store.clone(),
            Arc::clone(&self.digest),
            self.config.store.clone(),
            self.shutdown_rx.clone(),
        )));

        info!(
            workers = self.config.crawler.workers,
            snapshot = %self.config.store.snapshot_path.display(),
            "seeder running"
        );
        Ok(())
    }

    /// Stop every task and write a final snapshot.
    pub async fn shutdown(&mut self) -> Result<()> {
        info!("Initiating graceful shutdown...");
        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }

        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                warn!(error = %e, "task ended abnormally");
            }
        }

        persist(&self.store, self.digest.as_ref(), &self.config.store).context("Failed to write final snapshot")?;
        info!(records = self.store.stats().records, "Shutdown complete");
        Ok(())
    }
}
