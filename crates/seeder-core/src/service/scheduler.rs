use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::store::AddressStore;
use crate::domain::{Candidate, CrawlerConfig, ProbeReport, ProbeRequest, Selection};
use crate::ports::PeerProber;

/// Consecutive skipped candidates after which a worker backs off.
const SKIP_BURST: usize = 256;

/// What one scheduling step did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlStep {
    /// A probe ran and its report was applied.
    Probed(ProbeReport),
    /// The candidate is on a network we do not probe.
    Skipped,
    /// Nothing is due yet.
    Idle(Duration),
    /// Stopped mid-probe; the candidate went back unprobed.
    Abandoned,
}

/// Pool of crawler workers sharing one store and one prober.
///
/// Each worker loops: select a candidate, probe it, record the outcome and
/// ingest what it learned. Workers stop between probes once the shutdown
/// signal flips to `true`; a probe still running at that point is abandoned
/// and its candidate returned to the store unprobed.
#[derive(Clone)]
pub struct CrawlScheduler {
    store: AddressStore,
    prober: Arc<dyn PeerProber>,
    config: CrawlerConfig,
}

impl CrawlScheduler {
    pub fn new(store: AddressStore, prober: Arc<dyn PeerProber>, config: CrawlerConfig) -> Self {
        Self {
            store,
            prober,
            config,
        }
    }

    /// Probe request for `candidate`: ask for addresses unless we heard
    /// from it recently.
    pub fn request_for(&self, candidate: &Candidate) -> ProbeRequest {
        let now = self.store.now();
        ProbeRequest {
            target: candidate.endpoint,
            request_addresses: candidate
                .our_last_success
                .add_secs(self.config.getaddr_interval_secs)
                < now,
        }
    }

    /// One select / probe / record step.
    pub async fn step(&self) -> CrawlStep {
        self.step_until(std::future::pending()).await
    }

    /// One select / probe / record step that gives up on the probe once
    /// `stop` resolves, returning the candidate to the store unprobed.
    pub async fn step_until(&self, stop: impl Future<Output = ()>) -> CrawlStep {
        let candidate = match self.store.select() {
            Selection::Candidate(candidate) => candidate,
            Selection::Empty { retry_after_secs } => {
                return CrawlStep::Idle(Duration::from_secs(retry_after_secs.max(1)));
            }
        };
        if !self.probeable(&candidate) {
            return CrawlStep::Skipped;
        }

        let request = self.request_for(&candidate);
        tokio::select! {
            report = self.prober.probe(request) => {
                self.apply(&report);
                CrawlStep::Probed(report)
            }
            _ = stop => {
                self.return_unprobed(&candidate);
                CrawlStep::Abandoned
            }
        }
    }

    /// Spawn `config.workers` workers and wait for all of them to stop.
    pub async fn run(self, shutdown: watch::Receiver<bool>) {
        info!(workers = self.config.workers, "crawler starting");
        let mut workers = JoinSet::new();
        for id in 0..self.config.workers {
            let scheduler = self.clone();
            let shutdown = shutdown.clone();
            workers.spawn(async move { scheduler.worker(id, shutdown).await });
        }
        while let Some(result) = workers.join_next().await {
            if let Err(e) = result {
                warn!(error = %e, "crawler worker failed");
            }
        }
        info!("crawler stopped");
    }

    async fn worker(&self, id: usize, mut shutdown: watch::Receiver<bool>) {
        debug!(worker = id, "worker started");
        let mut skipped = 0usize;

        while !*shutdown.borrow() {
            let stop = async {
                let _ = shutdown.changed().await;
            };
            let wait = match self.step_until(stop).await {
                CrawlStep::Probed(_) => {
                    skipped = 0;
                    continue;
                }
                CrawlStep::Abandoned => break,
                CrawlStep::Idle(wait) => wait,
                CrawlStep::Skipped => {
                    skipped += 1;
                    if skipped < SKIP_BURST {
                        tokio::task::yield_now().await;
                        continue;
                    }
                    skipped = 0;
                    Duration::from_secs(self.store.read(|b| b.policy().empty_retry_secs).max(1))
                }
            };
            if !sleep_or_shutdown(wait, &mut shutdown).await {
                break;
            }
        }

        debug!(worker = id, "worker stopped");
    }

    fn probeable(&self, candidate: &Candidate) -> bool {
        if self.config.probe_networks.contains(candidate.endpoint.network()) {
            return true;
        }
        self.return_unprobed(candidate);
        false
    }

    fn return_unprobed(&self, candidate: &Candidate) {
        if let Err(e) = self.store.record_skipped(&candidate.endpoint) {
            warn!(endpoint = %candidate.endpoint, error = %e, "could not return candidate");
        }
    }

    fn apply(&self, report: &ProbeReport) {
        if let Err(e) = self.store.apply_report(report) {
            warn!(endpoint = %report.target, error = %e, "could not record probe outcome");
        }
    }
}

/// Sleep for `wait` unless shutdown is signalled first. Returns `false` on shutdown.
async fn sleep_or_shutdown(wait: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    let changed = tokio::select! {
        _ = tokio::time::sleep(wait) => return true,
        changed = shutdown.changed() => changed,
    };
    changed.is_ok() && !*shutdown.borrow()
}
