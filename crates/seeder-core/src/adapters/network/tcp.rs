use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{timeout, timeout_at};
use tracing::{debug, info};

use crate::domain::{ChainParams, ProbeConfig, ProbeMachine, ProbeOutcome, ProbeReport, ProbeRequest};
use crate::ports::{Digest256, PeerProber, TimeSource};

/// Bytes requested per socket read.
const READ_CHUNK: usize = 64 * 1024;

// ============================================================================
// TcpProber - Tokio driver for ProbeMachine
// ============================================================================

/// Probes peers over plain TCP.
///
/// Each call opens one connection, runs a `ProbeMachine` over it and closes
/// it again. Nothing is shared between probes except configuration, so one
/// prober serves every crawler worker.
pub struct TcpProber {
    params: ChainParams,
    config: ProbeConfig,
    digest: Arc<dyn Digest256>,
    time: Arc<dyn TimeSource>,
}

impl TcpProber {
    pub fn new(
        params: ChainParams,
        config: ProbeConfig,
        digest: Arc<dyn Digest256>,
        time: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            params,
            config,
            digest,
            time,
        }
    }

    async fn drive(&self, machine: &mut ProbeMachine, mut stream: TcpStream) {
        machine.on_connected(Instant::now(), self.time.now());
        let mut buf = vec![0u8; READ_CHUNK];

        while !machine.is_done() {
            let Some(deadline) = machine.deadline() else {
                break;
            };
            let deadline = tokio::time::Instant::from_std(deadline);

            let outbound = machine.take_outbound();
            if !outbound.is_empty() {
                match timeout_at(deadline, stream.write_all(&outbound)).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        machine.on_io_error(e.to_string());
                        break;
                    }
                    Err(_) => {
                        machine.on_io_error("write timed out".to_string());
                        break;
                    }
                }
            }

            match timeout_at(deadline, stream.read(&mut buf)).await {
                Ok(Ok(0)) => machine.on_closed(),
                Ok(Ok(n)) => machine.on_received(&buf[..n], Instant::now(), self.time.now()),
                Ok(Err(e)) => machine.on_io_error(e.to_string()),
                Err(_) => machine.on_deadline(Instant::now()),
            }
        }
    }
}

#[async_trait]
impl PeerProber for TcpProber {
    async fn probe(&self, request: ProbeRequest) -> ProbeReport {
        let mut machine = ProbeMachine::new(
            request,
            self.params.clone(),
            self.config.clone(),
            Arc::clone(&self.digest),
            rand::random(),
        );

        let addr = request.target.to_std();
        match timeout(machine.connect_timeout(), TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => self.drive(&mut machine, stream).await,
            Ok(Err(e)) => machine.on_connect_failed(e.to_string()),
            Err(_) => machine.on_connect_failed("connect timed out".to_string()),
        }

        let report = machine.into_report();
        match &report.outcome {
            ProbeOutcome::Banned(reason) => {
                info!(endpoint = %report.target, %reason, ban_secs = report.ban_secs, "peer misbehaved");
            }
            outcome => {
                debug!(
                    endpoint = %report.target,
                    %outcome,
                    version = report.peer.client_version,
                    addresses = report.discovered.len(),
                    "probe complete"
                );
            }
        }
        report
    }
}
