//! The probe state machine.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use super::config::ProbeConfig;
use super::outcome::{ProbeOutcome, ProbeReport, ProbeRequest};
use crate::domain::wire::{command, decode_address_list, Frame, FrameDecoder, OutboundBuffer, VersionMessage};
use crate::domain::{
    BanReason, ChainParams, DiscoveredAddress, PeerMeta, ProbeFailure, ServiceFlags, Timestamp,
    WireError, CHECKSUM_VERSION,
};
use crate::ports::Digest256;

/// Gossip timestamps at or below this are treated as unset.
const MIN_PLAUSIBLE_TIME: u64 = 100_000_000;

/// How far into the future a gossip timestamp may be.
const FUTURE_SLACK_SECS: u64 = 600;

/// Age assigned to implausible gossip timestamps.
const CLAMPED_AGE_SECS: u64 = 5 * 86400;

/// Gossip older than this is dropped.
const MAX_ADDRESS_AGE_SECS: u64 = 7 * 86400;

/// Where the probe is in its conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeState {
    Connecting,
    AwaitVersion,
    AwaitVerack,
    RequestingAddr,
    Draining,
    Done,
}

/// Sans-I/O probe of one peer.
///
/// The driver calls `on_connected` once the socket is up, then alternates
/// between writing `take_outbound()` and feeding `on_received`, calling
/// `on_deadline` when `deadline()` passes, until `is_done()`.
pub struct ProbeMachine {
    request: ProbeRequest,
    params: ChainParams,
    config: ProbeConfig,
    digest: Arc<dyn Digest256>,
    nonce: u64,
    state: ProbeState,
    send_version: i32,
    recv_version: i32,
    decoder: FrameDecoder,
    outbound: OutboundBuffer,
    deadline: Option<Instant>,
    peer: PeerMeta,
    peer_services: ServiceFlags,
    discovered: Vec<DiscoveredAddress>,
    outcome: Option<ProbeOutcome>,
}

impl ProbeMachine {
    /// Create a probe in `Connecting`.
    pub fn new(
        request: ProbeRequest,
        params: ChainParams,
        config: ProbeConfig,
        digest: Arc<dyn Digest256>,
        nonce: u64,
    ) -> Self {
        let magic = params.magic;
        Self {
            request,
            params,
            config,
            digest,
            nonce,
            state: ProbeState::Connecting,
            send_version: CHECKSUM_VERSION,
            recv_version: CHECKSUM_VERSION,
            decoder: FrameDecoder::new(magic),
            outbound: OutboundBuffer::new(magic),
            deadline: None,
            peer: PeerMeta::default(),
            peer_services: ServiceFlags::NONE,
            discovered: Vec::new(),
            outcome: None,
        }
    }

    pub fn state(&self) -> ProbeState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == ProbeState::Done
    }

    /// When the driver must call `on_deadline` if nothing arrives first.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Connect timeout for this target.
    pub fn connect_timeout(&self) -> Duration {
        self.config.connect_timeout(self.request.target.network())
    }

    fn response_timeout(&self) -> Duration {
        self.config.response_timeout(self.request.target.network())
    }

    /// Complete messages waiting to be written.
    pub fn take_outbound(&mut self) -> Vec<u8> {
        self.outbound.take()
    }

    // =========================================================================
    // DRIVER EVENTS
    // =========================================================================

    /// Socket connected: queue our `version` and arm the handshake deadline.
    ///
    /// The deadline is absolute; traffic from the peer never extends it.
    pub fn on_connected(&mut self, now: Instant, unix_now: Timestamp) {
        if self.state != ProbeState::Connecting {
            return;
        }
        let version = VersionMessage::outgoing(
            self.params.protocol_version,
            ServiceFlags::NONE,
            unix_now,
            self.request.target,
            self.nonce,
            &self.params.user_agent,
            self.params.best_height,
        );
        self.outbound
            .push_version(&version, self.send_version, self.digest.as_ref());
        self.deadline = Some(now + self.response_timeout());
        self.transition(ProbeState::AwaitVersion);
    }

    /// Socket could not be opened.
    pub fn on_connect_failed(&mut self, reason: String) {
        self.finish(ProbeOutcome::Failure(ProbeFailure::ConnectFailure(reason)));
    }

    /// Bytes arrived from the peer.
    pub fn on_received(&mut self, bytes: &[u8], now: Instant, unix_now: Timestamp) {
        if self.is_done() {
            return;
        }
        self.decoder.extend(bytes);

        while !self.is_done() {
            match self.decoder.next_frame(self.recv_version, self.digest.as_ref()) {
                Ok(Some(frame)) => self.handle_frame(frame, now, unix_now),
                Ok(None) => break,
                Err(WireError::ChecksumMismatch { command }) => {
                    debug!(endpoint = %self.request.target, %command, "dropping message with bad checksum");
                }
                Err(e) => self.ban(BanReason::Wire(e)),
            }
        }
    }

    /// The peer closed the connection.
    pub fn on_closed(&mut self) {
        self.finish(ProbeOutcome::Failure(ProbeFailure::ConnectionClosed));
    }

    /// Reading or writing failed.
    pub fn on_io_error(&mut self, error: String) {
        self.finish(ProbeOutcome::Failure(ProbeFailure::Io(error)));
    }

    /// The deadline passed with nothing left to read.
    ///
    /// While draining this ends a completed exchange; before that the peer
    /// failed to finish the handshake in time.
    pub fn on_deadline(&mut self, now: Instant) {
        if self.deadline.is_some_and(|d| d > now) {
            return;
        }
        if self.state == ProbeState::Draining {
            self.finish(ProbeOutcome::Success);
        } else {
            self.finish(ProbeOutcome::Failure(ProbeFailure::Timeout));
        }
    }

    /// Final report. A probe abandoned before finishing reports a timeout.
    pub fn into_report(self) -> ProbeReport {
        let outcome = self
            .outcome
            .unwrap_or(ProbeOutcome::Failure(ProbeFailure::Timeout));
        let ban_secs = match outcome {
            ProbeOutcome::Banned(_) => self.config.misbehavior_ban_secs,
            _ => 0,
        };
        ProbeReport {
            target: self.request.target,
            outcome,
            ban_secs,
            peer: self.peer,
            services: self.peer_services,
            discovered: self.discovered,
        }
    }

    // =========================================================================
    // MESSAGE HANDLING
    // =========================================================================

    fn handle_frame(&mut self, frame: Frame, now: Instant, unix_now: Timestamp) {
        trace!(endpoint = %self.request.target, command = %frame.command, len = frame.payload.len(), "received");
        match frame.command.as_str() {
            command::VERSION => self.on_version(&frame.payload, now),
            command::VERACK => self.on_verack(now),
            command::ADDR => self.on_addr(&frame.payload, now, unix_now),
            _ => {}
        }
    }

    fn on_version(&mut self, payload: &[u8], now: Instant) {
        if self.state != ProbeState::AwaitVersion {
            trace!(endpoint = %self.request.target, "ignoring duplicate version");
            return;
        }
        let msg = match VersionMessage::decode(payload) {
            Ok(msg) => msg,
            Err(e) => return self.ban(BanReason::Wire(e)),
        };

        self.peer = PeerMeta {
            client_version: msg.version,
            sub_version: msg.user_agent,
            height: msg.start_height,
        };
        self.peer_services = msg.services;

        let negotiated = msg.version.min(self.params.protocol_version);
        if msg.version >= CHECKSUM_VERSION {
            self.outbound
                .push_verack(self.send_version, self.digest.as_ref());
        }
        self.send_version = negotiated;

        if msg.version < CHECKSUM_VERSION {
            self.recv_version = negotiated;
            self.handshake_complete(now);
        } else {
            self.transition(ProbeState::AwaitVerack);
        }
    }

    fn on_verack(&mut self, now: Instant) {
        match self.state {
            ProbeState::AwaitVerack => {
                self.recv_version = self.peer.client_version.min(self.params.protocol_version);
                self.handshake_complete(now);
            }
            ProbeState::AwaitVersion => self.ban(BanReason::ProtocolViolation("verack before version")),
            _ => {}
        }
    }

    fn handshake_complete(&mut self, now: Instant) {
        if !self.request.request_addresses {
            self.finish(ProbeOutcome::Success);
            return;
        }
        self.transition(ProbeState::RequestingAddr);
        self.outbound
            .push_getaddr(self.send_version, self.digest.as_ref());
        self.deadline = Some(now + self.response_timeout());
        self.transition(ProbeState::Draining);
    }

    fn on_addr(&mut self, payload: &[u8], now: Instant, unix_now: Timestamp) {
        if self.state != ProbeState::Draining {
            trace!(endpoint = %self.request.target, "ignoring unsolicited addr");
            return;
        }
        let batch = match decode_address_list(payload, self.recv_version) {
            Ok(batch) => batch,
            Err(e) => return self.ban(BanReason::Wire(e)),
        };

        if batch.len() > 1 {
            let shortened = now + Duration::from_secs(self.config.drain_after_batch_secs);
            if self.deadline.map_or(true, |d| d > shortened) {
                self.deadline = Some(shortened);
            }
        }

        let oldest = unix_now.sub_secs(MAX_ADDRESS_AGE_SECS);
        for mut addr in batch {
            let ts = addr.timestamp.as_secs();
            if ts <= MIN_PLAUSIBLE_TIME || ts > unix_now.as_secs() + FUTURE_SLACK_SECS {
                addr.timestamp = unix_now.sub_secs(CLAMPED_AGE_SECS);
            }
            if addr.timestamp > oldest {
                self.discovered.push(addr);
            }
            if self.discovered.len() >= self.config.max_addresses {
                self.finish(ProbeOutcome::Success);
                return;
            }
        }
    }

    // =========================================================================
    // TRANSITIONS
    // =========================================================================

    fn transition(&mut self, next: ProbeState) {
        debug!(endpoint = %self.request.target, from = ?self.state, to = ?next, "probe state");
        self.state = next;
    }

    fn ban(&mut self, reason: BanReason) {
        self.finish(ProbeOutcome::Banned(reason));
    }

    /// Enter `Done` once; later outcomes are ignored. Nothing queued is sent.
    fn finish(&mut self, outcome: ProbeOutcome) {
        if self.is_done() {
            return;
        }
        self.outbound.take();
        debug!(endpoint = %self.request.target, %outcome, addresses = self.discovered.len(), "probe finished");
        self.outcome = Some(outcome);
        self.deadline = None;
        self.transition(ProbeState::Done);
    }
}
