//! TcpProber against a scripted peer on the loopback interface.

use std::sync::Arc;

use seeder_core::domain::wire::{command, FrameDecoder, OutboundBuffer, VersionMessage};
use seeder_core::{
    BanReason, ChainParams, DiscoveredAddress, Endpoint, IpAddr, PeerProber, ProbeConfig,
    ProbeFailure, ProbeOutcome, ProbeRequest, ServiceFlags, Sha256dDigest, SystemTimeSource,
    TcpProber, TimeSource, WireError,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

const PEER_VERSION: i32 = 70015;

fn prober() -> TcpProber {
    TcpProber::new(
        ChainParams::default(),
        ProbeConfig::default(),
        Arc::new(Sha256dDigest),
        Arc::new(SystemTimeSource),
    )
}

fn fresh_addresses() -> Vec<DiscoveredAddress> {
    let now = SystemTimeSource.now();
    (1..=3u8)
        .map(|i| {
            DiscoveredAddress::new(
                Endpoint::new(IpAddr::v4(93, 184, 216, i), 8333),
                ServiceFlags::NETWORK,
                now.sub_secs(100 * u64::from(i)),
            )
        })
        .collect()
}

async fn listen() -> (TcpListener, Endpoint) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, Endpoint::from(addr))
}

/// Answers `version` with `version` + `verack` and `getaddr` with `addresses`.
async fn well_behaved_peer(listener: TcpListener, addresses: Vec<DiscoveredAddress>) {
    let (mut socket, remote) = listener.accept().await.unwrap();
    let magic = ChainParams::default().magic;
    let mut decoder = FrameDecoder::new(magic);
    let mut buf = vec![0u8; 4096];

    loop {
        let n = match socket.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        decoder.extend(&buf[..n]);

        let mut out = OutboundBuffer::new(magic);
        while let Ok(Some(frame)) = decoder.next_frame(PEER_VERSION, &Sha256dDigest) {
            match frame.command.as_str() {
                command::VERSION => {
                    let version = VersionMessage::outgoing(
                        PEER_VERSION,
                        ServiceFlags::NETWORK | ServiceFlags::WITNESS,
                        SystemTimeSource.now(),
                        Endpoint::from(remote),
                        42,
                        "/fake:1.0/",
                        123_456,
                    );
                    out.push_version(&version, PEER_VERSION, &Sha256dDigest);
                    out.push_verack(PEER_VERSION, &Sha256dDigest);
                }
                command::GETADDR => out.push_addr(&addresses, PEER_VERSION, &Sha256dDigest),
                _ => {}
            }
        }
        if !out.is_empty() && socket.write_all(&out.take()).await.is_err() {
            return;
        }
    }
}

#[tokio::test]
async fn test_full_exchange_with_well_behaved_peer() {
    let (listener, target) = listen().await;
    let addresses = fresh_addresses();
    let peer = tokio::spawn(well_behaved_peer(listener, addresses.clone()));

    let report = prober()
        .probe(ProbeRequest {
            target,
            request_addresses: true,
        })
        .await;

    assert_eq!(report.outcome, ProbeOutcome::Success);
    assert_eq!(report.ban_secs, 0);
    assert_eq!(report.peer.client_version, PEER_VERSION);
    assert_eq!(report.peer.sub_version, "/fake:1.0/");
    assert_eq!(report.peer.height, 123_456);
    assert!(report.services.contains(ServiceFlags::WITNESS));
    assert_eq!(report.discovered, addresses);
    peer.abort();
}

#[tokio::test]
async fn test_handshake_only_when_addresses_not_requested() {
    let (listener, target) = listen().await;
    let peer = tokio::spawn(well_behaved_peer(listener, fresh_addresses()));

    let report = prober()
        .probe(ProbeRequest {
            target,
            request_addresses: false,
        })
        .await;

    assert_eq!(report.outcome, ProbeOutcome::Success);
    assert!(report.discovered.is_empty());
    peer.abort();
}

#[tokio::test]
async fn test_garbage_command_is_banned() {
    let (listener, target) = listen().await;
    let peer = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut header = ChainParams::default().magic.to_vec();
        header.extend_from_slice(b"\x01\x02bogus\0\0\0\0\0");
        header.extend_from_slice(&0u32.to_le_bytes());
        header.extend_from_slice(&[0u8; 4]);
        let _ = socket.write_all(&header).await;
        let mut sink = vec![0u8; 1024];
        while matches!(socket.read(&mut sink).await, Ok(n) if n > 0) {}
    });

    let report = prober()
        .probe(ProbeRequest {
            target,
            request_addresses: true,
        })
        .await;

    assert!(matches!(
        report.outcome,
        ProbeOutcome::Banned(BanReason::Wire(WireError::Malformed(_)))
    ));
    assert_eq!(report.ban_secs, ProbeConfig::default().misbehavior_ban_secs);
    peer.abort();
}

#[tokio::test]
async fn test_peer_hanging_up_is_a_failure() {
    let (listener, target) = listen().await;
    let peer = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        drop(socket);
    });

    let report = prober()
        .probe(ProbeRequest {
            target,
            request_addresses: true,
        })
        .await;

    assert!(matches!(
        report.outcome,
        ProbeOutcome::Failure(ProbeFailure::ConnectionClosed) | ProbeOutcome::Failure(ProbeFailure::Io(_))
    ));
    assert_eq!(report.ban_secs, 0);
    peer.await.unwrap();
}

#[tokio::test]
async fn test_refused_connection_is_a_failure() {
    let (listener, target) = listen().await;
    drop(listener);

    let report = prober()
        .probe(ProbeRequest {
            target,
            request_addresses: true,
        })
        .await;

    assert!(matches!(
        report.outcome,
        ProbeOutcome::Failure(ProbeFailure::ConnectFailure(_))
    ));
}
