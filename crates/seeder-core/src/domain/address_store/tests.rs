//! Tests for the address book.

use super::*;
use crate::domain::address_record::PolicyConfig;
use crate::domain::reliability::Window;
use crate::domain::{
    AllowedNetworks, ChainParams, DiscoveredAddress, Endpoint, IpAddr, Network, PeerMeta,
    ServiceFlags, StoreError, Timestamp,
};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

const NOW: u64 = 1_700_000_000;

fn rng() -> StdRng {
    StdRng::seed_from_u64(7)
}

fn make_book() -> AddressBook {
    AddressBook::new(ChainParams::for_testing(), PolicyConfig::default())
}

fn make_endpoint(last: u8) -> Endpoint {
    Endpoint::new(IpAddr::v4(1, 2, 3, last), 18333)
}

fn gossip(endpoint: Endpoint, ts: u64) -> DiscoveredAddress {
    DiscoveredAddress::new(endpoint, ServiceFlags::NETWORK, Timestamp::new(ts))
}

fn meta() -> PeerMeta {
    PeerMeta {
        client_version: 70015,
        sub_version: "/test/".to_string(),
        height: 100,
    }
}

fn expect_candidate(selection: Selection) -> Endpoint {
    match selection {
        Selection::Candidate(c) => c.endpoint,
        Selection::Empty { retry_after_secs } => panic!("expected candidate, got empty({retry_after_secs})"),
    }
}

/// Membership invariants that must hold after every operation.
fn assert_invariants(book: &AddressBook, now: Timestamp) {
    for id in &book.unknown {
        assert!(!book.tracked_set.contains(id), "record {id} both unknown and tracked");
        assert!(book.records.contains_key(id));
    }
    for id in &book.tracked_set {
        assert!(book.records.contains_key(id));
    }
    for id in &book.good {
        let record = &book.records[id];
        assert!(!book.banned.is_banned(&record.endpoint, now));
    }
    for (endpoint, _) in book.banned.iter() {
        assert!(!book.by_endpoint.contains_key(endpoint));
    }
    assert_eq!(book.records.len(), book.by_endpoint.len());
}

// =============================================================================
// TEST GROUP 1: Ingest
// =============================================================================

#[test]
fn test_ingest_creates_unknown_record() {
    let mut book = make_book();
    let ep = make_endpoint(4);
    assert_eq!(book.ingest(&[gossip(ep, NOW)], false, Timestamp::new(NOW)), 1);

    assert!(book.is_unknown(&ep));
    assert!(!book.is_tracked(&ep));
    let record = book.get(&ep).unwrap();
    assert_eq!(record.total, 0);
    assert_eq!(record.success, 0);
}

#[test]
fn test_ingest_is_idempotent() {
    let mut book = make_book();
    let batch: Vec<_> = (1..=5).map(|i| gossip(make_endpoint(i), NOW)).collect();
    book.ingest(&batch, false, Timestamp::new(NOW));
    let before = book.snapshot();

    assert_eq!(book.ingest(&batch, false, Timestamp::new(NOW)), 0);
    assert_eq!(book.snapshot(), before);
    assert_eq!(book.unknown.len(), 5);
}

#[test]
fn test_ingest_merges_services_and_time() {
    let mut book = make_book();
    let ep = make_endpoint(4);
    book.ingest(&[gossip(ep, NOW)], false, Timestamp::new(NOW));
    book.ingest(
        &[DiscoveredAddress::new(ep, ServiceFlags::WITNESS, Timestamp::new(NOW + 50))],
        false,
        Timestamp::new(NOW),
    );

    let record = book.get(&ep).unwrap();
    assert!(record.services.contains(ServiceFlags::NETWORK | ServiceFlags::WITNESS));
    assert_eq!(record.last_try.as_secs(), NOW + 50);
    assert_eq!(book.len(), 1);
}

#[test]
fn test_ingest_drops_unroutable_unless_forced() {
    let mut book = make_book();
    let private = Endpoint::new(IpAddr::v4(192, 168, 0, 1), 18333);
    assert_eq!(book.ingest(&[gossip(private, NOW)], false, Timestamp::new(NOW)), 0);
    assert_eq!(book.ingest(&[gossip(private, NOW)], true, Timestamp::new(NOW)), 1);
}

// =============================================================================
// TEST GROUP 2: Selection
// =============================================================================

#[test]
fn test_select_on_empty_book_asks_to_retry() {
    let mut book = make_book();
    assert_eq!(
        book.select(Timestamp::new(NOW), &mut rng()),
        Selection::Empty { retry_after_secs: 5 }
    );
}

#[test]
fn test_select_then_good_moves_to_tracked_and_good() {
    let mut book = make_book();
    let now = Timestamp::new(NOW);
    let ep = make_endpoint(4);
    book.ingest(&[gossip(ep, NOW)], false, now);

    assert_eq!(expect_candidate(book.select(now, &mut rng())), ep);
    assert!(!book.is_unknown(&ep));
    assert_eq!(book.stats(now).in_flight, 1);

    book.record_good(&ep, meta(), now).unwrap();
    let record = book.get(&ep).unwrap();
    assert_eq!(record.total, 1);
    assert_eq!(record.peer, meta());
    for window in Window::ALL {
        assert!((record.stats.get(window).reliability() - 1.0).abs() < 1e-9);
    }
    assert!(book.is_tracked(&ep));
    assert!(book.is_good(&ep));
    assert_invariants(&book, now);
}

#[test]
fn test_tracked_head_waits_for_min_retry() {
    let mut book = make_book();
    let now = Timestamp::new(NOW);
    let ep = make_endpoint(4);
    book.ingest(&[gossip(ep, NOW)], false, now);
    expect_candidate(book.select(now, &mut rng()));
    book.record_good(&ep, meta(), now).unwrap();

    let later = now.add_secs(400);
    assert_eq!(
        book.select(later, &mut rng()),
        Selection::Empty { retry_after_secs: 600 }
    );
    assert!(book.is_tracked(&ep));

    assert_eq!(expect_candidate(book.select(now.add_secs(1000), &mut rng())), ep);
}

#[test]
fn test_ignored_record_is_never_selected() {
    let mut book = AddressBook::new(ChainParams::for_testing(), PolicyConfig::for_testing());
    let now = Timestamp::new(NOW);
    let ep = make_endpoint(4);
    book.ingest(&[gossip(ep, NOW)], false, now);
    book.record_bad(&ep, 0, now).unwrap();
    book.record_bad(&ep, 0, now.add_secs(3600)).unwrap();
    assert!(book.get(&ep).unwrap().is_ignored(now.add_secs(3600)));

    let selection = book.select(now.add_secs(7200), &mut rng());
    assert!(matches!(selection, Selection::Empty { .. }));
    assert!(book.is_tracked(&ep));

    book.reset_ignores();
    assert_eq!(expect_candidate(book.select(now.add_secs(7200), &mut rng())), ep);
}

#[test]
fn test_skipped_requeues_without_statistics() {
    let mut book = make_book();
    let now = Timestamp::new(NOW);
    let ep = make_endpoint(4);
    book.ingest(&[gossip(ep, NOW)], false, now);
    expect_candidate(book.select(now, &mut rng()));

    book.record_skipped(&ep).unwrap();
    assert!(book.is_tracked(&ep));
    let record = book.get(&ep).unwrap();
    assert_eq!(record.total, 0);
    assert!(!record.probed_by_us());
}

#[test]
fn test_outcome_for_unknown_endpoint_is_an_error() {
    let mut book = make_book();
    let ep = make_endpoint(9);
    assert!(matches!(
        book.record_skipped(&ep),
        Err(StoreError::UnknownEndpoint(_))
    ));
}

// =============================================================================
// TEST GROUP 3: Bans
// =============================================================================

#[test]
fn test_ban_hint_bans_and_deletes_record() {
    let mut book = make_book();
    let now = Timestamp::new(NOW);
    let ep = make_endpoint(4);
    book.ingest(&[gossip(ep, NOW)], false, now);

    assert_eq!(
        book.record_bad(&ep, 100_000, now).unwrap(),
        BadOutcome::Banned { ban_secs: 100_000 }
    );
    assert!(book.get(&ep).is_none());
    assert!(book.is_banned(&ep, now));
    assert_invariants(&book, now);
}

#[test]
fn test_terrible_reliability_earns_multi_day_ban() {
    let mut book = make_book();
    let mut now = Timestamp::new(NOW);
    let ep = make_endpoint(4);
    book.ingest(&[gossip(ep, NOW)], false, now);

    let mut outcome = BadOutcome::Retained;
    for _ in 0..40 {
        outcome = book.record_bad(&ep, 0, now).unwrap();
        if outcome != BadOutcome::Retained {
            break;
        }
        now = now.add_secs(3600);
    }

    assert_eq!(outcome, BadOutcome::Banned { ban_secs: 7 * 86400 });
    assert!(book.get(&ep).is_none());
    assert!(book.is_banned(&ep, now));
    assert!(matches!(book.select(now, &mut rng()), Selection::Empty { .. }));

    // Gossip during the ban is ignored.
    assert_eq!(book.ingest(&[gossip(ep, now.as_secs())], false, now), 0);

    // After expiry, fresher gossip brings it back with a clean slate.
    let after = now.add_secs(8 * 86400);
    assert_eq!(book.ingest(&[gossip(ep, after.as_secs())], false, after), 1);
    assert_eq!(book.get(&ep).unwrap().total, 0);
    assert!(!book.is_banned(&ep, after));
}

#[test]
fn test_stale_gossip_does_not_lift_expired_ban() {
    let mut book = make_book();
    let now = Timestamp::new(NOW);
    let ep = make_endpoint(4);
    book.ingest(&[gossip(ep, NOW)], false, now);
    book.record_bad(&ep, 100, now).unwrap();

    let after = now.add_secs(1000);
    assert_eq!(book.ingest(&[gossip(ep, NOW)], false, after), 0);
    assert_eq!(book.ingest(&[gossip(ep, NOW)], true, after), 1);
}

#[test]
fn test_prune_forgets_only_long_expired_bans() {
    let mut book = make_book();
    let now = Timestamp::new(NOW);
    let short = make_endpoint(4);
    let long = make_endpoint(5);
    book.ingest(&[gossip(short, NOW), gossip(long, NOW)], false, now);
    book.record_bad(&short, 100, now).unwrap();
    book.record_bad(&long, 30 * 86400, now).unwrap();
    assert_eq!(book.banned.len(), 2);

    // Expired, but still within the retention week.
    assert_eq!(book.prune_bans(now.add_secs(6 * 86400)), 0);
    assert_eq!(book.banned.len(), 2);

    let later = now.add_secs(8 * 86400);
    assert_eq!(book.prune_bans(later), 1);
    assert!(book.banned.expiry(&short).is_none());
    assert!(book.is_banned(&long, later));
    assert!(book.snapshot().banned.iter().all(|(e, _)| *e == long));
    assert_invariants(&book, later);
}

#[test]
fn test_failure_drops_from_good() {
    let mut book = AddressBook::new(ChainParams::for_testing(), PolicyConfig::for_testing());
    let now = Timestamp::new(NOW);
    let ep = make_endpoint(4);
    book.ingest(&[gossip(ep, NOW)], false, now);
    book.record_good(&ep, meta(), now).unwrap();
    assert!(book.is_good(&ep));

    assert_eq!(book.record_bad(&ep, 0, now.add_secs(60)).unwrap(), BadOutcome::Retained);
    assert!(!book.is_good(&ep));
    assert!(book.is_tracked(&ep));
}

#[test]
fn test_force_ingest_clears_ignore() {
    let mut book = make_book();
    let now = Timestamp::new(NOW);
    let ep = make_endpoint(4);
    book.ingest(&[gossip(ep, NOW)], false, now);
    book.record_bad(&ep, 0, now).unwrap();
    book.record_bad(&ep, 0, now.add_secs(3600)).unwrap();
    assert!(book.get(&ep).unwrap().is_ignored(now.add_secs(3600)));

    book.ingest(&[gossip(ep, NOW)], true, now);
    assert!(!book.get(&ep).unwrap().is_ignored(now.add_secs(3600)));
}

// =============================================================================
// TEST GROUP 4: Good queries
// =============================================================================

#[test]
fn test_cold_store_answers_with_one_tracked_record() {
    let mut book = make_book();
    let now = Timestamp::new(NOW);
    let ep = make_endpoint(4);
    book.ingest(&[gossip(ep, NOW)], false, now);
    expect_candidate(book.select(now, &mut rng()));
    book.record_skipped(&ep).unwrap();

    let answer = book.query_good(ServiceFlags::NETWORK, 0, AllowedNetworks::all(), &mut rng());
    assert_eq!(answer, vec![ep]);

    let none = book.query_good(ServiceFlags::WITNESS, 10, AllowedNetworks::all(), &mut rng());
    assert!(none.is_empty());
}

#[test]
fn test_cold_store_falls_back_to_unknown() {
    let mut book = make_book();
    let ep = make_endpoint(4);
    book.ingest(&[gossip(ep, NOW)], false, Timestamp::new(NOW));
    let answer = book.query_good(ServiceFlags::NONE, 5, AllowedNetworks::all(), &mut rng());
    assert_eq!(answer, vec![ep]);
}

fn book_with_good(n: u8) -> AddressBook {
    let mut book = make_book();
    let now = Timestamp::new(NOW);
    let batch: Vec<_> = (1..=n).map(|i| gossip(make_endpoint(i), NOW)).collect();
    book.ingest(&batch, false, now);
    for i in 1..=n {
        book.record_good(&make_endpoint(i), meta(), now).unwrap();
    }
    book
}

#[test]
fn test_query_samples_without_replacement() {
    let book = book_with_good(10);
    let mut answer = book.query_good(ServiceFlags::NETWORK, 5, AllowedNetworks::all(), &mut rng());
    assert_eq!(answer.len(), 5);
    answer.sort();
    answer.dedup();
    assert_eq!(answer.len(), 5);

    let all = book.query_good(ServiceFlags::NETWORK, 100, AllowedNetworks::all(), &mut rng());
    assert_eq!(all.len(), 10);
}

#[test]
fn test_query_filters_services_and_networks() {
    let book = book_with_good(3);
    assert!(book
        .query_good(ServiceFlags::BLOOM, 3, AllowedNetworks::all(), &mut rng())
        .is_empty());
    assert!(book
        .query_good(ServiceFlags::NETWORK, 3, AllowedNetworks::only(&[Network::Ipv6]), &mut rng())
        .is_empty());
    assert_eq!(
        book.query_good(ServiceFlags::NETWORK, 0, AllowedNetworks::all(), &mut rng())
            .len(),
        1
    );
}

// =============================================================================
// TEST GROUP 5: Reporting
// =============================================================================

#[test]
fn test_stats_counts_memberships() {
    let mut book = book_with_good(3);
    let now = Timestamp::new(NOW);
    book.ingest(&[gossip(make_endpoint(50), NOW)], false, now);
    book.record_bad(&make_endpoint(1), 100, now).unwrap();

    let stats = book.stats(now.add_secs(10));
    assert_eq!(stats.records, 3);
    assert_eq!(stats.unknown, 1);
    assert_eq!(stats.tracked, 2);
    assert_eq!(stats.good, 2);
    assert_eq!(stats.banned, 1);
    assert_eq!(stats.in_flight, 0);
    assert_eq!(stats.avg_probe_age_secs, 10);
    assert!((stats.avg_reliability[0] - 1.0).abs() < 1e-9);
}

#[test]
fn test_dump_lists_answering_records_most_reliable_first() {
    let mut book = AddressBook::new(ChainParams::for_testing(), PolicyConfig::for_testing());
    let now = Timestamp::new(NOW);
    let (a, b, c) = (make_endpoint(1), make_endpoint(2), make_endpoint(3));
    book.ingest(&[gossip(a, NOW), gossip(b, NOW), gossip(c, NOW)], false, now);
    book.record_good(&a, meta(), now).unwrap();
    book.record_bad(&a, 0, now.add_secs(86400)).unwrap();
    book.record_good(&b, meta(), now).unwrap();

    let dump = book.dump_entries();
    assert_eq!(dump.len(), 2);
    assert_eq!(dump[0].endpoint, b);
    assert!(dump[0].good);
    assert_eq!(dump[1].endpoint, a);
    assert!(!dump[1].good);
    assert_eq!(dump[0].sub_version, "/test/");
}

// =============================================================================
// TEST GROUP 6: Snapshot
// =============================================================================

#[test]
fn test_snapshot_restore_preserves_state() {
    let mut book = book_with_good(4);
    let now = Timestamp::new(NOW);
    book.ingest(&[gossip(make_endpoint(60), NOW)], false, now);
    book.record_bad(&make_endpoint(2), 100_000, now).unwrap();

    let snapshot = book.snapshot();
    let restored =
        AddressBook::restore(snapshot.clone(), ChainParams::for_testing(), PolicyConfig::default()).unwrap();

    assert_eq!(restored.snapshot(), snapshot);
    assert!(restored.is_good(&make_endpoint(1)));
    assert!(!restored.is_good(&make_endpoint(2)));
    assert!(restored.is_tracked(&make_endpoint(3)));
    assert!(restored.is_unknown(&make_endpoint(60)));
    assert!(restored.is_banned(&make_endpoint(2), now));
    assert_invariants(&restored, now);
}

#[test]
fn test_restore_rejects_contradictions() {
    let book = book_with_good(1);
    let mut snapshot = book.snapshot();
    snapshot.banned.push((make_endpoint(1), Timestamp::new(NOW + 10)));
    assert!(matches!(
        AddressBook::restore(snapshot, ChainParams::for_testing(), PolicyConfig::default()),
        Err(StoreError::InconsistentSnapshot(_))
    ));

    let mut snapshot = book.snapshot();
    snapshot.version = SNAPSHOT_VERSION + 1;
    assert!(matches!(
        AddressBook::restore(snapshot, ChainParams::for_testing(), PolicyConfig::default()),
        Err(StoreError::UnsupportedSnapshotVersion(_))
    ));
}

// =============================================================================
// TEST GROUP 7: Properties
// =============================================================================

#[derive(Debug, Clone)]
enum Op {
    Ingest(u8, bool),
    Select,
    Good(u8),
    Bad(u8, u64),
    Skip(u8),
    Advance(u64),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..16, any::<bool>()).prop_map(|(i, f)| Op::Ingest(i, f)),
        Just(Op::Select),
        (0u8..16).prop_map(Op::Good),
        (0u8..16, prop_oneof![Just(0u64), Just(100), Just(100_000)]).prop_map(|(i, b)| Op::Bad(i, b)),
        (0u8..16).prop_map(Op::Skip),
        (0u64..50_000).prop_map(Op::Advance),
    ]
}

proptest! {
    #[test]
    fn prop_memberships_stay_consistent(ops in prop::collection::vec(op_strategy(), 1..200)) {
        let mut book = AddressBook::new(ChainParams::for_testing(), PolicyConfig::for_testing());
        let mut rng = rng();
        let mut now = Timestamp::new(NOW);
        for op in ops {
            match op {
                Op::Ingest(i, force) => {
                    book.ingest(&[gossip(make_endpoint(i), now.as_secs())], force, now);
                }
                Op::Select => {
                    if let Selection::Candidate(c) = book.select(now, &mut rng) {
                        prop_assert!(!book.is_banned(&c.endpoint, now));
                    }
                }
                Op::Good(i) => { let _ = book.record_good(&make_endpoint(i), meta(), now); }
                Op::Bad(i, hint) => { let _ = book.record_bad(&make_endpoint(i), hint, now); }
                Op::Skip(i) => { let _ = book.record_skipped(&make_endpoint(i)); }
                Op::Advance(secs) => now = now.add_secs(secs),
            }
            assert_invariants(&book, now);
        }
    }
}
