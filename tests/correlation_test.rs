//! End-to-end correlation cycles over a temp data directory: snapshots in,
//! cycles driven with synthetic position reports, snapshots back out.

use chrono::{Duration, Utc};

use skyroutes::correlator::RouteCorrelator;
use skyroutes::flights::PositionReport;
use skyroutes::routes::{Route, RouteStatus};
use skyroutes::snapshot_repo::{JsonSnapshotRepository, SnapshotRepository};
use skyroutes::airports::Airport;

fn airport(code: &str, lat: f64, lon: f64) -> Airport {
    Airport {
        code: code.to_string(),
        name: code.to_string(),
        lat,
        lon,
        country_code: String::new(),
        country: String::new(),
        continent: None,
    }
}

fn report(icao24: &str, callsign: &str, lon: f64, lat: f64) -> PositionReport {
    PositionReport {
        icao24: icao24.to_string(),
        callsign: callsign.to_string(),
        longitude: Some(lon),
        latitude: Some(lat),
    }
}

fn seeded_repo(dir: &tempfile::TempDir) -> JsonSnapshotRepository {
    let repo = JsonSnapshotRepository::new(dir.path());
    repo.save_airports(&[airport("AAA", 10.0, 20.0), airport("BBB", 30.0, 40.0)])
        .unwrap();
    repo
}

#[test]
fn three_cycle_flight_produces_one_active_route() {
    let dir = tempfile::tempdir().unwrap();
    let repo = seeded_repo(&dir);
    let correlator = RouteCorrelator::new(&repo);
    let now = Utc::now();

    // Near AAA, then near BBB, then gone
    correlator
        .run_cycle(
            &[
                report("abc", "AL123 ", 20.0, 10.0),
                report("def", "RYR456 ", 40.0, 30.0),
            ],
            now,
        )
        .unwrap();
    correlator
        .run_cycle(
            &[
                report("abc", "AL123 ", 40.0, 30.0),
                report("def", "RYR456 ", 40.0, 30.0),
            ],
            now,
        )
        .unwrap();
    let stats = correlator
        .run_cycle(&[report("def", "RYR456 ", 40.0, 30.0)], now)
        .unwrap();

    let routes = repo.load_routes().unwrap();
    assert_eq!(routes.len(), 1);
    let r = &routes[0];
    assert_eq!(r.airline, "AL");
    assert_eq!(r.flight_number, "123");
    assert_eq!(r.source, "AAA");
    assert_eq!(r.destination, "BBB");
    assert_eq!(r.status, RouteStatus::Active);
    assert_eq!(r.icao24, "abc");

    // abc is gone from active state, def still tracked
    let flights = repo.load_active_flights().unwrap();
    assert!(!flights.contains_key("abc"));
    assert!(flights.contains_key("def"));

    assert_eq!(stats.routes, 1);
    assert_eq!(stats.active_planes, 1);
}

#[test]
fn unresolvable_destination_produces_no_route() {
    let dir = tempfile::tempdir().unwrap();
    let repo = seeded_repo(&dir);
    let correlator = RouteCorrelator::new(&repo);
    let now = Utc::now();

    // ghi ends far from any airport; abc completes a valid AAA -> BBB leg
    correlator
        .run_cycle(
            &[
                report("abc", "AL123 ", 20.0, 10.0),
                report("ghi", "BAD1 ", 20.0, 10.0),
            ],
            now,
        )
        .unwrap();
    correlator
        .run_cycle(
            &[
                report("abc", "AL123 ", 40.0, 30.0),
                report("ghi", "BAD1 ", 0.0, 0.0),
            ],
            now,
        )
        .unwrap();
    let stats = correlator.run_cycle(&[], now).unwrap();

    let routes = repo.load_routes().unwrap();
    assert_eq!(routes.len(), 1);
    assert_eq!(routes[0].source, "AAA");
    assert_eq!(routes[0].destination, "BBB");

    assert_eq!(stats.routes, 1);
    assert_eq!(stats.active_planes, 0);
}

#[test]
fn stale_route_is_pruned_and_counted() {
    let dir = tempfile::tempdir().unwrap();
    let repo = seeded_repo(&dir);

    let past = Utc::now() - Duration::days(32);
    repo.save_routes(&[Route {
        airline: "AL".to_string(),
        flight_number: "123".to_string(),
        icao24: "abc".to_string(),
        source: "AAA".to_string(),
        destination: "BBB".to_string(),
        first_seen: past,
        last_seen: past,
        status: RouteStatus::NotActive,
    }])
    .unwrap();

    let correlator = RouteCorrelator::new(&repo);
    let stats = correlator.run_cycle(&[], Utc::now()).unwrap();

    assert!(repo.load_routes().unwrap().is_empty());
    assert_eq!(stats.removed_last_run, 1);
    assert_eq!(repo.load_stats().unwrap().removed_last_run, 1);
}

#[test]
fn repeat_leg_refreshes_existing_route() {
    let dir = tempfile::tempdir().unwrap();
    let repo = seeded_repo(&dir);
    let correlator = RouteCorrelator::new(&repo);

    let t1 = Utc::now() - Duration::hours(2);
    let t2 = Utc::now();

    // Same flight number flies the same leg twice with different airframes
    correlator
        .run_cycle(&[report("abc", "AL123", 20.0, 10.0)], t1)
        .unwrap();
    correlator
        .run_cycle(&[report("abc", "AL123", 40.0, 30.0)], t1)
        .unwrap();
    correlator.run_cycle(&[], t1).unwrap();

    correlator
        .run_cycle(&[report("fff", "AL123", 20.0, 10.0)], t2)
        .unwrap();
    correlator
        .run_cycle(&[report("fff", "AL123", 40.0, 30.0)], t2)
        .unwrap();
    correlator.run_cycle(&[], t2).unwrap();

    let routes = repo.load_routes().unwrap();
    assert_eq!(routes.len(), 1);
    assert_eq!(routes[0].icao24, "fff");
    assert_eq!(routes[0].last_seen, t2);
    assert_eq!(routes[0].first_seen, t1);
}

#[test]
fn cycle_with_empty_airport_set_tracks_but_never_routes() {
    let dir = tempfile::tempdir().unwrap();
    let repo = JsonSnapshotRepository::new(dir.path());
    let correlator = RouteCorrelator::new(&repo);
    let now = Utc::now();

    correlator
        .run_cycle(&[report("abc", "AL123", 20.0, 10.0)], now)
        .unwrap();
    let stats = correlator.run_cycle(&[], now).unwrap();

    assert_eq!(stats.routes, 0);
    assert!(repo.load_routes().unwrap().is_empty());
}
