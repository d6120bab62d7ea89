use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tracing::debug;

use crate::airport_index::AirportIndex;
use crate::callsign::parse_callsign;
use crate::flights::ActiveFlight;
use crate::routes::{Route, RouteKey, RouteStatus};

/// A route stays `Active` while seen within this window.
pub const RECENCY_WINDOW_DAYS: i64 = 21;

/// A route not seen for longer than this is pruned from the ledger.
/// `Not Active` covers the span between the recency and retention windows.
pub const RETENTION_WINDOW_DAYS: i64 = 31;

/// Deduplicating ledger of inferred routes, keyed by
/// (airline, flight number, source, destination).
pub struct RouteLedger {
    routes: HashMap<RouteKey, Route>,
    dropped_unresolved: usize,
    dropped_self_loops: usize,
}

impl RouteLedger {
    /// Load the ledger from a persisted route list. Duplicate keys collapse
    /// to the last occurrence.
    pub fn new(routes: Vec<Route>) -> Self {
        let routes = routes.into_iter().map(|r| (r.key(), r)).collect();
        Self {
            routes,
            dropped_unresolved: 0,
            dropped_self_loops: 0,
        }
    }

    /// Materialize a finalized flight into a route.
    ///
    /// Both endpoints are snapped to their nearest airport; if either fails
    /// to resolve, or both resolve to the same airport, the flight is
    /// silently dropped. A repeat match of an existing key refreshes
    /// `last_seen` and `icao24` instead of inserting a duplicate.
    pub fn finalize(
        &mut self,
        flight: &ActiveFlight,
        index: &AirportIndex,
        now: DateTime<Utc>,
    ) -> Option<&Route> {
        let source = index.nearest(flight.origin_coord[0], flight.origin_coord[1]);
        let destination = index.nearest(flight.last_coord[0], flight.last_coord[1]);

        let (Some(source), Some(destination)) = (source, destination) else {
            debug!(
                "Dropping flight {}: endpoint resolves to no airport",
                flight.icao24
            );
            self.dropped_unresolved += 1;
            return None;
        };

        if source.code == destination.code {
            debug!(
                "Dropping flight {}: self-loop at {}",
                flight.icao24, source.code
            );
            self.dropped_self_loops += 1;
            return None;
        }

        // Older snapshots may predate callsign parsing at ingest time
        let (airline, flight_number) = if flight.airline.is_empty() {
            parse_callsign(&flight.callsign)
        } else {
            (flight.airline.clone(), flight.flight_number.clone())
        };

        let key: RouteKey = (
            airline.clone(),
            flight_number.clone(),
            source.code.clone(),
            destination.code.clone(),
        );

        let route = self
            .routes
            .entry(key)
            .and_modify(|r| {
                r.last_seen = now;
                r.icao24 = flight.icao24.clone();
                r.status = RouteStatus::Active;
            })
            .or_insert_with(|| Route {
                airline,
                flight_number,
                icao24: flight.icao24.clone(),
                source: source.code.clone(),
                destination: destination.code.clone(),
                first_seen: now,
                last_seen: now,
                status: RouteStatus::Active,
            });

        Some(route)
    }

    /// Recompute every route's status from its age and prune routes past
    /// the retention window. Returns the number pruned. Idempotent for a
    /// fixed `now`.
    pub fn age_and_prune(&mut self, now: DateTime<Utc>) -> usize {
        let recency = Duration::days(RECENCY_WINDOW_DAYS);
        let retention = Duration::days(RETENTION_WINDOW_DAYS);

        let before = self.routes.len();
        self.routes.retain(|_, route| {
            let age = now.signed_duration_since(route.last_seen);
            if age > retention {
                return false;
            }
            route.status = if age > recency {
                RouteStatus::NotActive
            } else {
                RouteStatus::Active
            };
            true
        });

        before - self.routes.len()
    }

    /// Remove persisted routes whose source equals their destination.
    /// Guards against records written before the self-loop check existed.
    pub fn scrub_self_loops(&mut self) -> usize {
        let before = self.routes.len();
        self.routes.retain(|_, route| route.source != route.destination);
        let removed = before - self.routes.len();
        if removed > 0 {
            debug!("Scrubbed {} self-loop routes from ledger", removed);
        }
        self.dropped_self_loops += removed;
        removed
    }

    pub fn get(&self, key: &RouteKey) -> Option<&Route> {
        self.routes.get(key)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn dropped_unresolved(&self) -> usize {
        self.dropped_unresolved
    }

    pub fn dropped_self_loops(&self) -> usize {
        self.dropped_self_loops
    }

    /// The ledger contents as a list, sorted by key so persisted output is
    /// stable across runs.
    pub fn to_routes(&self) -> Vec<Route> {
        let mut routes: Vec<Route> = self.routes.values().cloned().collect();
        routes.sort_by(|a, b| a.key().cmp(&b.key()));
        routes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::airports::Airport;

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

    fn index() -> AirportIndex {
        AirportIndex::build(vec![airport("AAA", 10.0, 20.0), airport("BBB", 30.0, 40.0)])
    }

    fn flight(icao24: &str, origin: [f64; 2], last: [f64; 2]) -> ActiveFlight {
        let now = Utc::now();
        ActiveFlight {
            icao24: icao24.to_string(),
            callsign: "AL123".to_string(),
            airline: "AL".to_string(),
            flight_number: "123".to_string(),
            origin_code: None,
            origin_name: None,
            origin_coord: origin,
            last_coord: last,
            first_seen: now,
            last_updated: now,
        }
    }

    #[test]
    fn test_finalize_creates_route() {
        let index = index();
        let mut ledger = RouteLedger::new(Vec::new());
        let now = Utc::now();

        let route = ledger
            .finalize(&flight("abc", [10.0, 20.0], [30.0, 40.0]), &index, now)
            .unwrap();
        assert_eq!(route.airline, "AL");
        assert_eq!(route.flight_number, "123");
        assert_eq!(route.source, "AAA");
        assert_eq!(route.destination, "BBB");
        assert_eq!(route.status, RouteStatus::Active);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_repeat_finalize_refreshes_instead_of_duplicating() {
        let index = index();
        let mut ledger = RouteLedger::new(Vec::new());
        let t1 = Utc::now();
        let t2 = t1 + Duration::hours(1);

        ledger.finalize(&flight("abc", [10.0, 20.0], [30.0, 40.0]), &index, t1);
        ledger.finalize(&flight("def", [10.0, 20.0], [30.0, 40.0]), &index, t2);

        assert_eq!(ledger.len(), 1);
        let key = (
            "AL".to_string(),
            "123".to_string(),
            "AAA".to_string(),
            "BBB".to_string(),
        );
        let route = ledger.get(&key).unwrap();
        assert_eq!(route.last_seen, t2);
        assert_eq!(route.first_seen, t1);
        assert_eq!(route.icao24, "def");
    }

    #[test]
    fn test_unresolved_endpoint_drops_flight() {
        let index = index();
        let mut ledger = RouteLedger::new(Vec::new());

        // Destination in the middle of nowhere
        let result = ledger.finalize(&flight("abc", [10.0, 20.0], [0.0, 0.0]), &index, Utc::now());
        assert!(result.is_none());
        assert!(ledger.is_empty());
        assert_eq!(ledger.dropped_unresolved(), 1);
    }

    #[test]
    fn test_self_loop_rejected() {
        let index = index();
        let mut ledger = RouteLedger::new(Vec::new());

        // Both endpoints snap to AAA
        let result = ledger.finalize(
            &flight("abc", [10.0, 20.0], [10.05, 20.05]),
            &index,
            Utc::now(),
        );
        assert!(result.is_none());
        assert!(ledger.is_empty());
        assert_eq!(ledger.dropped_self_loops(), 1);
    }

    #[test]
    fn test_empty_airline_falls_back_to_callsign() {
        let index = index();
        let mut ledger = RouteLedger::new(Vec::new());

        let mut f = flight("abc", [10.0, 20.0], [30.0, 40.0]);
        f.airline = String::new();
        f.flight_number = String::new();
        f.callsign = "RYR456".to_string();

        let route = ledger.finalize(&f, &index, Utc::now()).unwrap();
        assert_eq!(route.airline, "RYR");
        assert_eq!(route.flight_number, "456");
    }

    fn stored_route(last_seen: DateTime<Utc>) -> Route {
        Route {
            airline: "AL".to_string(),
            flight_number: "123".to_string(),
            icao24: "abc".to_string(),
            source: "AAA".to_string(),
            destination: "BBB".to_string(),
            first_seen: last_seen,
            last_seen,
            status: RouteStatus::Active,
        }
    }

    #[test]
    fn test_age_and_prune_windows() {
        let now = Utc::now();
        let fresh = stored_route(now - Duration::days(1));
        let mut stale = stored_route(now - Duration::days(25));
        stale.flight_number = "124".to_string();
        let mut expired = stored_route(now - Duration::days(32));
        expired.flight_number = "125".to_string();

        let mut ledger = RouteLedger::new(vec![fresh, stale, expired]);
        let removed = ledger.age_and_prune(now);

        assert_eq!(removed, 1);
        assert_eq!(ledger.len(), 2);

        let routes = ledger.to_routes();
        assert_eq!(routes[0].flight_number, "123");
        assert_eq!(routes[0].status, RouteStatus::Active);
        assert_eq!(routes[1].flight_number, "124");
        assert_eq!(routes[1].status, RouteStatus::NotActive);
    }

    #[test]
    fn test_age_and_prune_idempotent() {
        let now = Utc::now();
        let mut expired = stored_route(now - Duration::days(32));
        expired.flight_number = "124".to_string();
        let mut ledger = RouteLedger::new(vec![stored_route(now - Duration::days(1)), expired]);

        let first = ledger.age_and_prune(now);
        let before = ledger.to_routes();
        let second = ledger.age_and_prune(now);
        let after = ledger.to_routes();

        assert_eq!(second, 0);
        assert_eq!(before.len(), after.len());
        assert!(first >= 1);
        for (a, b) in before.iter().zip(after.iter()) {
            assert_eq!(a.status, b.status);
            assert_eq!(a.last_seen, b.last_seen);
        }
    }

    #[test]
    fn test_scrub_self_loops() {
        let now = Utc::now();
        let good = stored_route(now);
        let mut bad = stored_route(now);
        bad.destination = "AAA".to_string();
        bad.flight_number = "999".to_string();

        let mut ledger = RouteLedger::new(vec![good, bad]);
        assert_eq!(ledger.scrub_self_loops(), 1);
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.to_routes()[0].destination, "BBB");
    }
}
