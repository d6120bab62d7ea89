use anyhow::Result;
use chrono::{DateTime, Utc};
use metrics::{counter, gauge};
use tracing::info;

use crate::airport_index::AirportIndex;
use crate::flight_tracker::ActiveFlightTracker;
use crate::flights::PositionReport;
use crate::route_ledger::RouteLedger;
use crate::routes::Stats;
use crate::snapshot_repo::SnapshotRepository;

/// One-cycle correlation pipeline over the snapshot store.
///
/// A cycle is a sequential read-modify-write of the whole persisted state:
/// nothing is flushed until every step has run, so an interrupted cycle
/// leaves the previous snapshots untouched. Callers must make cycles
/// mutually exclusive (the web layer holds a run-lock, the CLI an instance
/// lock); two overlapping cycles would silently lose updates.
pub struct RouteCorrelator<'a, R: SnapshotRepository> {
    repo: &'a R,
}

impl<'a, R: SnapshotRepository> RouteCorrelator<'a, R> {
    pub fn new(repo: &'a R) -> Self {
        Self { repo }
    }

    /// Run one correlation cycle over a fresh batch of position reports.
    ///
    /// Loads airports, rebuilds the spatial index from scratch, drives the
    /// per-aircraft state machine, materializes disappeared aircraft into
    /// routes, ages the ledger, and persists all snapshots plus stats.
    pub fn run_cycle(&self, reports: &[PositionReport], now: DateTime<Utc>) -> Result<Stats> {
        let airports = self.repo.load_airports()?;
        let index = AirportIndex::build(airports);

        let mut tracker = ActiveFlightTracker::new(self.repo.load_active_flights()?);
        let mut ledger = RouteLedger::new(self.repo.load_routes()?);

        let outcome = tracker.run_cycle(reports, &index, now);
        for flight in &outcome.finalized {
            ledger.finalize(flight, &index, now);
        }

        let removed = ledger.age_and_prune(now);

        let stats = Stats {
            routes: ledger.len(),
            last_run: Some(now),
            active_planes: tracker.len(),
            removed_last_run: removed,
        };

        let flights = tracker.into_flights();
        self.repo.save_active_flights(&flights)?;
        self.repo.save_routes(&ledger.to_routes())?;
        self.repo.save_stats(&stats)?;

        counter!("correlator.cycles").increment(1);
        counter!("correlator.flights.created").increment(outcome.created as u64);
        counter!("correlator.flights.finalized").increment(outcome.finalized.len() as u64);
        counter!("correlator.routes.pruned").increment(removed as u64);
        gauge!("correlator.routes").set(stats.routes as f64);
        gauge!("correlator.active_flights").set(stats.active_planes as f64);

        info!(
            "Cycle complete: {} airports indexed, {} reports ({} created, {} updated, \
             {} without position), {} finalized, {} routes ({} pruned), {} active flights",
            index.len(),
            reports.len(),
            outcome.created,
            outcome.updated,
            outcome.skipped_no_position,
            outcome.finalized.len(),
            stats.routes,
            removed,
            stats.active_planes
        );

        Ok(stats)
    }
}
