use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::airport_index::AirportIndex;
use crate::callsign::parse_callsign;
use crate::flights::{ActiveFlight, PositionReport};

/// What happened to a single aircraft's state for one report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackOutcome {
    /// First sighting with a usable coordinate; origin resolved now.
    Created,
    /// Known aircraft; position, timestamp, and callsign refreshed.
    Updated,
}

/// Counts and finalized flights from one ingestion cycle.
#[derive(Debug, Default)]
pub struct CycleOutcome {
    pub created: usize,
    pub updated: usize,
    pub skipped_no_position: usize,
    /// Aircraft that vanished from the feed this cycle, popped from active
    /// state. Each appears here exactly once, on its first absent cycle.
    pub finalized: Vec<ActiveFlight>,
}

/// Per-aircraft state machine over the active-flight map.
///
/// Constructed from the persisted map at the start of a cycle; the updated
/// map is taken back out with [`into_flights`](Self::into_flights) and
/// persisted wholesale when the cycle ends.
pub struct ActiveFlightTracker {
    flights: HashMap<String, ActiveFlight>,
}

impl ActiveFlightTracker {
    pub fn new(flights: HashMap<String, ActiveFlight>) -> Self {
        Self { flights }
    }

    /// Ingest one cycle's worth of reports and finalize aircraft that
    /// disappeared since the previous cycle.
    pub fn run_cycle(
        &mut self,
        reports: &[PositionReport],
        index: &AirportIndex,
        now: DateTime<Utc>,
    ) -> CycleOutcome {
        let mut outcome = CycleOutcome::default();

        // Every id in the feed counts as present, even when its coordinates
        // are unusable; absence from the feed is what triggers finalization.
        let mut seen: HashSet<&str> = HashSet::with_capacity(reports.len());

        for report in reports {
            seen.insert(report.icao24.as_str());
            match self.ingest_report(report, index, now) {
                Some(TrackOutcome::Created) => outcome.created += 1,
                Some(TrackOutcome::Updated) => outcome.updated += 1,
                None => outcome.skipped_no_position += 1,
            }
        }

        let missing: Vec<String> = self
            .flights
            .keys()
            .filter(|id| !seen.contains(id.as_str()))
            .cloned()
            .collect();

        for id in missing {
            if let Some(flight) = self.flights.remove(&id) {
                debug!(
                    "Finalizing flight {} ({}) after disappearance from feed",
                    flight.icao24, flight.callsign
                );
                outcome.finalized.push(flight);
            }
        }

        outcome
    }

    /// Apply a single report. Returns `None` when the report carries no
    /// usable coordinate and is dropped before any state change.
    pub fn ingest_report(
        &mut self,
        report: &PositionReport,
        index: &AirportIndex,
        now: DateTime<Utc>,
    ) -> Option<TrackOutcome> {
        let coord = report.coordinates()?;
        let callsign = report.callsign.trim().to_string();
        let (airline, flight_number) = parse_callsign(&callsign);

        match self.flights.get_mut(&report.icao24) {
            Some(flight) => {
                flight.last_coord = coord;
                flight.last_updated = now;
                flight.callsign = callsign;
                flight.airline = airline;
                flight.flight_number = flight_number;
                // origin_* stays pinned to the first sighting
                Some(TrackOutcome::Updated)
            }
            None => {
                let origin = index.nearest(coord[0], coord[1]);
                let flight = ActiveFlight {
                    icao24: report.icao24.clone(),
                    callsign,
                    airline,
                    flight_number,
                    origin_code: origin.map(|a| a.code.clone()),
                    origin_name: origin.map(|a| a.name.clone()),
                    origin_coord: coord,
                    last_coord: coord,
                    first_seen: now,
                    last_updated: now,
                };
                self.flights.insert(report.icao24.clone(), flight);
                Some(TrackOutcome::Created)
            }
        }
    }

    pub fn get(&self, icao24: &str) -> Option<&ActiveFlight> {
        self.flights.get(icao24)
    }

    pub fn len(&self) -> usize {
        self.flights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flights.is_empty()
    }

    pub fn into_flights(self) -> HashMap<String, ActiveFlight> {
        self.flights
    }
}
