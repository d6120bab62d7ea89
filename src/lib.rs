//! Skyroutes - infers air routes from live aircraft position reports.
//!
//! Live positions from the OpenSky state feed are correlated against the
//! OurAirports reference set: each aircraft's first and last observed
//! coordinates are snapped to their nearest airports, and when the aircraft
//! disappears from the feed the resulting (airline, flight number, origin,
//! destination) pair is recorded in a deduplicated route ledger with aging
//! and pruning. All state is persisted as whole JSON snapshots.

pub mod actions;
pub mod airlines;
pub mod airport_index;
pub mod airports;
pub mod callsign;
pub mod config;
pub mod correlator;
pub mod flight_tracker;
pub mod flights;
pub mod instance_lock;
pub mod loader;
pub mod opensky_client;
pub mod route_ledger;
pub mod routes;
pub mod snapshot_repo;
pub mod web;

pub use airport_index::AirportIndex;
pub use flights::{ActiveFlight, PositionReport};
pub use routes::{Route, RouteStatus, Stats};
