use rstar::RTree;
use rstar::primitives::GeomWithData;

use crate::airports::Airport;

/// Mean Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// An aircraft coordinate snaps to the nearest airport only within this
/// great-circle distance; beyond it the position resolves to no airport.
pub const MAX_SNAP_DISTANCE_KM: f64 = 30.0;

type IndexEntry = GeomWithData<[f64; 3], usize>;

/// Spatial index over the airport reference set.
///
/// Coordinates are projected onto unit vectors in 3D Cartesian space, so
/// Euclidean nearest-neighbor over the R-tree is a correct proxy for angular
/// distance on the sphere. The winning candidate is re-verified with the
/// haversine formula against the 30 km acceptance radius.
pub struct AirportIndex {
    tree: RTree<IndexEntry>,
    airports: Vec<Airport>,
}

/// Project a (lat, lon) pair onto the unit sphere.
fn unit_vector(lat: f64, lon: f64) -> [f64; 3] {
    let lat_rad = lat.to_radians();
    let lon_rad = lon.to_radians();
    [
        lat_rad.cos() * lon_rad.cos(),
        lat_rad.cos() * lon_rad.sin(),
        lat_rad.sin(),
    ]
}

/// Great-circle distance between two points in kilometers.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

impl AirportIndex {
    /// Build an index over the given airports. Input order is preserved, so
    /// nearest-neighbor ties resolve the same way for identical input.
    pub fn build(airports: Vec<Airport>) -> Self {
        let entries: Vec<IndexEntry> = airports
            .iter()
            .enumerate()
            .map(|(i, a)| GeomWithData::new(unit_vector(a.lat, a.lon), i))
            .collect();

        Self {
            tree: RTree::bulk_load(entries),
            airports,
        }
    }

    /// Resolve a coordinate to the nearest airport within 30 km, or `None`
    /// when no airport is close enough (or the index is empty).
    pub fn nearest(&self, lat: f64, lon: f64) -> Option<&Airport> {
        let entry = self.tree.nearest_neighbor(&unit_vector(lat, lon))?;
        let airport = &self.airports[entry.data];

        let distance_km = haversine_km(lat, lon, airport.lat, airport.lon);
        if distance_km <= MAX_SNAP_DISTANCE_KM {
            Some(airport)
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.airports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.airports.is_empty()
    }
}
