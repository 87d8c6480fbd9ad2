//! Weighted undirected graph of named locations with Dijkstra shortest paths.

use crate::types::{Location, Route};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap, HashMap};

/// Mean Earth radius in kilometres
pub const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RouteError {
    /// Id was never registered with `add_location`
    #[error("Unknown location: {0}")]
    UnknownLocation(String),

    #[error("No path from {from} to {to}")]
    NoPath { from: String, to: String },

    #[error("Invalid distance {distance} between {from} and {to}")]
    InvalidDistance {
        from: String,
        to: String,
        distance: f64,
    },
}

/// Great-circle distance in kilometres between two coordinates in degrees
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (lat1, lon1) = (lat1.to_radians(), lon1.to_radians());
    let (lat2, lon2) = (lat2.to_radians(), lon2.to_radians());

    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    // Rounding can push `a` past 1 for near-antipodal points
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

impl Location {
    /// Haversine distance to another location in kilometres
    pub fn distance_to(&self, other: &Location) -> f64 {
        haversine_km(self.lat, self.lon, other.lat, other.lon)
    }
}

/// Heap entry; ordered so the max-heap pops the smallest cost first,
/// and among equal costs the location added earliest
#[derive(Copy, Clone, PartialEq)]
struct State {
    cost: f64,
    position: usize,
}

impl Eq for State {}

impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.position.cmp(&self.position))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Tentative distances and predecessors from one Dijkstra run
struct Settled {
    dist: Vec<f64>,
    prev: Vec<Option<usize>>,
}

/// Route network over named locations
///
/// Locations are kept in insertion order; that order is also the tie-break
/// when two locations have the same tentative distance.
#[derive(Debug, Default)]
pub struct RoutePlanner {
    locations: Vec<Location>,
    positions: HashMap<String, usize>,
    routes: Vec<BTreeMap<usize, f64>>,
}

impl RoutePlanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a location, or replace the record of an existing id in place
    ///
    /// Weights of routes already touching the id are left as they were.
    pub fn add_location(&mut self, id: &str, name: &str, lat: f64, lon: f64) {
        let location = Location {
            id: id.to_string(),
            name: name.to_string(),
            lat,
            lon,
        };

        match self.positions.get(id) {
            Some(&position) => {
                tracing::debug!(id, "overwriting location");
                self.locations[position] = location;
            }
            None => {
                self.positions.insert(id.to_string(), self.locations.len());
                self.locations.push(location);
                self.routes.push(BTreeMap::new());
            }
        }
    }

    /// Add an undirected route and return its stored weight
    ///
    /// Without an explicit distance the haversine distance between the two
    /// locations is used.
    pub fn add_route(
        &mut self,
        from_id: &str,
        to_id: &str,
        distance: Option<f64>,
    ) -> Result<f64, RouteError> {
        let from = self.position(from_id)?;
        let to = self.position(to_id)?;

        // Derived weights go through the same check; non-finite coordinates yield NaN
        let distance =
            distance.unwrap_or_else(|| self.locations[from].distance_to(&self.locations[to]));
        if !(distance.is_finite() && distance >= 0.0) {
            return Err(RouteError::InvalidDistance {
                from: from_id.to_string(),
                to: to_id.to_string(),
                distance,
            });
        }

        if distance == 0.0 {
            tracing::debug!(from = from_id, to = to_id, "zero-weight route");
        }

        self.routes[from].insert(to, distance);
        self.routes[to].insert(from, distance);
        Ok(distance)
    }

    /// Shortest path from `start` to `end` by Dijkstra's algorithm
    pub fn find_shortest_path(&self, start: &str, end: &str) -> Result<Route, RouteError> {
        let source = self.position(start)?;
        let target = self.position(end)?;

        let settled = self.dijkstra(source, Some(target));
        if settled.dist[target].is_infinite() {
            return Err(RouteError::NoPath {
                from: start.to_string(),
                to: end.to_string(),
            });
        }

        // Walk predecessors back from the target
        let mut path = vec![target];
        let mut current = target;
        while let Some(previous) = settled.prev[current] {
            path.push(previous);
            current = previous;
        }
        if current != source {
            return Err(RouteError::NoPath {
                from: start.to_string(),
                to: end.to_string(),
            });
        }
        path.reverse();

        Ok(Route {
            path: path
                .into_iter()
                .map(|position| self.locations[position].id.clone())
                .collect(),
            distance: settled.dist[target],
        })
    }

    /// Shortest distance from `start` to every reachable location
    pub fn shortest_distances(&self, start: &str) -> Result<HashMap<String, f64>, RouteError> {
        let source = self.position(start)?;
        let settled = self.dijkstra(source, None);

        Ok(settled
            .dist
            .into_iter()
            .enumerate()
            .filter(|(_, d)| d.is_finite())
            .map(|(position, d)| (self.locations[position].id.clone(), d))
            .collect())
    }

    /// Run Dijkstra from `source`, stopping early once `target` is settled
    fn dijkstra(&self, source: usize, target: Option<usize>) -> Settled {
        let mut dist = vec![f64::INFINITY; self.locations.len()];
        let mut prev = vec![None; self.locations.len()];
        let mut visited = vec![false; self.locations.len()];
        let mut heap = BinaryHeap::new();

        dist[source] = 0.0;
        heap.push(State {
            cost: 0.0,
            position: source,
        });

        while let Some(State { cost, position }) = heap.pop() {
            if visited[position] {
                continue;
            }
            visited[position] = true;

            if Some(position) == target {
                break;
            }

            for (&next, &weight) in &self.routes[position] {
                if visited[next] {
                    continue;
                }
                let next_cost = cost + weight;
                if next_cost < dist[next] {
                    dist[next] = next_cost;
                    prev[next] = Some(position);
                    heap.push(State {
                        cost: next_cost,
                        position: next,
                    });
                }
            }
        }

        Settled { dist, prev }
    }

    fn position(&self, id: &str) -> Result<usize, RouteError> {
        self.positions
            .get(id)
            .copied()
            .ok_or_else(|| RouteError::UnknownLocation(id.to_string()))
    }

    pub fn location(&self, id: &str) -> Option<&Location> {
        self.positions.get(id).map(|&position| &self.locations[position])
    }

    /// Direct neighbours of a location with their route weights
    pub fn neighbors(&self, id: &str) -> Result<Vec<(&str, f64)>, RouteError> {
        let position = self.position(id)?;
        Ok(self.routes[position]
            .iter()
            .map(|(&next, &weight)| (self.locations[next].id.as_str(), weight))
            .collect())
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}
