//! Shortest paths over the traffic-weighted location graph.
//!
//! [`PathFinder`] runs Dijkstra's algorithm over the explicit directed edges of
//! a [`GeoModel`]. Edge weight is `distance × traffic_factor`. While the
//! destination has no recorded predecessor, every expanded node also gains a
//! synthetic Euclidean edge to each other known location, so sparse graphs
//! stay connected. The search stops as soon as the destination is popped.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::geo_model::euclidean;
use crate::{DispatchError, GeoModel, LocationId};

/// Result of a shortest-path query.
#[derive(Debug, Clone, PartialEq)]
pub struct ShortestPath {
    /// Locations from start to end inclusive; empty when unreachable.
    pub stops: Vec<LocationId>,
    /// Weighted search cost of the path.
    pub cost: f64,
    /// Euclidean length along the returned stops.
    pub distance: f64,
}

impl ShortestPath {
    fn unreachable() -> Self {
        Self {
            stops: Vec::new(),
            cost: f64::INFINITY,
            distance: 0.0,
        }
    }

    /// Whether the search found no path.
    #[must_use]
    pub fn is_unreachable(&self) -> bool {
        self.stops.is_empty()
    }

    /// Escalate an empty path into an error.
    ///
    /// # Errors
    /// Returns [`DispatchError::Unreachable`] when no path was found.
    pub fn require_reachable(
        self,
        start: LocationId,
        end: LocationId,
    ) -> Result<Self, DispatchError> {
        if self.is_unreachable() {
            Err(DispatchError::Unreachable { start, end })
        } else {
            Ok(self)
        }
    }
}

/// Frontier entry ordered so that [`BinaryHeap`] pops the cheapest node, with
/// ties going to the lowest location id.
#[derive(Debug, Clone, Copy)]
struct Frontier {
    cost: f64,
    node: LocationId,
}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Frontier {}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.node.cmp(&self.node))
    }
}

#[derive(Debug, Default)]
struct Search {
    tentative: HashMap<LocationId, f64>,
    previous: HashMap<LocationId, LocationId>,
    frontier: BinaryHeap<Frontier>,
}

impl Search {
    fn seeded(start: LocationId) -> Self {
        let mut search = Self::default();
        search.tentative.insert(start, 0.0);
        search.frontier.push(Frontier {
            cost: 0.0,
            node: start,
        });
        search
    }

    fn cost_of(&self, node: LocationId) -> f64 {
        self.tentative.get(&node).copied().unwrap_or(f64::INFINITY)
    }

    fn relax(&mut self, from: LocationId, to: LocationId, cost: f64) {
        if cost < self.cost_of(to) {
            self.tentative.insert(to, cost);
            self.previous.insert(to, from);
            self.frontier.push(Frontier { cost, node: to });
        }
    }
}

/// Shortest-path queries against a graph snapshot.
#[derive(Debug, Clone, Copy)]
pub struct PathFinder<'a> {
    geo: &'a GeoModel,
}

impl<'a> PathFinder<'a> {
    /// Create a path finder over `geo`.
    #[must_use]
    pub const fn new(geo: &'a GeoModel) -> Self {
        Self { geo }
    }

    /// Find the cheapest path from `start` to `end`.
    ///
    /// # Errors
    /// Returns [`DispatchError::NotFound`] when either endpoint is unknown.
    ///
    /// # Examples
    /// ```
    /// use dispatch_core::{Edge, GeoModel, Location, LocationId, PathFinder};
    ///
    /// let a = LocationId::new(1);
    /// let b = LocationId::new(2);
    /// let geo = GeoModel::new(
    ///     [Location::new(a, "A", 0.0, 0.0)?, Location::new(b, "B", 12.0, 0.0)?],
    ///     [Edge::new(a, b, 10.0, 3.0)?],
    /// );
    ///
    /// let path = PathFinder::new(&geo).shortest_path(a, b)?;
    /// assert_eq!(path.stops, vec![a, b]);
    /// assert_eq!(path.cost, 12.0);
    /// # Ok::<(), dispatch_core::DispatchError>(())
    /// ```
    pub fn shortest_path(
        &self,
        start: LocationId,
        end: LocationId,
    ) -> Result<ShortestPath, DispatchError> {
        for id in [start, end] {
            if !self.geo.contains(id) {
                return Err(DispatchError::unknown_location(id));
            }
        }

        let mut search = Search::seeded(start);
        let mut settled = HashSet::new();
        while let Some(Frontier { cost, node }) = search.frontier.pop() {
            if cost > search.cost_of(node) || !settled.insert(node) {
                continue;
            }
            if node == end {
                break;
            }
            let needs_fallback = !search.previous.contains_key(&end);
            for edge in self.geo.edges_from(node) {
                search.relax(node, edge.destination, cost + edge.weight());
            }
            if needs_fallback {
                self.relax_fallback(&mut search, node, cost);
            }
        }

        let cost = search.cost_of(end);
        let Some(stops) = reconstruct(&search.previous, start, end, self.geo.len()) else {
            log::debug!("no path from {start} to {end}");
            return Ok(ShortestPath::unreachable());
        };
        let distance = self.geo.route_length(&stops)?;
        Ok(ShortestPath {
            stops,
            cost,
            distance,
        })
    }

    fn relax_fallback(&self, search: &mut Search, node: LocationId, cost: f64) {
        let Some(origin) = self.geo.location(node) else {
            return;
        };
        for target in self.geo.locations().filter(|l| l.id != node) {
            search.relax(node, target.id, cost + euclidean(origin, target));
        }
    }
}

/// Walk predecessor links back from `end`.
///
/// Returns `None` when `end` was never reached or the links do not lead back
/// to `start` within `limit` hops.
fn reconstruct(
    previous: &HashMap<LocationId, LocationId>,
    start: LocationId,
    end: LocationId,
    limit: usize,
) -> Option<Vec<LocationId>> {
    let mut stops = vec![end];
    let mut current = end;
    while current != start {
        current = *previous.get(&current)?;
        stops.push(current);
        if stops.len() > limit {
            return None;
        }
    }
    stops.reverse();
    Some(stops)
}
