//! Fixture builders shared by unit, behaviour and downstream tests.
//!
//! Builders use struct literals so they never fail; callers are expected to
//! pass finite coordinates and positive speeds.

use geo::Coord;

use crate::{
    DEFAULT_TRAFFIC_FACTOR, Driver, DriverId, Edge, Location, LocationId, MemoryStore, Order,
    OrderId,
};

/// Location `id` named `L{id}` at `(x, y)`.
#[must_use]
pub fn location(id: u64, x: f64, y: f64) -> Location {
    Location {
        id: LocationId::new(id),
        name: format!("L{id}"),
        position: Coord { x, y },
    }
}

/// Directed edge with an explicit traffic factor.
#[must_use]
pub fn edge(source: u64, destination: u64, distance: f64, traffic_factor: f64) -> Edge {
    Edge {
        source: LocationId::new(source),
        destination: LocationId::new(destination),
        distance,
        traffic_factor,
    }
}

/// Directed edge without congestion.
#[must_use]
pub fn free_edge(source: u64, destination: u64, distance: f64) -> Edge {
    edge(source, destination, distance, DEFAULT_TRAFFIC_FACTOR)
}

/// Driver `id` at `location` carrying `roster`.
#[must_use]
pub fn driver(id: u64, location: u64, speed: f64, roster: &[u64]) -> Driver {
    Driver {
        id: DriverId::new(id),
        location: LocationId::new(location),
        speed,
        orders: roster.iter().copied().map(OrderId::new).collect(),
    }
}

/// Unassigned order `id` from `restaurant` to `customer`.
#[must_use]
pub fn order(id: u64, restaurant: u64, customer: u64) -> Order {
    Order::new(
        OrderId::new(id),
        LocationId::new(restaurant),
        LocationId::new(customer),
    )
}

/// Memory store with `A(0,0)`, `B(3,4)` and `C(6,8)` as locations 1 to 3 and
/// no edges, drivers or orders.
#[must_use]
pub fn sample_store() -> MemoryStore {
    MemoryStore::with_geography(
        [
            location(1, 0.0, 0.0),
            location(2, 3.0, 4.0),
            location(3, 6.0, 8.0),
        ],
        [],
    )
}

/// Memory store with locations `1..=count` laid out on a `width`-wide grid
/// of unit spacing, joined by free-flowing edges to their right and lower
/// neighbours.
#[must_use]
pub fn grid_store(width: u64, count: u64) -> MemoryStore {
    let width = width.max(1);
    let locations = (1..=count).map(|id| {
        let index = id - 1;
        location(id, (index % width) as f64, (index / width) as f64)
    });
    let edges = (1..=count).flat_map(|id| {
        let right = (id % width != 0 && id < count).then(|| free_edge(id, id + 1, 1.0));
        let down = (id + width <= count).then(|| free_edge(id, id + width, 1.0));
        right.into_iter().chain(down)
    });
    MemoryStore::with_geography(locations.collect::<Vec<_>>(), edges.collect::<Vec<_>>())
}
