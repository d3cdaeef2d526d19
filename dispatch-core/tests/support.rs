//! Fixture builders shared by the integration tests.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use dispatch_core::{
    Driver, DriverId, Edge, Location, LocationId, MemoryStore, Order, OrderId, OrderStatus,
};

/// Location `id` at `(x, y)`.
pub fn location(id: u64, x: f64, y: f64) -> Location {
    Location::new(LocationId::new(id), format!("L{id}"), x, y)
        .unwrap_or_else(|err| panic!("location {id} should be valid: {err}"))
}

/// Directed edge from `source` to `destination`.
pub fn edge(source: u64, destination: u64, distance: f64, traffic_factor: f64) -> Edge {
    Edge::new(
        LocationId::new(source),
        LocationId::new(destination),
        distance,
        traffic_factor,
    )
    .unwrap_or_else(|err| panic!("edge {source}->{destination} should be valid: {err}"))
}

/// Driver `id` at `at` with an empty roster.
pub fn driver(id: u64, at: u64, speed: f64) -> Driver {
    Driver::new(DriverId::new(id), LocationId::new(at), speed)
        .unwrap_or_else(|err| panic!("driver {id} should be valid: {err}"))
}

/// Order `id` already assigned to `driver`.
pub fn assigned_order(id: u64, restaurant: u64, customer: u64, driver: u64) -> Order {
    let mut order = Order::new(
        OrderId::new(id),
        LocationId::new(restaurant),
        LocationId::new(customer),
    );
    order.status = OrderStatus::Assigned;
    order.assigned_driver = Some(DriverId::new(driver));
    order
}

/// Memory store holding `points` as `(id, x, y)` and no edges.
pub fn store_with(points: &[(u64, f64, f64)]) -> MemoryStore {
    MemoryStore::with_geography(
        points
            .iter()
            .map(|&(id, x, y)| location(id, x, y))
            .collect::<Vec<_>>(),
        Vec::new(),
    )
}

/// Parse a comma-separated list of location ids such as `1,2,3`.
pub fn parse_ids(raw: &str) -> Vec<LocationId> {
    raw.trim_matches('"')
        .split(',')
        .filter(|part| !part.trim().is_empty())
        .map(|part| {
            part.parse()
                .unwrap_or_else(|err| panic!("'{part}' should be a location id: {err}"))
        })
        .collect()
}
