//! Multi-stop routes for a driver's roster.
//!
//! [`RouteBuilder`] orders the pickups and dropoffs of a driver's orders with a
//! greedy nearest-neighbour walk. A dropoff only becomes eligible once the
//! pickup of the same order has been visited.

use std::collections::{BTreeSet, HashSet};

use geo::Coord;

use crate::geo_model::planar_distance;
use crate::{Driver, GeoModel, LocationId, OrderBook, OrderId, OrderStatus};

/// Whether a stop collects or delivers an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StopKind {
    /// Collect the order at its restaurant.
    Pickup,
    /// Hand the order to its customer.
    Dropoff,
}

/// One pickup or dropoff of one order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stop {
    /// Order the stop belongs to.
    pub order: OrderId,
    /// Where the stop happens.
    pub location: LocationId,
    /// Pickup or dropoff.
    pub kind: StopKind,
    /// Planar position of `location`.
    pub position: Coord<f64>,
}

/// Builds heuristic delivery routes from a graph snapshot.
///
/// # Examples
/// ```
/// use dispatch_core::{
///     Driver, DriverId, GeoModel, Location, LocationId, Order, OrderBook, OrderId, RouteBuilder,
/// };
///
/// let kitchen = LocationId::new(1);
/// let house = LocationId::new(2);
/// let geo = GeoModel::new(
///     [
///         Location::new(kitchen, "Kitchen", 0.0, 0.0)?,
///         Location::new(house, "House", 3.0, 4.0)?,
///     ],
///     [],
/// );
/// let order = Order::new(OrderId::new(1), kitchen, house);
/// let mut driver = Driver::new(DriverId::new(1), kitchen, 1.0)?;
/// driver.orders.push(order.id);
/// let orders = OrderBook::from([(order.id, order)]);
///
/// assert_eq!(RouteBuilder::new(&geo).build(&driver, &orders), vec![kitchen, house]);
/// # Ok::<(), dispatch_core::DispatchError>(())
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RouteBuilder<'a> {
    geo: &'a GeoModel,
}

impl<'a> RouteBuilder<'a> {
    /// Create a builder over `geo`.
    #[must_use]
    pub const fn new(geo: &'a GeoModel) -> Self {
        Self { geo }
    }

    /// Resolve the stops of `driver`'s roster.
    ///
    /// Each order contributes its pickup followed by its dropoff, in roster
    /// order. Delivered orders, orders missing from `orders` and orders whose
    /// locations are unknown contribute nothing.
    #[must_use]
    pub fn stops_for(&self, driver: &Driver, orders: &OrderBook) -> Vec<Stop> {
        let mut stops = Vec::with_capacity(driver.orders.len() * 2);
        for order_id in &driver.orders {
            let Some(order) = orders.get(order_id) else {
                log::debug!("driver {} lists missing order {order_id}", driver.id);
                continue;
            };
            if order.status == OrderStatus::Delivered {
                continue;
            }
            let (Some(restaurant), Some(customer)) = (
                self.geo.location(order.restaurant),
                self.geo.location(order.customer),
            ) else {
                log::warn!("order {order_id} references an unknown location; skipping");
                continue;
            };
            stops.push(Stop {
                order: order.id,
                location: restaurant.id,
                kind: StopKind::Pickup,
                position: restaurant.position,
            });
            stops.push(Stop {
                order: order.id,
                location: customer.id,
                kind: StopKind::Dropoff,
                position: customer.position,
            });
        }
        stops
    }

    /// Build the route for `driver` as a sequence of locations.
    ///
    /// Returns an empty route when the roster resolves to no stops.
    #[must_use]
    pub fn build(&self, driver: &Driver, orders: &OrderBook) -> Vec<LocationId> {
        sequence(&self.stops_for(driver, orders))
    }
}

/// Greedy nearest-neighbour walk with pickup-before-dropoff precedence.
pub(crate) fn sequence(stops: &[Stop]) -> Vec<LocationId> {
    if stops.is_empty() {
        return Vec::new();
    }
    let start = stops
        .iter()
        .position(|s| s.kind == StopKind::Pickup)
        .unwrap_or(0);

    let mut visited = vec![false; stops.len()];
    let mut picked_up = HashSet::new();
    let mut route = Vec::with_capacity(stops.len());
    let mut current = start;

    loop {
        let stop = &stops[current];
        visited[current] = true;
        if stop.kind == StopKind::Pickup {
            picked_up.insert(stop.order);
        }
        if !route.contains(&stop.location) {
            route.push(stop.location);
        }

        let mut nearest: Option<(usize, f64)> = None;
        for (index, candidate) in stops.iter().enumerate() {
            if visited[index]
                || (candidate.kind == StopKind::Dropoff && !picked_up.contains(&candidate.order))
            {
                continue;
            }
            let gap = planar_distance(stop.position, candidate.position);
            if nearest.is_none_or(|(_, best)| gap < best) {
                nearest = Some((index, gap));
            }
        }
        match nearest {
            Some((index, _)) => current = index,
            None => break,
        }
    }

    let distinct: BTreeSet<_> = stops.iter().map(|s| s.location).collect();
    if route.len() < 2 && distinct.len() >= 2 {
        log::warn!("greedy route collapsed to {} stop(s); using fallback order", route.len());
        return fallback_sequence(stops);
    }
    route
}

/// All pickups in input order, then all dropoffs in input order.
fn fallback_sequence(stops: &[Stop]) -> Vec<LocationId> {
    let pickups = stops.iter().filter(|s| s.kind == StopKind::Pickup);
    let dropoffs = stops.iter().filter(|s| s.kind == StopKind::Dropoff);
    let mut route = Vec::with_capacity(stops.len());
    for stop in pickups.chain(dropoffs) {
        if !route.contains(&stop.location) {
            route.push(stop.location);
        }
    }
    route
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DriverId, Location, Order};
    use rstest::{fixture, rstest};

    fn id(raw: u64) -> LocationId {
        LocationId::new(raw)
    }

    fn stop(order: u64, location: u64, kind: StopKind, x: f64, y: f64) -> Stop {
        Stop {
            order: OrderId::new(order),
            location: id(location),
            kind,
            position: Coord { x, y },
        }
    }

    /// Restaurants at 1 and 3, customers at 2 and 4 along the x axis.
    #[fixture]
    fn street() -> GeoModel {
        GeoModel::new(
            [(1, 0.0), (2, 10.0), (3, 1.0), (4, 2.0)]
                .into_iter()
                .map(|(raw, x)| Location::new(id(raw), format!("L{raw}"), x, 0.0).unwrap()),
            [],
        )
    }

    fn driver_with(orders: &[u64]) -> Driver {
        let mut driver = Driver::new(DriverId::new(1), id(1), 1.0).unwrap();
        driver.orders = orders.iter().copied().map(OrderId::new).collect();
        driver
    }

    fn book(orders: &[(u64, u64, u64)]) -> OrderBook {
        orders
            .iter()
            .map(|&(order, restaurant, customer)| {
                let order = Order::new(OrderId::new(order), id(restaurant), id(customer));
                (order.id, order)
            })
            .collect()
    }

    #[rstest]
    fn empty_roster_builds_empty_route(street: GeoModel) {
        let route = RouteBuilder::new(&street).build(&driver_with(&[]), &OrderBook::new());
        assert!(route.is_empty());
    }

    #[rstest]
    fn nearest_eligible_stop_is_visited_next(street: GeoModel) {
        let orders = book(&[(1, 1, 2), (2, 3, 4)]);
        let route = RouteBuilder::new(&street).build(&driver_with(&[1, 2]), &orders);
        assert_eq!(route, vec![id(1), id(3), id(4), id(2)]);
    }

    #[rstest]
    fn dropoffs_wait_for_their_pickup(street: GeoModel) {
        // Customer 4 is close to restaurant 1 but its pickup is at 2.
        let orders = book(&[(1, 1, 3), (2, 2, 4)]);
        let route = RouteBuilder::new(&street).build(&driver_with(&[1, 2]), &orders);
        assert_eq!(route, vec![id(1), id(3), id(2), id(4)]);
    }

    #[rstest]
    fn delivered_and_missing_orders_are_skipped(street: GeoModel) {
        let mut orders = book(&[(1, 1, 2), (2, 3, 4)]);
        if let Some(order) = orders.get_mut(&OrderId::new(1)) {
            order.status = OrderStatus::Delivered;
        }
        let route = RouteBuilder::new(&street).build(&driver_with(&[1, 2, 9]), &orders);
        assert_eq!(route, vec![id(3), id(4)]);
    }

    #[rstest]
    fn shared_locations_are_visited_once(street: GeoModel) {
        let orders = book(&[(1, 1, 2), (2, 1, 4)]);
        let route = RouteBuilder::new(&street).build(&driver_with(&[1, 2]), &orders);
        assert_eq!(route, vec![id(1), id(4), id(2)]);
    }

    #[rstest]
    fn equidistant_stops_keep_input_order() {
        let stops = [
            stop(1, 1, StopKind::Pickup, 0.0, 0.0),
            stop(2, 2, StopKind::Pickup, 1.0, 0.0),
            stop(3, 3, StopKind::Pickup, -1.0, 0.0),
        ];
        assert_eq!(sequence(&stops), vec![id(1), id(2), id(3)]);
    }

    #[rstest]
    fn dropoff_only_input_starts_at_first_stop() {
        let stops = [stop(1, 5, StopKind::Dropoff, 0.0, 0.0)];
        assert_eq!(sequence(&stops), vec![id(5)]);
    }

    #[rstest]
    fn fallback_lists_pickups_before_dropoffs() {
        let stops = [
            stop(1, 1, StopKind::Pickup, 0.0, 0.0),
            stop(1, 2, StopKind::Dropoff, 1.0, 0.0),
            stop(2, 3, StopKind::Pickup, 2.0, 0.0),
            stop(2, 1, StopKind::Dropoff, 0.0, 0.0),
        ];
        assert_eq!(fallback_sequence(&stops), vec![id(1), id(3), id(2)]);
    }
}
