//! In-process store backed by ordered maps behind a read-write lock.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use super::{DriverStore, FleetChange, FleetStore, LocationStore, OrderStore, StoreError};
use crate::{
    Driver, DriverId, Edge, Location, LocationId, Order, OrderBook, OrderId, OrderStatus,
    RecordKind,
};

#[derive(Debug, Clone, Default)]
struct FleetState {
    locations: BTreeMap<LocationId, Location>,
    edges: BTreeMap<(LocationId, LocationId), Edge>,
    orders: OrderBook,
    drivers: BTreeMap<DriverId, Driver>,
}

impl FleetState {
    fn next_order_id(&self) -> OrderId {
        let last = self.orders.keys().next_back().map_or(0, |id| id.get());
        OrderId::new(last + 1)
    }

    fn next_driver_id(&self) -> DriverId {
        let last = self.drivers.keys().next_back().map_or(0, |id| id.get());
        DriverId::new(last + 1)
    }

    fn order_mut(&mut self, id: OrderId) -> Result<&mut Order, StoreError> {
        self.orders
            .get_mut(&id)
            .ok_or(StoreError::missing_order(id))
    }

    fn driver_mut(&mut self, id: DriverId) -> Result<&mut Driver, StoreError> {
        self.drivers
            .get_mut(&id)
            .ok_or(StoreError::missing_driver(id))
    }

    fn apply(&mut self, change: FleetChange) -> Result<(), StoreError> {
        match change {
            FleetChange::SetOrderStatus { order, status } => {
                self.order_mut(order)?.status = status;
            }
            FleetChange::SetAssignedDriver { order, driver } => {
                if let Some(driver) = driver
                    && !self.drivers.contains_key(&driver)
                {
                    return Err(StoreError::missing_driver(driver));
                }
                self.order_mut(order)?.assigned_driver = driver;
            }
            FleetChange::RequireVacancy { driver, capacity } => {
                if self.driver_mut(driver)?.orders.len() >= capacity {
                    return Err(StoreError::RosterFull { driver, capacity });
                }
            }
            FleetChange::AppendOrder { driver, order } => {
                if !self.orders.contains_key(&order) {
                    return Err(StoreError::missing_order(order));
                }
                let roster = &mut self.driver_mut(driver)?.orders;
                if !roster.contains(&order) {
                    roster.push(order);
                }
            }
            FleetChange::RemoveOrder { driver, order } => {
                self.driver_mut(driver)?.orders.retain(|id| *id != order);
            }
            FleetChange::DeleteOrder { order } => {
                self.orders
                    .remove(&order)
                    .ok_or(StoreError::missing_order(order))?;
                for driver in self.drivers.values_mut() {
                    driver.orders.retain(|id| *id != order);
                }
            }
            FleetChange::SetDriverLocation { driver, location } => {
                if !self.locations.contains_key(&location) {
                    return Err(StoreError::missing_location(location));
                }
                self.driver_mut(driver)?.location = location;
            }
        }
        Ok(())
    }
}

/// Store holding every record in memory.
///
/// Suitable for tests, benchmarks and embedding. Batches passed to
/// [`FleetStore::commit`] are applied to a copy of the state that replaces the
/// original only when every change succeeds.
///
/// # Examples
/// ```
/// use dispatch_core::{Location, LocationId, LocationStore, MemoryStore, OrderStore};
///
/// let store = MemoryStore::default();
/// store.insert_location(Location::new(LocationId::new(1), "Kitchen", 0.0, 0.0)?)?;
/// let order = store.create_order(LocationId::new(1), LocationId::new(1))?;
/// assert_eq!(order.get(), 1);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<FleetState>,
}

impl MemoryStore {
    /// Create a store pre-populated with a graph.
    pub fn with_geography<L, E>(locations: L, edges: E) -> Self
    where
        L: IntoIterator<Item = Location>,
        E: IntoIterator<Item = Edge>,
    {
        let state = FleetState {
            locations: locations.into_iter().map(|l| (l.id, l)).collect(),
            edges: edges
                .into_iter()
                .map(|e| ((e.source, e.destination), e))
                .collect(),
            ..FleetState::default()
        };
        Self {
            state: RwLock::new(state),
        }
    }

    /// Add drivers with explicit ids, replacing any with the same id.
    #[must_use]
    pub fn with_drivers<D>(self, drivers: D) -> Self
    where
        D: IntoIterator<Item = Driver>,
    {
        {
            let mut state = self.state.write();
            state
                .drivers
                .extend(drivers.into_iter().map(|d| (d.id, d)));
        }
        self
    }

    /// Add orders with explicit ids, replacing any with the same id.
    #[must_use]
    pub fn with_orders<O>(self, orders: O) -> Self
    where
        O: IntoIterator<Item = Order>,
    {
        {
            let mut state = self.state.write();
            state.orders.extend(orders.into_iter().map(|o| (o.id, o)));
        }
        self
    }
}

impl LocationStore for MemoryStore {
    fn location(&self, id: LocationId) -> Result<Option<Location>, StoreError> {
        Ok(self.state.read().locations.get(&id).cloned())
    }

    fn locations(&self) -> Result<Vec<Location>, StoreError> {
        Ok(self.state.read().locations.values().cloned().collect())
    }

    fn edges(&self) -> Result<Vec<Edge>, StoreError> {
        Ok(self.state.read().edges.values().copied().collect())
    }

    fn insert_location(&self, location: Location) -> Result<(), StoreError> {
        let mut state = self.state.write();
        if state.locations.contains_key(&location.id) {
            return Err(StoreError::DuplicateRecord {
                kind: RecordKind::Location,
                id: location.id.get(),
            });
        }
        state.locations.insert(location.id, location);
        Ok(())
    }

    fn upsert_edge(&self, edge: Edge) -> Result<(), StoreError> {
        let mut state = self.state.write();
        for end in [edge.source, edge.destination] {
            if !state.locations.contains_key(&end) {
                return Err(StoreError::missing_location(end));
            }
        }
        state.edges.insert((edge.source, edge.destination), edge);
        Ok(())
    }
}

impl OrderStore for MemoryStore {
    fn order(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        Ok(self.state.read().orders.get(&id).cloned())
    }

    fn orders(&self) -> Result<OrderBook, StoreError> {
        Ok(self.state.read().orders.clone())
    }

    fn create_order(
        &self,
        restaurant: LocationId,
        customer: LocationId,
    ) -> Result<OrderId, StoreError> {
        let mut state = self.state.write();
        let id = state.next_order_id();
        state
            .orders
            .insert(id, Order::new(id, restaurant, customer));
        Ok(id)
    }

    fn set_status(&self, id: OrderId, status: OrderStatus) -> Result<(), StoreError> {
        self.state
            .write()
            .apply(FleetChange::SetOrderStatus { order: id, status })
    }

    fn set_assigned_driver(
        &self,
        id: OrderId,
        driver: Option<DriverId>,
    ) -> Result<(), StoreError> {
        self.state
            .write()
            .apply(FleetChange::SetAssignedDriver { order: id, driver })
    }

    fn delete_order(&self, id: OrderId) -> Result<bool, StoreError> {
        match self.state.write().apply(FleetChange::DeleteOrder { order: id }) {
            Ok(()) => Ok(true),
            Err(StoreError::MissingRecord { .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }
}

impl DriverStore for MemoryStore {
    fn driver(&self, id: DriverId) -> Result<Option<Driver>, StoreError> {
        Ok(self.state.read().drivers.get(&id).cloned())
    }

    fn drivers(&self) -> Result<Vec<Driver>, StoreError> {
        Ok(self.state.read().drivers.values().cloned().collect())
    }

    fn create_driver(&self, location: LocationId, speed: f64) -> Result<DriverId, StoreError> {
        let mut state = self.state.write();
        if !state.locations.contains_key(&location) {
            return Err(StoreError::missing_location(location));
        }
        let id = state.next_driver_id();
        state.drivers.insert(
            id,
            Driver {
                id,
                location,
                speed,
                orders: Vec::new(),
            },
        );
        Ok(id)
    }

    fn append_order(&self, driver: DriverId, order: OrderId) -> Result<(), StoreError> {
        self.state
            .write()
            .apply(FleetChange::AppendOrder { driver, order })
    }

    fn remove_order(&self, driver: DriverId, order: OrderId) -> Result<bool, StoreError> {
        let mut state = self.state.write();
        let roster = &mut state.driver_mut(driver)?.orders;
        let before = roster.len();
        roster.retain(|id| *id != order);
        Ok(roster.len() != before)
    }

    fn set_location(&self, driver: DriverId, location: LocationId) -> Result<(), StoreError> {
        self.state
            .write()
            .apply(FleetChange::SetDriverLocation { driver, location })
    }
}

impl FleetStore for MemoryStore {
    fn commit(&self, changes: &[FleetChange]) -> Result<(), StoreError> {
        let mut state = self.state.write();
        let mut staged = state.clone();
        for change in changes {
            staged.apply(*change)?;
        }
        *state = staged;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    fn id(raw: u64) -> LocationId {
        LocationId::new(raw)
    }

    #[fixture]
    fn store() -> MemoryStore {
        MemoryStore::with_geography(
            [
                Location::new(id(1), "Kitchen", 0.0, 0.0).unwrap(),
                Location::new(id(2), "House", 3.0, 4.0).unwrap(),
            ],
            [],
        )
    }

    #[rstest]
    fn duplicate_locations_are_rejected(store: MemoryStore) {
        let err = store
            .insert_location(Location::new(id(1), "Again", 1.0, 1.0).unwrap())
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateRecord { id: 1, .. }));
    }

    #[rstest]
    fn edges_are_replaced_per_direction(store: MemoryStore) {
        store.upsert_edge(Edge::new(id(1), id(2), 5.0, 1.0).unwrap()).unwrap();
        store.upsert_edge(Edge::new(id(1), id(2), 5.0, 2.0).unwrap()).unwrap();
        store.upsert_edge(Edge::new(id(2), id(1), 5.0, 1.0).unwrap()).unwrap();
        let edges = store.edges().unwrap();
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0].traffic_factor, 2.0);
    }

    #[rstest]
    fn edges_need_known_endpoints(store: MemoryStore) {
        let err = store
            .upsert_edge(Edge::new(id(1), id(7), 1.0, 1.0).unwrap())
            .unwrap_err();
        assert!(matches!(err, StoreError::MissingRecord { id: 7, .. }));
    }

    #[rstest]
    fn ids_are_allocated_sequentially(store: MemoryStore) {
        assert_eq!(store.create_order(id(1), id(2)).unwrap(), OrderId::new(1));
        assert_eq!(store.create_order(id(1), id(2)).unwrap(), OrderId::new(2));
        assert_eq!(store.create_driver(id(1), 1.0).unwrap(), DriverId::new(1));
    }

    #[rstest]
    fn failed_commits_leave_state_untouched(store: MemoryStore) {
        let order = store.create_order(id(1), id(2)).unwrap();
        let driver = store.create_driver(id(1), 1.0).unwrap();
        let err = store
            .commit(&[
                FleetChange::AppendOrder { driver, order },
                FleetChange::SetOrderStatus {
                    order: OrderId::new(99),
                    status: OrderStatus::Assigned,
                },
            ])
            .unwrap_err();
        assert!(matches!(err, StoreError::MissingRecord { .. }));
        assert!(store.driver(driver).unwrap().unwrap().orders.is_empty());
    }

    #[rstest]
    fn successful_commits_apply_every_change(store: MemoryStore) {
        let order = store.create_order(id(1), id(2)).unwrap();
        let driver = store.create_driver(id(1), 1.0).unwrap();
        store
            .commit(&[
                FleetChange::AppendOrder { driver, order },
                FleetChange::AppendOrder { driver, order },
                FleetChange::SetOrderStatus {
                    order,
                    status: OrderStatus::Assigned,
                },
                FleetChange::SetAssignedDriver {
                    order,
                    driver: Some(driver),
                },
            ])
            .unwrap();
        assert_eq!(store.driver(driver).unwrap().unwrap().orders, vec![order]);
        let stored = store.order(order).unwrap().unwrap();
        assert!(stored.is_consistent());
        assert_eq!(stored.status, OrderStatus::Assigned);
    }

    #[rstest]
    fn full_rosters_reject_further_orders(store: MemoryStore) {
        let driver = store.create_driver(id(1), 1.0).unwrap();
        let first = store.create_order(id(1), id(2)).unwrap();
        let second = store.create_order(id(1), id(2)).unwrap();
        store.append_order(driver, first).unwrap();
        let err = store
            .commit(&[
                FleetChange::RequireVacancy {
                    driver,
                    capacity: 1,
                },
                FleetChange::AppendOrder {
                    driver,
                    order: second,
                },
            ])
            .unwrap_err();
        assert!(matches!(err, StoreError::RosterFull { capacity: 1, .. }));
        assert_eq!(store.driver(driver).unwrap().unwrap().orders, vec![first]);

        store
            .commit(&[
                FleetChange::RequireVacancy {
                    driver,
                    capacity: 2,
                },
                FleetChange::AppendOrder {
                    driver,
                    order: second,
                },
            ])
            .unwrap();
        assert_eq!(
            store.driver(driver).unwrap().unwrap().orders,
            vec![first, second]
        );
    }

    #[rstest]
    fn deleting_an_order_clears_rosters(store: MemoryStore) {
        let order = store.create_order(id(1), id(2)).unwrap();
        let driver = store.create_driver(id(1), 1.0).unwrap();
        store.append_order(driver, order).unwrap();
        assert!(store.delete_order(order).unwrap());
        assert!(!store.delete_order(order).unwrap());
        assert!(store.driver(driver).unwrap().unwrap().orders.is_empty());
    }

    #[rstest]
    fn remove_order_reports_membership(store: MemoryStore) {
        let order = store.create_order(id(1), id(2)).unwrap();
        let driver = store.create_driver(id(1), 1.0).unwrap();
        store.append_order(driver, order).unwrap();
        assert!(store.remove_order(driver, order).unwrap());
        assert!(!store.remove_order(driver, order).unwrap());
    }
}
