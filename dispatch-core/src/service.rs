//! Thread-safe facade over a store and the dispatch algorithms.

use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;

use crate::dispatch::AssignmentPlan;
use crate::store::{FleetChange, FleetStore, LocationStore, StoreError};
use crate::{
    AssignmentOutcome, DispatchConfig, DispatchError, DispatchMatcher, Driver, DriverId, Edge,
    GeoModel, Location, LocationId, Order, OrderBook, OrderId, PathFinder, RouteBuilder,
    ShortestPath, validate_speed,
};

/// Plans rebuilt after another writer filled the chosen roster.
const MAX_PLAN_ATTEMPTS: usize = 8;

/// A driver chosen for a freshly placed order.
#[derive(Debug, Clone, PartialEq)]
pub struct DriverAssignment {
    /// Selected driver.
    pub driver: DriverId,
    /// Where the driver currently is.
    pub location: LocationId,
    /// Driver speed.
    pub speed: f64,
    /// The driver's route including the new order.
    pub route: Vec<LocationId>,
}

/// Result of [`DispatchService::place_order`].
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedOrder {
    /// Identifier of the new order.
    pub order: OrderId,
    /// Driver details when one was found.
    pub assignment: Option<DriverAssignment>,
}

/// Dispatch operations over a store.
///
/// Graph reads use a published [`GeoModel`] snapshot and never block.
/// Operations that read rosters and then mutate them run under a single
/// roster lock, so concurrent assignments cannot both claim the last slot of
/// a driver. Services sharing one store across processes rely on the store
/// rejecting [`FleetChange::RequireVacancy`] for a full roster; the plan is
/// then rebuilt from fresh reads.
pub struct DispatchService<S> {
    store: S,
    geo: ArcSwap<GeoModel>,
    roster: Mutex<()>,
    config: DispatchConfig,
}

impl<S> std::fmt::Debug for DispatchService<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchService")
            .field("locations", &self.geo.load().len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S> DispatchService<S>
where
    S: LocationStore + FleetStore,
{
    /// Wrap `store` with the default [`DispatchConfig`].
    ///
    /// # Errors
    /// Propagates store failures raised while loading the graph.
    pub fn new(store: S) -> Result<Self, DispatchError> {
        Self::with_config(store, DispatchConfig::default())
    }

    /// Wrap `store` with explicit scoring weights.
    ///
    /// # Errors
    /// Propagates store failures raised while loading the graph.
    pub fn with_config(store: S, config: DispatchConfig) -> Result<Self, DispatchError> {
        let geo = GeoModel::from_store(&store)?;
        Ok(Self {
            store,
            geo: ArcSwap::from_pointee(geo),
            roster: Mutex::new(()),
            config,
        })
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Scoring weights in use.
    pub fn config(&self) -> DispatchConfig {
        self.config
    }

    /// Current graph snapshot.
    pub fn geo(&self) -> Arc<GeoModel> {
        self.geo.load_full()
    }

    /// Reload the graph snapshot from the store.
    ///
    /// # Errors
    /// Propagates store failures.
    pub fn refresh_geo(&self) -> Result<(), DispatchError> {
        let geo = GeoModel::from_store(&self.store)?;
        self.geo.store(Arc::new(geo));
        Ok(())
    }

    /// Add a location and publish the new graph.
    ///
    /// # Errors
    /// Fails when the id is already taken or the store fails.
    pub fn add_location(&self, location: Location) -> Result<(), DispatchError> {
        self.store.insert_location(location)?;
        self.refresh_geo()
    }

    /// Add or replace a directed edge and publish the new graph.
    ///
    /// # Errors
    /// Returns [`DispatchError::NotFound`] for unknown endpoints.
    pub fn add_edge(&self, edge: Edge) -> Result<(), DispatchError> {
        let geo = self.geo.load_full();
        for end in [edge.source, edge.destination] {
            if !geo.contains(end) {
                return Err(DispatchError::unknown_location(end));
            }
        }
        self.store.upsert_edge(edge)?;
        self.refresh_geo()
    }

    /// Register a driver.
    ///
    /// Without an explicit `start`, the driver starts at the location with the
    /// lowest id.
    ///
    /// # Errors
    /// Returns [`DispatchError::InvalidInput`] for a bad speed or when no
    /// location exists, and [`DispatchError::NotFound`] for an unknown start.
    pub fn add_driver(
        &self,
        speed: f64,
        start: Option<LocationId>,
    ) -> Result<DriverId, DispatchError> {
        validate_speed(speed)?;
        let geo = self.geo.load_full();
        let location = match start {
            Some(id) if geo.contains(id) => id,
            Some(id) => return Err(DispatchError::unknown_location(id)),
            None => geo.locations().next().map(|l| l.id).ok_or_else(|| {
                DispatchError::InvalidInput("no locations exist to start a driver at".into())
            })?,
        };
        let _guard = self.roster.lock();
        let id = self.store.create_driver(location, speed)?;
        log::info!("driver {id} registered at location {location}");
        Ok(id)
    }

    /// Move a driver to another location.
    ///
    /// # Errors
    /// Returns [`DispatchError::NotFound`] for an unknown driver or location.
    pub fn relocate_driver(
        &self,
        driver: DriverId,
        location: LocationId,
    ) -> Result<(), DispatchError> {
        if !self.geo.load().contains(location) {
            return Err(DispatchError::unknown_location(location));
        }
        let _guard = self.roster.lock();
        if self.store.driver(driver)?.is_none() {
            return Err(DispatchError::unknown_driver(driver));
        }
        self.store.commit(&[FleetChange::SetDriverLocation { driver, location }])?;
        Ok(())
    }

    /// Create an order and try to dispatch it immediately.
    ///
    /// # Errors
    /// Returns [`DispatchError::NotFound`] when either location is unknown.
    pub fn place_order(
        &self,
        restaurant: LocationId,
        customer: LocationId,
    ) -> Result<PlacedOrder, DispatchError> {
        let geo = self.geo.load_full();
        for location in [restaurant, customer] {
            if !geo.contains(location) {
                return Err(DispatchError::unknown_location(location));
            }
        }
        let _guard = self.roster.lock();
        let order = self.store.create_order(restaurant, customer)?;
        log::info!("order {order} placed from {restaurant} to {customer}");
        let outcome = self.assign_locked(&geo, order)?;
        let assignment = match outcome.driver() {
            Some(driver) => Some(self.assignment_details(&geo, driver)?),
            None => None,
        };
        Ok(PlacedOrder { order, assignment })
    }

    /// Dispatch (or re-dispatch) an existing order.
    ///
    /// # Errors
    /// Returns [`DispatchError::NotFound`] for an unknown order.
    pub fn assign_order(&self, order: OrderId) -> Result<AssignmentOutcome, DispatchError> {
        let geo = self.geo.load_full();
        let _guard = self.roster.lock();
        self.assign_locked(&geo, order)
    }

    /// Mark an order as delivered, removing it from the system.
    ///
    /// Returns `false` when the order does not exist.
    ///
    /// # Errors
    /// Propagates store failures.
    pub fn complete_order(&self, order: OrderId) -> Result<bool, DispatchError> {
        let _guard = self.roster.lock();
        let Some(record) = self.store.order(order)? else {
            return Ok(false);
        };
        let mut changes: Vec<FleetChange> = self
            .store
            .drivers()?
            .into_iter()
            .filter(|d| d.carries(order))
            .map(|d| FleetChange::RemoveOrder {
                driver: d.id,
                order,
            })
            .collect();
        changes.push(FleetChange::DeleteOrder { order });
        self.store.commit(&changes)?;
        match record.assigned_driver {
            Some(driver) => log::info!("order {order} delivered by driver {driver}"),
            None => log::info!("order {order} completed without a driver"),
        }
        Ok(true)
    }

    /// Current route of a driver.
    ///
    /// # Errors
    /// Returns [`DispatchError::NotFound`] for an unknown driver.
    pub fn driver_route(&self, driver: DriverId) -> Result<Vec<LocationId>, DispatchError> {
        let geo = self.geo.load_full();
        let _guard = self.roster.lock();
        let record = self
            .store
            .driver(driver)?
            .ok_or(DispatchError::unknown_driver(driver))?;
        let orders = self.store.orders()?;
        Ok(RouteBuilder::new(&geo).build(&record, &orders))
    }

    /// Cheapest path between two locations.
    ///
    /// # Errors
    /// Returns [`DispatchError::NotFound`] for unknown endpoints.
    pub fn shortest_path(
        &self,
        start: LocationId,
        end: LocationId,
    ) -> Result<ShortestPath, DispatchError> {
        let geo = self.geo.load();
        PathFinder::new(&geo).shortest_path(start, end)
    }

    /// All locations in ascending id order.
    ///
    /// # Errors
    /// Propagates store failures.
    pub fn locations(&self) -> Result<Vec<Location>, DispatchError> {
        Ok(self.store.locations()?)
    }

    /// All orders in ascending id order.
    ///
    /// # Errors
    /// Propagates store failures.
    pub fn orders(&self) -> Result<Vec<Order>, DispatchError> {
        Ok(self.store.orders()?.into_values().collect())
    }

    /// All drivers in ascending id order.
    ///
    /// # Errors
    /// Propagates store failures.
    pub fn drivers(&self) -> Result<Vec<Driver>, DispatchError> {
        Ok(self.store.drivers()?)
    }

    fn assign_locked(
        &self,
        geo: &GeoModel,
        order: OrderId,
    ) -> Result<AssignmentOutcome, DispatchError> {
        let matcher = DispatchMatcher::with_config(geo, self.config);
        let mut attempt = 1;
        let (outcome, score) = loop {
            let orders: OrderBook = self.store.orders()?;
            let drivers = self.store.drivers()?;
            let AssignmentPlan {
                outcome,
                score,
                changes,
            } = matcher.plan(order, &drivers, &orders)?;
            match self.store.commit(&changes) {
                Ok(()) => break (outcome, score),
                Err(StoreError::RosterFull { driver, .. }) if attempt < MAX_PLAN_ATTEMPTS => {
                    log::debug!(
                        "driver {driver} filled up before order {order} was committed; replanning"
                    );
                    attempt += 1;
                }
                Err(err) => return Err(err.into()),
            }
        };
        match (outcome, score) {
            (AssignmentOutcome::Assigned(driver), Some(score)) => {
                log::info!(
                    "order {order} assigned to driver {driver} (score {:.3})",
                    score.total()
                );
            }
            _ => log::info!("no driver available for order {order}; marked pending"),
        }
        Ok(outcome)
    }

    fn assignment_details(
        &self,
        geo: &GeoModel,
        driver: DriverId,
    ) -> Result<DriverAssignment, DispatchError> {
        let record = self
            .store
            .driver(driver)?
            .ok_or(DispatchError::unknown_driver(driver))?;
        let orders = self.store.orders()?;
        let route = RouteBuilder::new(geo).build(&record, &orders);
        Ok(DriverAssignment {
            driver,
            location: record.location,
            speed: record.speed,
            route,
        })
    }
}
