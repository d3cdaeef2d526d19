//! Persistence contracts for the dispatch engine.
//!
//! The engine reads the graph through [`LocationStore`] and the fleet through
//! [`OrderStore`] and [`DriverStore`]. Mutations produced by one dispatch
//! decision are applied together through [`FleetStore::commit`], so readers
//! never observe a roster and an order status that disagree.
//!
//! Implementations synchronise internally; every method takes `&self`.

use std::error::Error as StdError;

use thiserror::Error;

use crate::{
    Driver, DriverId, Edge, Location, LocationId, Order, OrderBook, OrderId, OrderStatus,
    RecordKind,
};

mod memory;

pub use memory::MemoryStore;

/// Errors raised by store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A mutation referenced a record that does not exist.
    #[error("{kind} {id} does not exist")]
    MissingRecord {
        /// Kind of the missing record.
        kind: RecordKind,
        /// Raw identifier of the missing record.
        id: u64,
    },
    /// An insert collided with an existing record.
    #[error("{kind} {id} already exists")]
    DuplicateRecord {
        /// Kind of the existing record.
        kind: RecordKind,
        /// Raw identifier of the existing record.
        id: u64,
    },
    /// A roster reached its capacity before the batch was applied.
    ///
    /// Raised by [`FleetChange::RequireVacancy`] when another writer filled the
    /// roster after the batch was planned.
    #[error("driver {driver} already carries {capacity} orders")]
    RosterFull {
        /// Driver whose roster is full.
        driver: DriverId,
        /// Capacity the batch required to be free.
        capacity: usize,
    },
    /// The storage backend failed.
    #[error("store backend failed: {0}")]
    Backend(#[source] Box<dyn StdError + Send + Sync>),
}

impl StoreError {
    /// Wrap a backend-specific error.
    pub fn backend<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::Backend(Box::new(err))
    }

    /// Missing-record error for a location.
    #[must_use]
    pub const fn missing_location(id: LocationId) -> Self {
        Self::MissingRecord {
            kind: RecordKind::Location,
            id: id.get(),
        }
    }

    /// Missing-record error for an order.
    #[must_use]
    pub const fn missing_order(id: OrderId) -> Self {
        Self::MissingRecord {
            kind: RecordKind::Order,
            id: id.get(),
        }
    }

    /// Missing-record error for a driver.
    #[must_use]
    pub const fn missing_driver(id: DriverId) -> Self {
        Self::MissingRecord {
            kind: RecordKind::Driver,
            id: id.get(),
        }
    }
}

/// One mutation of fleet state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FleetChange {
    /// Replace an order's status.
    SetOrderStatus {
        /// Order to update.
        order: OrderId,
        /// New status.
        status: OrderStatus,
    },
    /// Replace an order's assigned driver.
    SetAssignedDriver {
        /// Order to update.
        order: OrderId,
        /// New driver, or `None` to clear.
        driver: Option<DriverId>,
    },
    /// Fail the batch unless the driver's roster is shorter than `capacity`.
    ///
    /// Placed before an [`FleetChange::AppendOrder`] so that a plan built from
    /// a stale roster cannot overfill it.
    RequireVacancy {
        /// Driver whose roster is checked.
        driver: DriverId,
        /// Maximum roster length.
        capacity: usize,
    },
    /// Append an order to the end of a driver's roster.
    ///
    /// Appending an order already on the roster leaves it unchanged.
    AppendOrder {
        /// Driver whose roster grows.
        driver: DriverId,
        /// Order to append.
        order: OrderId,
    },
    /// Remove an order from a driver's roster if present.
    RemoveOrder {
        /// Driver whose roster shrinks.
        driver: DriverId,
        /// Order to remove.
        order: OrderId,
    },
    /// Delete an order record.
    DeleteOrder {
        /// Order to delete.
        order: OrderId,
    },
    /// Move a driver.
    SetDriverLocation {
        /// Driver to move.
        driver: DriverId,
        /// New location.
        location: LocationId,
    },
}

/// Access to locations and edges.
pub trait LocationStore {
    /// Fetch one location.
    fn location(&self, id: LocationId) -> Result<Option<Location>, StoreError>;

    /// All locations in ascending id order.
    fn locations(&self) -> Result<Vec<Location>, StoreError>;

    /// All directed edges.
    fn edges(&self) -> Result<Vec<Edge>, StoreError>;

    /// Add a location.
    ///
    /// Fails with [`StoreError::DuplicateRecord`] when the id is taken.
    fn insert_location(&self, location: Location) -> Result<(), StoreError>;

    /// Add an edge, replacing any edge with the same source and destination.
    fn upsert_edge(&self, edge: Edge) -> Result<(), StoreError>;
}

/// Access to delivery orders.
pub trait OrderStore {
    /// Fetch one order.
    fn order(&self, id: OrderId) -> Result<Option<Order>, StoreError>;

    /// All orders keyed by id.
    fn orders(&self) -> Result<OrderBook, StoreError>;

    /// Create an unassigned order in the `Preparing` state and return its id.
    fn create_order(
        &self,
        restaurant: LocationId,
        customer: LocationId,
    ) -> Result<OrderId, StoreError>;

    /// Replace an order's status.
    fn set_status(&self, id: OrderId, status: OrderStatus) -> Result<(), StoreError>;

    /// Replace an order's assigned driver.
    fn set_assigned_driver(&self, id: OrderId, driver: Option<DriverId>)
    -> Result<(), StoreError>;

    /// Delete an order, returning whether it existed.
    fn delete_order(&self, id: OrderId) -> Result<bool, StoreError>;
}

/// Access to drivers and their rosters.
pub trait DriverStore {
    /// Fetch one driver.
    fn driver(&self, id: DriverId) -> Result<Option<Driver>, StoreError>;

    /// All drivers in ascending id order.
    fn drivers(&self) -> Result<Vec<Driver>, StoreError>;

    /// Create an idle driver and return its id.
    fn create_driver(&self, location: LocationId, speed: f64) -> Result<DriverId, StoreError>;

    /// Append an order to a driver's roster.
    fn append_order(&self, driver: DriverId, order: OrderId) -> Result<(), StoreError>;

    /// Remove an order from a driver's roster, returning whether it was there.
    fn remove_order(&self, driver: DriverId, order: OrderId) -> Result<bool, StoreError>;

    /// Move a driver.
    fn set_location(&self, driver: DriverId, location: LocationId) -> Result<(), StoreError>;
}

/// Orders and drivers that can be mutated together.
pub trait FleetStore: OrderStore + DriverStore {
    /// Apply `changes` in order, atomically.
    ///
    /// Either every change is applied or, on error, none is.
    fn commit(&self, changes: &[FleetChange]) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io;

    #[rstest]
    fn backend_errors_keep_their_source() {
        let err = StoreError::backend(io::Error::other("disk full"));
        assert_eq!(err.to_string(), "store backend failed: disk full");
        assert!(err.source().is_some());
    }

    #[rstest]
    fn missing_records_name_their_kind() {
        let err = StoreError::missing_driver(DriverId::new(3));
        assert_eq!(err.to_string(), "driver 3 does not exist");
    }
}
