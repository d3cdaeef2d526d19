//! Facade crate for the delivery dispatch engine.
//!
//! This crate re-exports the core domain types and the dispatch service, and
//! exposes the SQLite store behind a feature flag.

#![forbid(unsafe_code)]

pub use dispatch_core::{
    AssignmentOutcome, DispatchConfig, DispatchError, DispatchMatcher, DispatchService, Driver,
    DriverAssignment, DriverId, DriverScore, DriverStore, Edge, Evaluation, FleetChange,
    FleetStore, GeoModel, Location, LocationId, LocationStore, MemoryStore, Order, OrderBook,
    OrderId, OrderStatus, OrderStore, PathFinder, PlacedOrder, RecordKind, RouteBuilder,
    ShortestPath, Stop, StopKind, StoreError,
};

#[cfg(feature = "store-sqlite")]
pub use dispatch_store::{SqliteStore, SqliteStoreError};
