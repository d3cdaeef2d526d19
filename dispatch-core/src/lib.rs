//! Core dispatch and routing engine for delivery fleets.
//!
//! The crate models a weighted location graph ([`GeoModel`]), answers
//! point-to-point queries over it ([`PathFinder`]), orders a driver's pickups
//! and dropoffs into a multi-stop route ([`RouteBuilder`]) and chooses the best
//! driver for a new order ([`DispatchMatcher`]).
//!
//! Persistence is delegated to implementations of the store traits in
//! [`store`]. [`DispatchService`] ties the pieces together: it keeps a
//! lock-free snapshot of the geography, serialises fleet mutations behind a
//! single roster lock and commits each assignment atomically.
//!
//! # Examples
//!
//! ```
//! use dispatch_core::{DispatchService, Location, LocationId, MemoryStore};
//!
//! # fn main() -> Result<(), dispatch_core::DispatchError> {
//! let service = DispatchService::new(MemoryStore::default())?;
//! service.add_location(Location::new(LocationId::new(1), "Kitchen", 0.0, 0.0)?)?;
//! service.add_location(Location::new(LocationId::new(2), "Customer", 3.0, 4.0)?)?;
//! let driver = service.add_driver(2.0, Some(LocationId::new(1)))?;
//!
//! let placed = service.place_order(LocationId::new(1), LocationId::new(2))?;
//! let assignment = placed.assignment.expect("one idle driver");
//! assert_eq!(assignment.driver, driver);
//! assert_eq!(assignment.route, vec![LocationId::new(1), LocationId::new(2)]);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod dispatch;
mod driver;
mod error;
mod geo_model;
mod ids;
mod location;
mod order;
pub mod path;
pub mod route;
mod service;
pub mod store;

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-support")))]
pub mod test_support;

pub use dispatch::{AssignmentOutcome, DispatchConfig, DispatchMatcher, DriverScore, Evaluation};
pub use driver::{DRIVER_CAPACITY, Driver, validate_speed};
pub use error::{DispatchError, RecordKind};
pub use geo_model::GeoModel;
pub use ids::{DriverId, LocationId, OrderId};
pub use location::{DEFAULT_TRAFFIC_FACTOR, Edge, Location};
pub use order::{Order, OrderBook, OrderStatus};
pub use path::{PathFinder, ShortestPath};
pub use route::{RouteBuilder, Stop, StopKind};
pub use service::{DispatchService, DriverAssignment, PlacedOrder};
pub use store::{
    DriverStore, FleetChange, FleetStore, LocationStore, MemoryStore, OrderStore, StoreError,
};
