//! JSON documents printed by each command.

use std::io::Write;

use dispatch_core::{
    AssignmentOutcome, Driver, DriverId, Location, LocationId, Order, OrderId, PlacedOrder,
    ShortestPath,
};
use serde::Serialize;

use crate::CliError;

/// Message reported when a new order finds no driver.
pub(crate) const NO_DRIVER_AVAILABLE: &str = "No driver available";
/// Message reported when reassignment finds no driver.
pub(crate) const NO_SUITABLE_DRIVER: &str = "No suitable driver available";

/// Result of `place-order`.
#[derive(Debug, Serialize, PartialEq)]
#[serde(untagged)]
pub(crate) enum PlaceOrderOutput {
    Assigned {
        #[serde(rename = "orderId")]
        order_id: u64,
        #[serde(rename = "driverId")]
        driver_id: u64,
        #[serde(rename = "driverLocation")]
        driver_location: u64,
        #[serde(rename = "driverSpeed")]
        driver_speed: f64,
        route: Vec<u64>,
    },
    Unassigned {
        #[serde(rename = "orderId")]
        order_id: u64,
        message: &'static str,
    },
}

impl From<PlacedOrder> for PlaceOrderOutput {
    fn from(placed: PlacedOrder) -> Self {
        match placed.assignment {
            Some(assignment) => Self::Assigned {
                order_id: placed.order.get(),
                driver_id: assignment.driver.get(),
                driver_location: assignment.location.get(),
                driver_speed: assignment.speed,
                route: raw_ids(&assignment.route),
            },
            None => Self::Unassigned {
                order_id: placed.order.get(),
                message: NO_DRIVER_AVAILABLE,
            },
        }
    }
}

/// Result of `assign-order`.
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AssignOrderOutput {
    pub(crate) success: bool,
    pub(crate) order_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) driver_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) message: Option<&'static str>,
}

impl AssignOrderOutput {
    pub(crate) fn new(order: OrderId, outcome: AssignmentOutcome) -> Self {
        let driver = outcome.driver().map(DriverId::get);
        Self {
            success: driver.is_some(),
            order_id: order.get(),
            driver_id: driver,
            message: driver.is_none().then_some(NO_SUITABLE_DRIVER),
        }
    }
}

/// Result of `driver-route`.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub(crate) struct RouteOutput {
    pub(crate) route: Vec<u64>,
}

/// Result of `shortest-path`.
#[derive(Debug, Serialize, PartialEq)]
pub(crate) struct PathOutput {
    pub(crate) path: Vec<u64>,
    pub(crate) distance: f64,
}

impl From<ShortestPath> for PathOutput {
    fn from(path: ShortestPath) -> Self {
        Self {
            path: raw_ids(&path.stops),
            distance: path.distance,
        }
    }
}

/// Result of `add-driver`.
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NewDriverOutput {
    pub(crate) driver_id: u64,
}

/// Body printed by writes that return nothing.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub(crate) struct Empty {}

/// Error document printed before exiting non-zero.
#[derive(Debug, Serialize)]
struct ErrorOutput {
    error: String,
}

/// Listing row for a location.
#[derive(Debug, Serialize, PartialEq)]
pub(crate) struct LocationRow {
    id: u64,
    name: String,
    x: f64,
    y: f64,
}

impl From<Location> for LocationRow {
    fn from(location: Location) -> Self {
        Self {
            id: location.id.get(),
            name: location.name,
            x: location.position.x,
            y: location.position.y,
        }
    }
}

/// Listing row for an order.
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OrderRow {
    id: u64,
    restaurant_id: u64,
    customer_location_id: u64,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    assigned_driver_id: Option<u64>,
}

impl From<Order> for OrderRow {
    fn from(order: Order) -> Self {
        Self {
            id: order.id.get(),
            restaurant_id: order.restaurant.get(),
            customer_location_id: order.customer.get(),
            status: order.status.as_str(),
            assigned_driver_id: order.assigned_driver.map(DriverId::get),
        }
    }
}

/// Listing row for a driver.
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DriverRow {
    id: u64,
    current_location: u64,
    speed: f64,
    assigned_orders: Vec<u64>,
}

impl From<Driver> for DriverRow {
    fn from(driver: Driver) -> Self {
        Self {
            id: driver.id.get(),
            current_location: driver.location.get(),
            speed: driver.speed,
            assigned_orders: driver.orders.iter().map(|id| id.get()).collect(),
        }
    }
}

pub(crate) fn raw_ids(ids: &[LocationId]) -> Vec<u64> {
    ids.iter().map(|id| id.get()).collect()
}

/// Write `value` as one line of JSON.
pub(crate) fn write_json<T: Serialize>(writer: &mut dyn Write, value: &T) -> Result<(), CliError> {
    let payload = serde_json::to_string(value).map_err(CliError::SerializeOutput)?;
    writer
        .write_all(payload.as_bytes())
        .map_err(CliError::WriteOutput)?;
    writer.write_all(b"\n").map_err(CliError::WriteOutput)
}

/// Write the `{"error": ...}` document for a failed command.
///
/// # Errors
/// Returns [`CliError`] when the document cannot be written.
pub fn write_error(writer: &mut dyn Write, err: &CliError) -> Result<(), CliError> {
    write_json(
        writer,
        &ErrorOutput {
            error: err.to_string(),
        },
    )
}
