//! Delivery orders and their lifecycle states.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::{DriverId, LocationId, OrderId};

/// Orders keyed by id, iterated in ascending id order.
pub type OrderBook = BTreeMap<OrderId, Order>;

/// Lifecycle state of an [`Order`].
///
/// # Examples
/// ```
/// use dispatch_core::OrderStatus;
///
/// assert_eq!(OrderStatus::Assigned.as_str(), "Assigned");
/// assert_eq!("pending".parse::<OrderStatus>(), Ok(OrderStatus::Pending));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OrderStatus {
    /// Freshly placed; no dispatch attempt yet.
    #[default]
    Preparing,
    /// Carried by a driver.
    Assigned,
    /// A dispatch attempt found no driver.
    Pending,
    /// Handed to the customer; excluded from routes.
    Delivered,
}

impl OrderStatus {
    /// Return the status label used on the wire and in storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Preparing => "Preparing",
            Self::Assigned => "Assigned",
            Self::Pending => "Pending",
            Self::Delivered => "Delivered",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "preparing" => Ok(Self::Preparing),
            "assigned" => Ok(Self::Assigned),
            "pending" => Ok(Self::Pending),
            "delivered" => Ok(Self::Delivered),
            _ => Err(format!("unknown order status '{s}'")),
        }
    }
}

/// A request to carry food from a restaurant to a customer.
///
/// `status == Assigned` holds exactly when `assigned_driver` is set; see
/// [`Order::is_consistent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    /// Unique identifier.
    pub id: OrderId,
    /// Pickup location.
    pub restaurant: LocationId,
    /// Dropoff location.
    pub customer: LocationId,
    /// Lifecycle state.
    pub status: OrderStatus,
    /// Driver carrying the order, if any.
    pub assigned_driver: Option<DriverId>,
}

impl Order {
    /// Construct an unassigned order in the [`OrderStatus::Preparing`] state.
    #[must_use]
    pub const fn new(id: OrderId, restaurant: LocationId, customer: LocationId) -> Self {
        Self {
            id,
            restaurant,
            customer,
            status: OrderStatus::Preparing,
            assigned_driver: None,
        }
    }

    /// Whether the assignment invariant holds for this record.
    ///
    /// # Examples
    /// ```
    /// use dispatch_core::{DriverId, LocationId, Order, OrderId, OrderStatus};
    ///
    /// let mut order = Order::new(OrderId::new(1), LocationId::new(1), LocationId::new(2));
    /// assert!(order.is_consistent());
    /// order.status = OrderStatus::Assigned;
    /// assert!(!order.is_consistent());
    /// order.assigned_driver = Some(DriverId::new(3));
    /// assert!(order.is_consistent());
    /// ```
    #[must_use]
    pub const fn is_consistent(&self) -> bool {
        matches!(self.status, OrderStatus::Assigned) == self.assigned_driver.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(OrderStatus::Preparing)]
    #[case(OrderStatus::Assigned)]
    #[case(OrderStatus::Pending)]
    #[case(OrderStatus::Delivered)]
    fn labels_parse_back(#[case] status: OrderStatus) {
        assert_eq!(status.as_str().parse::<OrderStatus>(), Ok(status));
    }

    #[rstest]
    fn unknown_labels_are_rejected() {
        assert!("Lost".parse::<OrderStatus>().is_err());
    }

    #[rstest]
    fn new_orders_are_preparing_and_unassigned() {
        let order = Order::new(OrderId::new(9), LocationId::new(1), LocationId::new(2));
        assert_eq!(order.status, OrderStatus::Preparing);
        assert_eq!(order.assigned_driver, None);
    }
}
