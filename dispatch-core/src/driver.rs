//! Fleet drivers and their order rosters.

use crate::{DispatchError, DriverId, LocationId, OrderId};

/// Maximum number of orders a driver may carry at once.
pub const DRIVER_CAPACITY: usize = 3;

/// A courier with a position, a speed and an ordered roster of orders.
#[derive(Debug, Clone, PartialEq)]
pub struct Driver {
    /// Unique identifier.
    pub id: DriverId,
    /// Where the driver currently is.
    pub location: LocationId,
    /// Travel speed, strictly positive.
    pub speed: f64,
    /// Assigned orders in assignment order.
    pub orders: Vec<OrderId>,
}

impl Driver {
    /// Validate and construct an idle [`Driver`].
    ///
    /// # Errors
    /// Returns [`DispatchError::InvalidInput`] when `speed` is not a positive,
    /// finite number.
    ///
    /// # Examples
    /// ```
    /// use dispatch_core::{Driver, DriverId, LocationId};
    ///
    /// let driver = Driver::new(DriverId::new(1), LocationId::new(1), 2.0)?;
    /// assert_eq!(driver.load(), 0);
    /// assert!(Driver::new(DriverId::new(2), LocationId::new(1), 0.0).is_err());
    /// # Ok::<(), dispatch_core::DispatchError>(())
    /// ```
    pub fn new(id: DriverId, location: LocationId, speed: f64) -> Result<Self, DispatchError> {
        validate_speed(speed)?;
        Ok(Self {
            id,
            location,
            speed,
            orders: Vec::new(),
        })
    }

    /// Number of orders on the roster.
    #[must_use]
    pub fn load(&self) -> usize {
        self.orders.len()
    }

    /// Whether the roster contains `order`.
    #[must_use]
    pub fn carries(&self, order: OrderId) -> bool {
        self.orders.contains(&order)
    }
}

/// Reject speeds that would break the dispatch score.
///
/// # Errors
/// Returns [`DispatchError::InvalidInput`] unless `speed` is finite and
/// positive.
pub fn validate_speed(speed: f64) -> Result<(), DispatchError> {
    if speed.is_finite() && speed > 0.0 {
        Ok(())
    } else {
        Err(DispatchError::InvalidInput(
            "driver speed must be a positive number".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(-1.0)]
    #[case(0.0)]
    #[case(f64::INFINITY)]
    #[case(f64::NAN)]
    fn rejects_unusable_speeds(#[case] speed: f64) {
        assert!(Driver::new(DriverId::new(1), LocationId::new(1), speed).is_err());
    }

    #[rstest]
    fn carries_reports_roster_membership() {
        let mut driver = Driver::new(DriverId::new(1), LocationId::new(1), 1.0).expect("driver");
        driver.orders.push(OrderId::new(5));
        assert!(driver.carries(OrderId::new(5)));
        assert!(!driver.carries(OrderId::new(6)));
        assert_eq!(driver.load(), 1);
    }
}
