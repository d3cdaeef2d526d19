//! Driver selection for incoming orders.
//!
//! Each candidate driver is scored as
//! `load_weight × roster size + speed_weight / speed + compatibility`, where
//! compatibility measures how far the order stretches the driver's current
//! route. Drivers at capacity, and drivers whose route would grow beyond
//! `backtrack_ratio` times its current length, are excluded. The lowest
//! score wins; ties go to the lowest driver id.

use crate::store::FleetChange;
use crate::{
    DRIVER_CAPACITY, DispatchError, Driver, DriverId, GeoModel, Order, OrderBook, OrderId,
    OrderStatus, RouteBuilder,
};

/// Weights and thresholds used when scoring drivers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DispatchConfig {
    /// Maximum roster size.
    pub capacity: usize,
    /// Score added per order already on the roster.
    pub load_weight: f64,
    /// Numerator of the speed term; faster drivers score lower.
    pub speed_weight: f64,
    /// Route growth factor beyond which a driver is excluded.
    pub backtrack_ratio: f64,
    /// Divisor applied to the detour of an existing route.
    pub detour_divisor: f64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            capacity: DRIVER_CAPACITY,
            load_weight: 2.0,
            speed_weight: 10.0,
            backtrack_ratio: 1.5,
            detour_divisor: 2.0,
        }
    }
}

/// Score components for one eligible driver. Lower totals are better.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriverScore {
    /// Driver being scored.
    pub driver: DriverId,
    /// Penalty for orders already carried.
    pub load_factor: f64,
    /// Penalty for slow drivers.
    pub speed_bonus: f64,
    /// Cost of fitting the order into the driver's route.
    pub compatibility: f64,
}

impl DriverScore {
    /// Sum of all components.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.load_factor + self.speed_bonus + self.compatibility
    }
}

/// Verdict for one driver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Evaluation {
    /// The roster is full.
    AtCapacity,
    /// Appending the order would stretch the route too far.
    Backtracking {
        /// Length of the current route.
        current_length: f64,
        /// Length with the order's stops appended.
        test_length: f64,
    },
    /// The driver is eligible with this score.
    Scored(DriverScore),
}

/// Result of a dispatch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentOutcome {
    /// The order now belongs to this driver.
    Assigned(DriverId),
    /// No driver qualified; the order is pending.
    NoDriver,
}

impl AssignmentOutcome {
    /// The selected driver, if any.
    #[must_use]
    pub const fn driver(self) -> Option<DriverId> {
        match self {
            Self::Assigned(driver) => Some(driver),
            Self::NoDriver => None,
        }
    }

    /// Whether a driver was selected.
    #[must_use]
    pub const fn is_assigned(self) -> bool {
        matches!(self, Self::Assigned(_))
    }

    /// Escalate [`AssignmentOutcome::NoDriver`] into an error.
    ///
    /// # Errors
    /// Returns [`DispatchError::NoCapacity`] when no driver was selected.
    ///
    /// # Examples
    /// ```
    /// use dispatch_core::{AssignmentOutcome, DispatchError, DriverId, OrderId};
    ///
    /// let order = OrderId::new(4);
    /// assert_eq!(
    ///     AssignmentOutcome::Assigned(DriverId::new(1)).into_result(order)?,
    ///     DriverId::new(1)
    /// );
    /// assert!(matches!(
    ///     AssignmentOutcome::NoDriver.into_result(order),
    ///     Err(DispatchError::NoCapacity { .. })
    /// ));
    /// # Ok::<(), DispatchError>(())
    /// ```
    pub const fn into_result(self, order: OrderId) -> Result<DriverId, DispatchError> {
        match self {
            Self::Assigned(driver) => Ok(driver),
            Self::NoDriver => Err(DispatchError::NoCapacity { order }),
        }
    }
}

/// A dispatch decision and the store mutations that realise it.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentPlan {
    /// Which driver, if any, takes the order.
    pub outcome: AssignmentOutcome,
    /// Score of the selected driver.
    pub score: Option<DriverScore>,
    /// Changes to commit atomically.
    pub changes: Vec<FleetChange>,
}

/// Scores drivers against a graph snapshot.
#[derive(Debug, Clone, Copy)]
pub struct DispatchMatcher<'a> {
    geo: &'a GeoModel,
    config: DispatchConfig,
}

impl<'a> DispatchMatcher<'a> {
    /// Create a matcher with the default [`DispatchConfig`].
    #[must_use]
    pub fn new(geo: &'a GeoModel) -> Self {
        Self::with_config(geo, DispatchConfig::default())
    }

    /// Create a matcher with explicit weights.
    #[must_use]
    pub const fn with_config(geo: &'a GeoModel, config: DispatchConfig) -> Self {
        Self { geo, config }
    }

    /// Evaluate `driver` for `order`.
    ///
    /// The driver's current route is built from its roster and `orders`.
    ///
    /// # Errors
    /// Returns [`DispatchError::NotFound`] when the order or the driver
    /// refers to an unknown location.
    ///
    /// # Examples
    /// ```
    /// use dispatch_core::{
    ///     DispatchMatcher, Driver, DriverId, Evaluation, GeoModel, Location, LocationId, Order,
    ///     OrderBook, OrderId,
    /// };
    ///
    /// let a = LocationId::new(1);
    /// let b = LocationId::new(2);
    /// let geo = GeoModel::new(
    ///     [Location::new(a, "A", 0.0, 0.0)?, Location::new(b, "B", 3.0, 4.0)?],
    ///     [],
    /// );
    /// let driver = Driver::new(DriverId::new(1), a, 2.0)?;
    /// let order = Order::new(OrderId::new(1), a, b);
    ///
    /// let Evaluation::Scored(score) =
    ///     DispatchMatcher::new(&geo).evaluate(&order, &driver, &OrderBook::new())?
    /// else {
    ///     panic!("idle driver should be eligible");
    /// };
    /// assert_eq!(score.total(), 7.5);
    /// # Ok::<(), dispatch_core::DispatchError>(())
    /// ```
    pub fn evaluate(
        &self,
        order: &Order,
        driver: &Driver,
        orders: &OrderBook,
    ) -> Result<Evaluation, DispatchError> {
        let load = driver.load();
        if load >= self.config.capacity {
            return Ok(Evaluation::AtCapacity);
        }
        let load_factor = self.config.load_weight * load as f64;
        let speed_bonus = self.config.speed_weight / driver.speed;
        let delivery_leg = self.geo.distance(order.restaurant, order.customer)?;

        let route = RouteBuilder::new(self.geo).build(driver, orders);
        let compatibility = if let [_, .., last] = route.as_slice() {
            let current_length = self.geo.route_length(&route)?;
            let test_length =
                current_length + self.geo.distance(*last, order.restaurant)? + delivery_leg;
            if test_length > self.config.backtrack_ratio * current_length {
                return Ok(Evaluation::Backtracking {
                    current_length,
                    test_length,
                });
            }
            (test_length - current_length) / self.config.detour_divisor
        } else {
            let approach = self.geo.distance(driver.location, order.restaurant)?;
            (approach + delivery_leg) / driver.speed
        };

        Ok(Evaluation::Scored(DriverScore {
            driver: driver.id,
            load_factor,
            speed_bonus,
            compatibility,
        }))
    }

    /// Pick the best driver for `order` among `drivers`.
    ///
    /// Drivers are considered in ascending id order and the first minimum
    /// wins. Drivers standing at unknown locations are skipped.
    ///
    /// # Errors
    /// Returns [`DispatchError::NotFound`] when the order refers to an unknown
    /// location.
    pub fn select(
        &self,
        order: &Order,
        drivers: &[Driver],
        orders: &OrderBook,
    ) -> Result<Option<DriverScore>, DispatchError> {
        for location in [order.restaurant, order.customer] {
            if !self.geo.contains(location) {
                return Err(DispatchError::unknown_location(location));
            }
        }

        let mut candidates: Vec<&Driver> = drivers.iter().collect();
        candidates.sort_by_key(|d| d.id);

        let mut best: Option<DriverScore> = None;
        for driver in candidates {
            if !self.geo.contains(driver.location) {
                log::warn!(
                    "driver {} is at unknown location {}; skipping",
                    driver.id,
                    driver.location
                );
                continue;
            }
            match self.evaluate(order, driver, orders)? {
                Evaluation::AtCapacity => {
                    log::debug!("driver {} is at capacity for order {}", driver.id, order.id);
                }
                Evaluation::Backtracking {
                    current_length,
                    test_length,
                } => {
                    log::debug!(
                        "driver {} would backtrack for order {} ({current_length:.2} -> {test_length:.2})",
                        driver.id,
                        order.id
                    );
                }
                Evaluation::Scored(score) => {
                    log::debug!(
                        "driver {} scores {:.3} for order {}",
                        driver.id,
                        score.total(),
                        order.id
                    );
                    if best.is_none_or(|b| score.total() < b.total()) {
                        best = Some(score);
                    }
                }
            }
        }
        Ok(best)
    }

    /// Decide who takes `order_id` and list the changes that apply it.
    ///
    /// The order is first detached from any roster that carries it, so a
    /// re-assignment is scored as if the order were new and the previous
    /// roster entry is removed in the same batch.
    ///
    /// # Errors
    /// Returns [`DispatchError::NotFound`] when the order is not in `orders`
    /// or refers to an unknown location.
    pub fn plan(
        &self,
        order_id: OrderId,
        drivers: &[Driver],
        orders: &OrderBook,
    ) -> Result<AssignmentPlan, DispatchError> {
        let order = orders
            .get(&order_id)
            .ok_or(DispatchError::unknown_order(order_id))?;

        let mut changes = Vec::new();
        let detached: Vec<Driver> = drivers
            .iter()
            .map(|driver| {
                let mut driver = driver.clone();
                if driver.carries(order_id) {
                    changes.push(FleetChange::RemoveOrder {
                        driver: driver.id,
                        order: order_id,
                    });
                    driver.orders.retain(|id| *id != order_id);
                }
                driver
            })
            .collect();

        let score = self.select(order, &detached, orders)?;
        let outcome = match score {
            Some(score) => {
                changes.extend([
                    FleetChange::RequireVacancy {
                        driver: score.driver,
                        capacity: self.config.capacity,
                    },
                    FleetChange::AppendOrder {
                        driver: score.driver,
                        order: order_id,
                    },
                    FleetChange::SetOrderStatus {
                        order: order_id,
                        status: OrderStatus::Assigned,
                    },
                    FleetChange::SetAssignedDriver {
                        order: order_id,
                        driver: Some(score.driver),
                    },
                ]);
                AssignmentOutcome::Assigned(score.driver)
            }
            None => {
                changes.extend([
                    FleetChange::SetOrderStatus {
                        order: order_id,
                        status: OrderStatus::Pending,
                    },
                    FleetChange::SetAssignedDriver {
                        order: order_id,
                        driver: None,
                    },
                ]);
                AssignmentOutcome::NoDriver
            }
        };
        Ok(AssignmentPlan {
            outcome,
            score,
            changes,
        })
    }
}
