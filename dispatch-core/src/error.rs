//! Error taxonomy shared by the dispatch engine.

use std::fmt;

use thiserror::Error;

use crate::store::StoreError;
use crate::{DriverId, LocationId, OrderId};

/// Kind of record referenced by a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    /// A location in the graph.
    Location,
    /// A delivery order.
    Order,
    /// A fleet driver.
    Driver,
}

impl RecordKind {
    /// Return the kind as a lowercase `&str`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Location => "location",
            Self::Order => "order",
            Self::Driver => "driver",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by the dispatch engine.
///
/// `NotFound`, `NoCapacity` and `Unreachable` describe expected outcomes.
/// Most operations report them as values (`AssignmentOutcome::NoDriver`, an
/// empty [`ShortestPath`](crate::ShortestPath)) and only surface these variants
/// when a caller asks to escalate.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A referenced record does not exist.
    #[error("{kind} {id} not found")]
    NotFound {
        /// Kind of the missing record.
        kind: RecordKind,
        /// Raw identifier of the missing record.
        id: u64,
    },
    /// No driver could take the order.
    #[error("no driver available for order {order}")]
    NoCapacity {
        /// Order that could not be placed with a driver.
        order: OrderId,
    },
    /// No path connects the two locations.
    #[error("no path from location {start} to location {end}")]
    Unreachable {
        /// Path origin.
        start: LocationId,
        /// Path destination.
        end: LocationId,
    },
    /// A value supplied by the caller was malformed.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// The persistence collaborator failed.
    #[error("store failure: {0}")]
    StoreFailure(#[from] StoreError),
}

impl DispatchError {
    /// Error for a location id the graph does not know.
    #[must_use]
    pub const fn unknown_location(id: LocationId) -> Self {
        Self::NotFound {
            kind: RecordKind::Location,
            id: id.get(),
        }
    }

    /// Error for an order id the store does not know.
    #[must_use]
    pub const fn unknown_order(id: OrderId) -> Self {
        Self::NotFound {
            kind: RecordKind::Order,
            id: id.get(),
        }
    }

    /// Error for a driver id the store does not know.
    #[must_use]
    pub const fn unknown_driver(id: DriverId) -> Self {
        Self::NotFound {
            kind: RecordKind::Driver,
            id: id.get(),
        }
    }

    /// Whether the error is an expected, non-exceptional outcome.
    #[must_use]
    pub const fn is_expected(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::NoCapacity { .. } | Self::Unreachable { .. }
        )
    }
}
