//! Locations and directed edges of the delivery graph.

use geo::Coord;

use crate::{DispatchError, LocationId};

/// Traffic factor applied when an edge does not specify one.
pub const DEFAULT_TRAFFIC_FACTOR: f64 = 1.0;

/// A named point in the plane.
///
/// Coordinates are planar (`x`, `y`); distances between locations are
/// Euclidean.
///
/// # Examples
/// ```
/// use dispatch_core::{Location, LocationId};
///
/// let kitchen = Location::new(LocationId::new(1), "Kitchen", 0.0, 0.0)?;
/// assert_eq!(kitchen.name, "Kitchen");
/// assert_eq!(kitchen.position.x, 0.0);
/// # Ok::<(), dispatch_core::DispatchError>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    /// Unique identifier.
    pub id: LocationId,
    /// Human-readable label.
    pub name: String,
    /// Planar position.
    pub position: Coord<f64>,
}

impl Location {
    /// Validate and construct a [`Location`].
    ///
    /// # Errors
    /// Returns [`DispatchError::InvalidInput`] when a coordinate is not finite.
    pub fn new(
        id: LocationId,
        name: impl Into<String>,
        x: f64,
        y: f64,
    ) -> Result<Self, DispatchError> {
        if !x.is_finite() || !y.is_finite() {
            return Err(DispatchError::InvalidInput(format!(
                "location {id} coordinates must be finite"
            )));
        }
        Ok(Self {
            id,
            name: name.into(),
            position: Coord { x, y },
        })
    }
}

/// A directed, traffic-weighted connection between two locations.
///
/// # Examples
/// ```
/// use dispatch_core::{Edge, LocationId};
///
/// let edge = Edge::new(LocationId::new(1), LocationId::new(2), 10.0, 3.0)?;
/// assert_eq!(edge.weight(), 30.0);
/// # Ok::<(), dispatch_core::DispatchError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    /// Origin of the edge.
    pub source: LocationId,
    /// Target of the edge.
    pub destination: LocationId,
    /// Physical length, never negative.
    pub distance: f64,
    /// Congestion multiplier, strictly positive.
    pub traffic_factor: f64,
}

impl Edge {
    /// Validate and construct an [`Edge`].
    ///
    /// # Errors
    /// Returns [`DispatchError::InvalidInput`] when `distance` is negative or
    /// not finite, or when `traffic_factor` is not strictly positive.
    pub fn new(
        source: LocationId,
        destination: LocationId,
        distance: f64,
        traffic_factor: f64,
    ) -> Result<Self, DispatchError> {
        if !distance.is_finite() || distance < 0.0 {
            return Err(DispatchError::InvalidInput(format!(
                "edge {source}->{destination} distance must be a non-negative number"
            )));
        }
        if !traffic_factor.is_finite() || traffic_factor <= 0.0 {
            return Err(DispatchError::InvalidInput(format!(
                "edge {source}->{destination} traffic factor must be positive"
            )));
        }
        Ok(Self {
            source,
            destination,
            distance,
            traffic_factor,
        })
    }

    /// Construct an edge with the [`DEFAULT_TRAFFIC_FACTOR`].
    ///
    /// # Errors
    /// Returns [`DispatchError::InvalidInput`] for a negative distance.
    pub fn free_flowing(
        source: LocationId,
        destination: LocationId,
        distance: f64,
    ) -> Result<Self, DispatchError> {
        Self::new(source, destination, distance, DEFAULT_TRAFFIC_FACTOR)
    }

    /// Cost of traversing the edge: `distance × traffic_factor`.
    #[must_use]
    pub fn weight(&self) -> f64 {
        self.distance * self.traffic_factor
    }
}
