//! Immutable snapshot of the delivery graph.
//!
//! A [`GeoModel`] answers Euclidean distance and adjacency queries. It is
//! rebuilt from a [`LocationStore`] whenever locations or edges change and is
//! shared between readers behind an `Arc`.

use std::collections::{BTreeMap, HashMap};

use geo::Coord;

use crate::store::{LocationStore, StoreError};
use crate::{DispatchError, Edge, Location, LocationId};

/// Locations and outgoing edges, indexed for lookup.
#[derive(Debug, Clone, Default)]
pub struct GeoModel {
    locations: BTreeMap<LocationId, Location>,
    edges: HashMap<LocationId, Vec<Edge>>,
}

impl GeoModel {
    /// Build a model from locations and edges.
    ///
    /// Edges that reference an unknown endpoint are dropped.
    ///
    /// # Examples
    /// ```
    /// use dispatch_core::{Edge, GeoModel, Location, LocationId};
    ///
    /// let a = Location::new(LocationId::new(1), "A", 0.0, 0.0)?;
    /// let b = Location::new(LocationId::new(2), "B", 3.0, 4.0)?;
    /// let edge = Edge::new(a.id, b.id, 10.0, 1.0)?;
    /// let geo = GeoModel::new([a, b], [edge]);
    ///
    /// assert_eq!(geo.distance(LocationId::new(1), LocationId::new(2))?, 5.0);
    /// assert_eq!(geo.edges_from(LocationId::new(1)).len(), 1);
    /// assert!(geo.edges_from(LocationId::new(2)).is_empty());
    /// # Ok::<(), dispatch_core::DispatchError>(())
    /// ```
    pub fn new<L, E>(locations: L, edges: E) -> Self
    where
        L: IntoIterator<Item = Location>,
        E: IntoIterator<Item = Edge>,
    {
        let locations: BTreeMap<_, _> = locations
            .into_iter()
            .map(|location| (location.id, location))
            .collect();
        let mut adjacency: HashMap<LocationId, Vec<Edge>> = HashMap::new();
        for edge in edges {
            if !locations.contains_key(&edge.source) || !locations.contains_key(&edge.destination)
            {
                log::warn!(
                    "ignoring edge {}->{} with an unknown endpoint",
                    edge.source,
                    edge.destination
                );
                continue;
            }
            adjacency.entry(edge.source).or_default().push(edge);
        }
        Self {
            locations,
            edges: adjacency,
        }
    }

    /// Snapshot the graph held by `store`.
    ///
    /// # Errors
    /// Propagates any [`StoreError`] raised while reading the store.
    pub fn from_store<S>(store: &S) -> Result<Self, StoreError>
    where
        S: LocationStore + ?Sized,
    {
        Ok(Self::new(store.locations()?, store.edges()?))
    }

    /// Look up a location by id.
    #[must_use]
    pub fn location(&self, id: LocationId) -> Option<&Location> {
        self.locations.get(&id)
    }

    /// Whether `id` names a known location.
    #[must_use]
    pub fn contains(&self, id: LocationId) -> bool {
        self.locations.contains_key(&id)
    }

    /// Iterate over all locations in ascending id order.
    pub fn locations(&self) -> impl Iterator<Item = &Location> + '_ {
        self.locations.values()
    }

    /// Number of known locations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    /// Whether the model holds no locations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Euclidean distance between two known locations.
    ///
    /// # Errors
    /// Returns [`DispatchError::NotFound`] when either id is unknown.
    pub fn distance(&self, from: LocationId, to: LocationId) -> Result<f64, DispatchError> {
        let a = self.require(from)?;
        let b = self.require(to)?;
        Ok(euclidean(a, b))
    }

    /// Outgoing edges of `id`; empty when there are none.
    #[must_use]
    pub fn edges_from(&self, id: LocationId) -> &[Edge] {
        self.edges.get(&id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Sum of Euclidean distances between consecutive stops.
    ///
    /// Sequences shorter than two stops have length zero.
    ///
    /// # Errors
    /// Returns [`DispatchError::NotFound`] when a stop is unknown.
    pub fn route_length(&self, stops: &[LocationId]) -> Result<f64, DispatchError> {
        if let [only] = stops {
            self.require(*only)?;
        }
        stops.windows(2).try_fold(0.0, |total, pair| match pair {
            [from, to] => Ok(total + self.distance(*from, *to)?),
            _ => Ok(total),
        })
    }

    fn require(&self, id: LocationId) -> Result<&Location, DispatchError> {
        self.location(id).ok_or(DispatchError::unknown_location(id))
    }
}

pub(crate) fn euclidean(a: &Location, b: &Location) -> f64 {
    planar_distance(a.position, b.position)
}

/// Straight-line distance between two points.
pub(crate) fn planar_distance(a: Coord<f64>, b: Coord<f64>) -> f64 {
    let delta = a - b;
    delta.x.hypot(delta.y)
}
