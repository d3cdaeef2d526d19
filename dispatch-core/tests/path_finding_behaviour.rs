//! Behavioural coverage for shortest-path queries.

mod support;

use std::cell::RefCell;

use dispatch_core::{DispatchError, Edge, GeoModel, Location, LocationId, PathFinder, ShortestPath};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

use support::{edge, location, parse_ids};

/// Graph and query outcome for one scenario.
#[derive(Debug, Default)]
struct PathWorld {
    locations: RefCell<Vec<Location>>,
    edges: RefCell<Vec<Edge>>,
    result: RefCell<Option<Result<ShortestPath, DispatchError>>>,
}

impl PathWorld {
    fn path(&self) -> ShortestPath {
        match self.result.borrow().as_ref() {
            Some(Ok(path)) => path.clone(),
            Some(Err(err)) => panic!("path query failed: {err}"),
            None => panic!("no path query was made"),
        }
    }
}

#[fixture]
fn world() -> PathWorld {
    PathWorld::default()
}

#[given("location {id} at {x} {y}")]
fn given_location(world: &PathWorld, id: u64, x: f64, y: f64) {
    world.locations.borrow_mut().push(location(id, x, y));
}

#[given("an edge from {source} to {destination} of length {distance} with traffic {traffic}")]
fn given_edge(world: &PathWorld, source: u64, destination: u64, distance: f64, traffic: f64) {
    world
        .edges
        .borrow_mut()
        .push(edge(source, destination, distance, traffic));
}

#[when("I ask for the path from {start} to {end}")]
fn when_path(world: &PathWorld, start: u64, end: u64) {
    let geo = GeoModel::new(
        world.locations.borrow().iter().cloned(),
        world.edges.borrow().iter().copied(),
    );
    let result = PathFinder::new(&geo).shortest_path(LocationId::new(start), LocationId::new(end));
    world.result.replace(Some(result));
}

#[then("the path is {stops}")]
fn then_path(world: &PathWorld, stops: String) {
    assert_eq!(world.path().stops, parse_ids(&stops));
}

#[then("the path cost is {cost}")]
fn then_cost(world: &PathWorld, cost: f64) {
    let actual = world.path().cost;
    assert!((actual - cost).abs() < 1e-9, "cost {actual} != {cost}");
}

#[then("the path distance is {distance}")]
fn then_distance(world: &PathWorld, distance: f64) {
    let actual = world.path().distance;
    assert!(
        (actual - distance).abs() < 1e-9,
        "distance {actual} != {distance}"
    );
}

#[then("the missing location is {id}")]
fn then_missing(world: &PathWorld, id: u64) {
    match world.result.borrow().as_ref() {
        Some(Err(DispatchError::NotFound { id: missing, .. })) => assert_eq!(*missing, id),
        other => panic!("expected a missing location, got {other:?}"),
    }
}

#[scenario(path = "tests/features/path_finding.feature", index = 0)]
fn congested_edge_loses(world: PathWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/path_finding.feature", index = 1)]
fn cheap_edges_win(world: PathWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/path_finding.feature", index = 2)]
fn location_reaches_itself(world: PathWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/path_finding.feature", index = 3)]
fn unknown_endpoints(world: PathWorld) {
    let _ = world;
}
