//! Unit tests for the SQLite store.

use super::*;
use dispatch_core::test_support::{free_edge, location};
use rstest::{fixture, rstest};

fn id(raw: u64) -> LocationId {
    LocationId::new(raw)
}

#[fixture]
fn store() -> SqliteStore {
    let store = SqliteStore::open_in_memory().expect("open in-memory store");
    store.insert_location(location(1, 0.0, 0.0)).expect("kitchen");
    store.insert_location(location(2, 3.0, 4.0)).expect("house");
    store
}

#[rstest]
fn initialising_twice_keeps_the_version() {
    let mut connection = Connection::open_in_memory().expect("open database");
    initialise_schema(&mut connection).expect("first initialisation");
    initialise_schema(&mut connection).expect("second initialisation");
    let versions: i64 = connection
        .query_row("SELECT COUNT(*) FROM dispatch_schema_version", [], |row| {
            row.get(0)
        })
        .expect("count versions");
    assert_eq!(versions, 1);
}

#[rstest]
fn foreign_schema_versions_are_rejected() {
    let mut connection = Connection::open_in_memory().expect("open database");
    initialise_schema(&mut connection).expect("initialise");
    connection
        .execute("UPDATE dispatch_schema_version SET version = 7", [])
        .expect("bump version");
    let err = SqliteStore::from_connection(connection).expect_err("version mismatch");
    assert!(matches!(
        err,
        SqliteStoreError::SchemaVersionMismatch {
            found: 7,
            expected: SCHEMA_VERSION
        }
    ));
}

#[rstest]
fn locations_round_trip_in_id_order(store: SqliteStore) {
    store.insert_location(location(0, 9.0, 9.0)).expect("insert");
    let ids: Vec<_> = store
        .locations()
        .expect("locations")
        .into_iter()
        .map(|l| l.id.get())
        .collect();
    assert_eq!(ids, vec![0, 1, 2]);
    let house = store.location(id(2)).expect("query").expect("present");
    assert_eq!(house, location(2, 3.0, 4.0));
    assert!(store.location(id(9)).expect("query").is_none());
}

#[rstest]
fn duplicate_locations_are_rejected(store: SqliteStore) {
    let err = store
        .insert_location(location(1, 5.0, 5.0))
        .expect_err("duplicate id");
    assert!(matches!(err, StoreError::DuplicateRecord { id: 1, .. }));
}

#[rstest]
fn edges_are_upserted_per_direction(store: SqliteStore) {
    store.upsert_edge(free_edge(1, 2, 5.0)).expect("insert");
    store
        .upsert_edge(Edge::new(id(1), id(2), 6.0, 2.0).expect("valid edge"))
        .expect("replace");
    store.upsert_edge(free_edge(2, 1, 5.0)).expect("reverse");
    let edges = store.edges().expect("edges");
    assert_eq!(edges.len(), 2);
    assert_eq!(edges[0].distance, 6.0);
    assert_eq!(edges[0].traffic_factor, 2.0);
    assert_eq!(edges[1].source, id(2));
}

#[rstest]
fn edges_need_known_endpoints(store: SqliteStore) {
    let err = store
        .upsert_edge(free_edge(1, 7, 1.0))
        .expect_err("unknown endpoint");
    assert!(matches!(err, StoreError::MissingRecord { id: 7, .. }));
}

#[rstest]
fn new_orders_are_preparing(store: SqliteStore) {
    let first = store.create_order(id(1), id(2)).expect("order");
    let second = store.create_order(id(2), id(1)).expect("order");
    assert!(second > first);
    let order = store.order(first).expect("query").expect("present");
    assert_eq!(order.status, OrderStatus::Preparing);
    assert_eq!(order.assigned_driver, None);
    assert_eq!(store.orders().expect("orders").len(), 2);
}

#[rstest]
fn rosters_keep_append_order(store: SqliteStore) {
    let driver = store.create_driver(id(1), 2.0).expect("driver");
    let orders: Vec<_> = (0..3)
        .map(|_| store.create_order(id(1), id(2)).expect("order"))
        .collect();
    for order in orders.iter().rev() {
        store.append_order(driver, *order).expect("append");
    }
    store.append_order(driver, orders[0]).expect("idempotent append");
    let record = store.driver(driver).expect("query").expect("present");
    let expected: Vec<_> = orders.iter().rev().copied().collect();
    assert_eq!(record.orders, expected);
    assert_eq!(record.speed, 2.0);
}

#[rstest]
fn failed_commits_roll_back(store: SqliteStore) {
    let order = store.create_order(id(1), id(2)).expect("order");
    let driver = store.create_driver(id(1), 1.0).expect("driver");
    let err = store
        .commit(&[
            FleetChange::AppendOrder { driver, order },
            FleetChange::SetOrderStatus {
                order: OrderId::new(99),
                status: OrderStatus::Assigned,
            },
        ])
        .expect_err("unknown order");
    assert!(matches!(err, StoreError::MissingRecord { id: 99, .. }));
    let record = store.driver(driver).expect("query").expect("present");
    assert!(record.orders.is_empty());
}

#[rstest]
fn assignment_commits_apply_together(store: SqliteStore) {
    let order = store.create_order(id(1), id(2)).expect("order");
    let driver = store.create_driver(id(1), 1.0).expect("driver");
    store
        .commit(&[
            FleetChange::AppendOrder { driver, order },
            FleetChange::SetOrderStatus {
                order,
                status: OrderStatus::Assigned,
            },
            FleetChange::SetAssignedDriver {
                order,
                driver: Some(driver),
            },
        ])
        .expect("commit");
    let stored = store.order(order).expect("query").expect("present");
    assert!(stored.is_consistent());
    assert_eq!(stored.assigned_driver, Some(driver));
}

#[rstest]
fn vacancy_checks_count_the_roster_inside_the_batch(store: SqliteStore) {
    let driver = store.create_driver(id(1), 1.0).expect("driver");
    let held = store.create_order(id(1), id(2)).expect("held order");
    let next = store.create_order(id(1), id(2)).expect("next order");
    store.append_order(driver, held).expect("append");

    let err = store
        .commit(&[
            FleetChange::RequireVacancy {
                driver,
                capacity: 1,
            },
            FleetChange::AppendOrder {
                driver,
                order: next,
            },
        ])
        .expect_err("roster is full");
    assert!(matches!(err, StoreError::RosterFull { capacity: 1, .. }));
    let record = store.driver(driver).expect("query").expect("present");
    assert_eq!(record.orders, vec![held]);

    // Detaching first frees the slot for a swap.
    store
        .commit(&[
            FleetChange::RemoveOrder {
                driver,
                order: held,
            },
            FleetChange::RequireVacancy {
                driver,
                capacity: 1,
            },
            FleetChange::AppendOrder {
                driver,
                order: next,
            },
        ])
        .expect("swap");
    let record = store.driver(driver).expect("query").expect("present");
    assert_eq!(record.orders, vec![next]);
}

#[rstest]
fn vacancy_checks_need_a_known_driver(store: SqliteStore) {
    let err = store
        .commit(&[FleetChange::RequireVacancy {
            driver: DriverId::new(4),
            capacity: 3,
        }])
        .expect_err("unknown driver");
    assert!(matches!(
        err,
        StoreError::MissingRecord {
            kind: RecordKind::Driver,
            id: 4
        }
    ));
}

#[rstest]
fn assigning_unknown_drivers_fails(store: SqliteStore) {
    let order = store.create_order(id(1), id(2)).expect("order");
    let err = store
        .set_assigned_driver(order, Some(DriverId::new(5)))
        .expect_err("unknown driver");
    assert!(matches!(
        err,
        StoreError::MissingRecord {
            kind: RecordKind::Driver,
            id: 5
        }
    ));
}

#[rstest]
fn deleting_orders_clears_rosters(store: SqliteStore) {
    let order = store.create_order(id(1), id(2)).expect("order");
    let driver = store.create_driver(id(1), 1.0).expect("driver");
    store.append_order(driver, order).expect("append");
    assert!(store.delete_order(order).expect("delete"));
    assert!(!store.delete_order(order).expect("second delete"));
    let record = store.driver(driver).expect("query").expect("present");
    assert!(record.orders.is_empty());
}

#[rstest]
fn remove_order_reports_membership(store: SqliteStore) {
    let order = store.create_order(id(1), id(2)).expect("order");
    let driver = store.create_driver(id(1), 1.0).expect("driver");
    store.append_order(driver, order).expect("append");
    assert!(store.remove_order(driver, order).expect("remove"));
    assert!(!store.remove_order(driver, order).expect("remove again"));
}

#[rstest]
fn drivers_move_between_known_locations(store: SqliteStore) {
    let driver = store.create_driver(id(1), 1.0).expect("driver");
    store.set_location(driver, id(2)).expect("move");
    assert_eq!(
        store.driver(driver).expect("query").expect("present").location,
        id(2)
    );
    let err = store.set_location(driver, id(8)).expect_err("unknown location");
    assert!(matches!(err, StoreError::MissingRecord { id: 8, .. }));
}

#[rstest]
fn oversized_ids_are_backend_errors(store: SqliteStore) {
    let err = store
        .order(OrderId::new(u64::MAX))
        .expect_err("id out of range");
    assert!(matches!(err, StoreError::Backend(_)));
}
