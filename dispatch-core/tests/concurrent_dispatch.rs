//! Concurrent placements must not overfill rosters or split assignments.

mod support;

use std::thread;

use dispatch_core::{
    DRIVER_CAPACITY, DispatchService, DriverStore, LocationId, MemoryStore, OrderStatus,
    OrderStore,
};
use rstest::{fixture, rstest};

use support::store_with;

#[fixture]
fn service() -> DispatchService<MemoryStore> {
    let points: Vec<(u64, f64, f64)> = (1..=6).map(|id| (id, id as f64, 0.0)).collect();
    let service = DispatchService::new(store_with(&points))
        .unwrap_or_else(|err| panic!("service should start: {err}"));
    for speed in [1.0, 2.0, 3.0] {
        service
            .add_driver(speed, Some(LocationId::new(1)))
            .unwrap_or_else(|err| panic!("driver should register: {err}"));
    }
    service
}

#[rstest]
fn parallel_placements_respect_capacity(service: DispatchService<MemoryStore>) {
    thread::scope(|scope| {
        for worker in 0..4_u64 {
            let service = &service;
            scope.spawn(move || {
                for step in 0..5_u64 {
                    let restaurant = LocationId::new((worker + step) % 6 + 1);
                    let customer = LocationId::new((worker + step + 1) % 6 + 1);
                    service
                        .place_order(restaurant, customer)
                        .unwrap_or_else(|err| panic!("placement should succeed: {err}"));
                }
            });
        }
    });

    let drivers = service.store().drivers().unwrap_or_else(|err| panic!("{err}"));
    let orders = service.store().orders().unwrap_or_else(|err| panic!("{err}"));
    assert_eq!(orders.len(), 20);
    let carried: usize = drivers.iter().map(|d| d.orders.len()).sum();
    let assigned = orders
        .values()
        .filter(|o| o.status == OrderStatus::Assigned)
        .count();
    assert_eq!(carried, assigned);
    for driver in &drivers {
        assert!(driver.orders.len() <= DRIVER_CAPACITY);
    }
    assert!(orders.values().all(|o| o.is_consistent()));
}
