//! SQLite persistence for the dispatch engine.
//!
//! [`SqliteStore`] implements the `dispatch-core` store traits over a single
//! `rusqlite` connection guarded by a mutex. Each fleet commit runs inside one
//! immediate transaction, so a failed batch leaves the database untouched and
//! handles sharing one file serialise their writes.
#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use dispatch_core::{
    Driver, DriverId, DriverStore, Edge, FleetChange, FleetStore, Location, LocationId,
    LocationStore, Order, OrderBook, OrderId, OrderStatus, OrderStore, RecordKind, StoreError,
};
use parking_lot::Mutex;
use rusqlite::{
    Connection, OptionalExtension, Params, Transaction, TransactionBehavior, params,
};

mod error;
mod schema;

pub use error::SqliteStoreError;
pub use schema::{SCHEMA_VERSION, initialise_schema};

/// Database file used when no path is configured.
pub const DEFAULT_DATABASE: &str = "delivery.db";

/// How long a connection waits for another handle's write lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const LOCATION_EXISTS: &str = "SELECT 1 FROM locations WHERE id = ?1";
const ORDER_EXISTS: &str = "SELECT 1 FROM orders WHERE id = ?1";
const DRIVER_EXISTS: &str = "SELECT 1 FROM drivers WHERE id = ?1";

const SELECT_LOCATIONS: &str = "SELECT id, name, x, y FROM locations";
const SELECT_ORDERS: &str =
    "SELECT id, restaurant_id, customer_location_id, status, assigned_driver_id FROM orders";
const SELECT_DRIVERS: &str = "SELECT id, current_location, speed FROM drivers";

/// Dispatch store backed by an SQLite database.
///
/// # Examples
/// ```
/// use dispatch_core::{Location, LocationId, LocationStore, OrderStore};
/// use dispatch_store::SqliteStore;
///
/// let store = SqliteStore::open_in_memory()?;
/// store.insert_location(Location::new(LocationId::new(1), "Kitchen", 0.0, 0.0)?)?;
/// let order = store.create_order(LocationId::new(1), LocationId::new(1))?;
/// assert_eq!(store.order(order)?.map(|o| o.restaurant), Some(LocationId::new(1)));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct SqliteStore {
    connection: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `path`.
    ///
    /// Missing parent directories are created and the schema is initialised.
    ///
    /// # Errors
    /// Returns [`SqliteStoreError`] when the directory, connection or schema
    /// cannot be prepared.
    pub fn open(path: &Utf8Path) -> Result<Self, SqliteStoreError> {
        dispatch_fs::ensure_parent_dir(path).map_err(|source| {
            SqliteStoreError::CreateDirectory {
                path: path.parent().unwrap_or(path).to_path_buf(),
                source,
            }
        })?;
        let connection =
            Connection::open(path.as_std_path()).map_err(|source| SqliteStoreError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        connection
            .busy_timeout(BUSY_TIMEOUT)
            .map_err(|source| SqliteStoreError::Pragma {
                pragma: "busy_timeout",
                source,
            })?;
        let journal: String = connection
            .pragma_update_and_check(None, "journal_mode", "wal", |row| row.get(0))
            .map_err(|source| SqliteStoreError::Pragma {
                pragma: "journal_mode",
                source,
            })?;
        log::debug!("opened dispatch database at {path} (journal mode {journal})");
        Self::from_connection(connection)
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    /// Returns [`SqliteStoreError`] when the schema cannot be created.
    pub fn open_in_memory() -> Result<Self, SqliteStoreError> {
        let connection = Connection::open_in_memory().map_err(|source| SqliteStoreError::Open {
            path: Utf8PathBuf::from(":memory:"),
            source,
        })?;
        Self::from_connection(connection)
    }

    /// Wrap an existing connection, initialising the schema.
    ///
    /// # Errors
    /// Returns [`SqliteStoreError`] when the schema cannot be created or has
    /// an unsupported version.
    pub fn from_connection(mut connection: Connection) -> Result<Self, SqliteStoreError> {
        initialise_schema(&mut connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    fn read<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let connection = self.connection.lock();
        f(&connection)
    }

    fn write<T>(
        &self,
        f: impl FnOnce(&Transaction<'_>) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut connection = self.connection.lock();
        let transaction = connection
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(SqliteStoreError::query("begin transaction"))?;
        let value = f(&transaction)?;
        transaction
            .commit()
            .map_err(SqliteStoreError::query("commit transaction"))?;
        Ok(value)
    }
}

fn sql_id(kind: RecordKind, id: u64) -> Result<i64, SqliteStoreError> {
    i64::try_from(id).map_err(|_| SqliteStoreError::IdOutOfRange { kind, id })
}

fn location_key(id: LocationId) -> Result<i64, SqliteStoreError> {
    sql_id(RecordKind::Location, id.get())
}

fn order_key(id: OrderId) -> Result<i64, SqliteStoreError> {
    sql_id(RecordKind::Order, id.get())
}

fn driver_key(id: DriverId) -> Result<i64, SqliteStoreError> {
    sql_id(RecordKind::Driver, id.get())
}

fn stored_id(table: &'static str, raw: i64) -> Result<u64, SqliteStoreError> {
    u64::try_from(raw).map_err(|_| SqliteStoreError::CorruptRow {
        table,
        detail: format!("negative id {raw}"),
    })
}

fn exists(connection: &Connection, sql: &'static str, key: i64) -> Result<bool, SqliteStoreError> {
    connection
        .query_row(sql, [key], |_| Ok(()))
        .optional()
        .map(|found| found.is_some())
        .map_err(SqliteStoreError::query("check record existence"))
}

fn query_locations<P: Params>(
    connection: &Connection,
    sql: &str,
    params: P,
) -> Result<Vec<Location>, SqliteStoreError> {
    let mut statement = connection
        .prepare(sql)
        .map_err(SqliteStoreError::query("prepare location query"))?;
    let rows = statement
        .query_map(params, |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, f64>(3)?,
            ))
        })
        .map_err(SqliteStoreError::query("read locations"))?;
    rows.map(|row| -> Result<Location, SqliteStoreError> {
        let (id, name, x, y) = row.map_err(SqliteStoreError::query("read location row"))?;
        let id = LocationId::new(stored_id("locations", id)?);
        Location::new(id, name, x, y).map_err(|err| SqliteStoreError::CorruptRow {
            table: "locations",
            detail: err.to_string(),
        })
    })
    .collect()
}

fn query_orders<P: Params>(
    connection: &Connection,
    sql: &str,
    params: P,
) -> Result<Vec<Order>, SqliteStoreError> {
    let mut statement = connection
        .prepare(sql)
        .map_err(SqliteStoreError::query("prepare order query"))?;
    let rows = statement
        .query_map(params, |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Option<i64>>(4)?,
            ))
        })
        .map_err(SqliteStoreError::query("read orders"))?;
    rows.map(|row| -> Result<Order, SqliteStoreError> {
        let (id, restaurant, customer, status, driver) =
            row.map_err(SqliteStoreError::query("read order row"))?;
        let status = status
            .parse::<OrderStatus>()
            .map_err(|detail| SqliteStoreError::CorruptRow {
                table: "orders",
                detail,
            })?;
        let assigned_driver = driver
            .map(|raw| stored_id("orders", raw).map(DriverId::new))
            .transpose()?;
        Ok(Order {
            id: OrderId::new(stored_id("orders", id)?),
            restaurant: LocationId::new(stored_id("orders", restaurant)?),
            customer: LocationId::new(stored_id("orders", customer)?),
            status,
            assigned_driver,
        })
    })
    .collect()
}

fn query_drivers<P: Params>(
    connection: &Connection,
    sql: &str,
    params: P,
) -> Result<Vec<Driver>, SqliteStoreError> {
    let mut statement = connection
        .prepare(sql)
        .map_err(SqliteStoreError::query("prepare driver query"))?;
    let rows = statement
        .query_map(params, |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, f64>(2)?,
            ))
        })
        .map_err(SqliteStoreError::query("read drivers"))?;
    let mut drivers = rows
        .map(|row| -> Result<Driver, SqliteStoreError> {
            let (id, location, speed) = row.map_err(SqliteStoreError::query("read driver row"))?;
            let id = DriverId::new(stored_id("drivers", id)?);
            let location = LocationId::new(stored_id("drivers", location)?);
            Driver::new(id, location, speed).map_err(|err| SqliteStoreError::CorruptRow {
                table: "drivers",
                detail: err.to_string(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    attach_rosters(connection, &mut drivers)?;
    Ok(drivers)
}

/// Fill each driver's roster from `driver_orders`, preserving append order.
fn attach_rosters(connection: &Connection, drivers: &mut [Driver]) -> Result<(), SqliteStoreError> {
    if drivers.is_empty() {
        return Ok(());
    }
    let mut statement = connection
        .prepare("SELECT driver_id, order_id FROM driver_orders ORDER BY driver_id, position")
        .map_err(SqliteStoreError::query("prepare roster query"))?;
    let rows = statement
        .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)))
        .map_err(SqliteStoreError::query("read rosters"))?;
    let mut rosters: BTreeMap<DriverId, Vec<OrderId>> = BTreeMap::new();
    for row in rows {
        let (driver, order) = row.map_err(SqliteStoreError::query("read roster row"))?;
        rosters
            .entry(DriverId::new(stored_id("driver_orders", driver)?))
            .or_default()
            .push(OrderId::new(stored_id("driver_orders", order)?));
    }
    for driver in drivers {
        if let Some(roster) = rosters.remove(&driver.id) {
            driver.orders = roster;
        }
    }
    Ok(())
}

fn require(
    connection: &Connection,
    sql: &'static str,
    key: i64,
    missing: StoreError,
) -> Result<(), StoreError> {
    if exists(connection, sql, key)? {
        Ok(())
    } else {
        Err(missing)
    }
}

fn apply(connection: &Connection, change: FleetChange) -> Result<(), StoreError> {
    match change {
        FleetChange::SetOrderStatus { order, status } => {
            let changed = connection
                .execute(
                    "UPDATE orders SET status = ?1 WHERE id = ?2",
                    params![status.as_str(), order_key(order)?],
                )
                .map_err(SqliteStoreError::query("update order status"))?;
            if changed == 0 {
                return Err(StoreError::missing_order(order));
            }
        }
        FleetChange::SetAssignedDriver { order, driver } => {
            let driver_column = match driver {
                Some(id) => {
                    let key = driver_key(id)?;
                    require(connection, DRIVER_EXISTS, key, StoreError::missing_driver(id))?;
                    Some(key)
                }
                None => None,
            };
            let changed = connection
                .execute(
                    "UPDATE orders SET assigned_driver_id = ?1 WHERE id = ?2",
                    params![driver_column, order_key(order)?],
                )
                .map_err(SqliteStoreError::query("update assigned driver"))?;
            if changed == 0 {
                return Err(StoreError::missing_order(order));
            }
        }
        FleetChange::RequireVacancy { driver, capacity } => {
            let key = driver_key(driver)?;
            require(connection, DRIVER_EXISTS, key, StoreError::missing_driver(driver))?;
            let held: i64 = connection
                .query_row(
                    "SELECT COUNT(*) FROM driver_orders WHERE driver_id = ?1",
                    [key],
                    |row| row.get(0),
                )
                .map_err(SqliteStoreError::query("count roster entries"))?;
            if held >= i64::try_from(capacity).unwrap_or(i64::MAX) {
                return Err(StoreError::RosterFull { driver, capacity });
            }
        }
        FleetChange::AppendOrder { driver, order } => {
            let order_column = order_key(order)?;
            let driver_column = driver_key(driver)?;
            require(connection, ORDER_EXISTS, order_column, StoreError::missing_order(order))?;
            require(
                connection,
                DRIVER_EXISTS,
                driver_column,
                StoreError::missing_driver(driver),
            )?;
            connection
                .execute(
                    "INSERT OR IGNORE INTO driver_orders (driver_id, order_id, position)
                        SELECT ?1, ?2, COALESCE(MAX(position) + 1, 0)
                        FROM driver_orders WHERE driver_id = ?1",
                    params![driver_column, order_column],
                )
                .map_err(SqliteStoreError::query("append roster entry"))?;
        }
        FleetChange::RemoveOrder { driver, order } => {
            remove_roster_entry(connection, driver, order)?;
        }
        FleetChange::DeleteOrder { order } => {
            let key = order_key(order)?;
            connection
                .execute("DELETE FROM driver_orders WHERE order_id = ?1", [key])
                .map_err(SqliteStoreError::query("clear roster entries"))?;
            let changed = connection
                .execute("DELETE FROM orders WHERE id = ?1", [key])
                .map_err(SqliteStoreError::query("delete order"))?;
            if changed == 0 {
                return Err(StoreError::missing_order(order));
            }
        }
        FleetChange::SetDriverLocation { driver, location } => {
            require(
                connection,
                LOCATION_EXISTS,
                location_key(location)?,
                StoreError::missing_location(location),
            )?;
            let changed = connection
                .execute(
                    "UPDATE drivers SET current_location = ?1 WHERE id = ?2",
                    params![location_key(location)?, driver_key(driver)?],
                )
                .map_err(SqliteStoreError::query("move driver"))?;
            if changed == 0 {
                return Err(StoreError::missing_driver(driver));
            }
        }
    }
    Ok(())
}

fn remove_roster_entry(
    connection: &Connection,
    driver: DriverId,
    order: OrderId,
) -> Result<bool, StoreError> {
    let driver_column = driver_key(driver)?;
    require(
        connection,
        DRIVER_EXISTS,
        driver_column,
        StoreError::missing_driver(driver),
    )?;
    let removed = connection
        .execute(
            "DELETE FROM driver_orders WHERE driver_id = ?1 AND order_id = ?2",
            params![driver_column, order_key(order)?],
        )
        .map_err(SqliteStoreError::query("remove roster entry"))?;
    Ok(removed > 0)
}

impl LocationStore for SqliteStore {
    fn location(&self, id: LocationId) -> Result<Option<Location>, StoreError> {
        self.read(|connection| {
            let sql = format!("{SELECT_LOCATIONS} WHERE id = ?1");
            Ok(query_locations(connection, &sql, [location_key(id)?])?
                .into_iter()
                .next())
        })
    }

    fn locations(&self) -> Result<Vec<Location>, StoreError> {
        self.read(|connection| {
            let sql = format!("{SELECT_LOCATIONS} ORDER BY id");
            Ok(query_locations(connection, &sql, [])?)
        })
    }

    fn edges(&self) -> Result<Vec<Edge>, StoreError> {
        self.read(|connection| {
            let mut statement = connection
                .prepare(
                    "SELECT source, destination, distance, traffic_factor FROM edges
                        ORDER BY source, destination",
                )
                .map_err(SqliteStoreError::query("prepare edge query"))?;
            let rows = statement
                .query_map([], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, f64>(2)?,
                        row.get::<_, f64>(3)?,
                    ))
                })
                .map_err(SqliteStoreError::query("read edges"))?;
            let mut edges = Vec::new();
            for row in rows {
                let (source, destination, distance, traffic) =
                    row.map_err(SqliteStoreError::query("read edge row"))?;
                let edge = Edge::new(
                    LocationId::new(stored_id("edges", source)?),
                    LocationId::new(stored_id("edges", destination)?),
                    distance,
                    traffic,
                )
                .map_err(|err| SqliteStoreError::CorruptRow {
                    table: "edges",
                    detail: err.to_string(),
                })?;
                edges.push(edge);
            }
            Ok(edges)
        })
    }

    fn insert_location(&self, location: Location) -> Result<(), StoreError> {
        self.write(|transaction| {
            let key = location_key(location.id)?;
            if exists(transaction, LOCATION_EXISTS, key)? {
                return Err(StoreError::DuplicateRecord {
                    kind: RecordKind::Location,
                    id: location.id.get(),
                });
            }
            transaction
                .execute(
                    "INSERT INTO locations (id, name, x, y) VALUES (?1, ?2, ?3, ?4)",
                    params![key, location.name, location.position.x, location.position.y],
                )
                .map_err(SqliteStoreError::query("insert location"))?;
            Ok(())
        })
    }

    fn upsert_edge(&self, edge: Edge) -> Result<(), StoreError> {
        self.write(|transaction| {
            let source = location_key(edge.source)?;
            let destination = location_key(edge.destination)?;
            require(
                transaction,
                LOCATION_EXISTS,
                source,
                StoreError::missing_location(edge.source),
            )?;
            require(
                transaction,
                LOCATION_EXISTS,
                destination,
                StoreError::missing_location(edge.destination),
            )?;
            transaction
                .execute(
                    "INSERT INTO edges (source, destination, distance, traffic_factor)
                        VALUES (?1, ?2, ?3, ?4)
                        ON CONFLICT (source, destination) DO UPDATE SET
                            distance = excluded.distance,
                            traffic_factor = excluded.traffic_factor",
                    params![source, destination, edge.distance, edge.traffic_factor],
                )
                .map_err(SqliteStoreError::query("upsert edge"))?;
            Ok(())
        })
    }
}

impl OrderStore for SqliteStore {
    fn order(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        self.read(|connection| {
            let sql = format!("{SELECT_ORDERS} WHERE id = ?1");
            Ok(query_orders(connection, &sql, [order_key(id)?])?
                .into_iter()
                .next())
        })
    }

    fn orders(&self) -> Result<OrderBook, StoreError> {
        self.read(|connection| {
            let sql = format!("{SELECT_ORDERS} ORDER BY id");
            Ok(query_orders(connection, &sql, [])?
                .into_iter()
                .map(|order| (order.id, order))
                .collect())
        })
    }

    fn create_order(
        &self,
        restaurant: LocationId,
        customer: LocationId,
    ) -> Result<OrderId, StoreError> {
        self.write(|transaction| {
            for location in [restaurant, customer] {
                require(
                    transaction,
                    LOCATION_EXISTS,
                    location_key(location)?,
                    StoreError::missing_location(location),
                )?;
            }
            transaction
                .execute(
                    "INSERT INTO orders (restaurant_id, customer_location_id, status)
                        VALUES (?1, ?2, ?3)",
                    params![
                        location_key(restaurant)?,
                        location_key(customer)?,
                        OrderStatus::Preparing.as_str()
                    ],
                )
                .map_err(SqliteStoreError::query("insert order"))?;
            Ok(OrderId::new(stored_id(
                "orders",
                transaction.last_insert_rowid(),
            )?))
        })
    }

    fn set_status(&self, id: OrderId, status: OrderStatus) -> Result<(), StoreError> {
        self.commit(&[FleetChange::SetOrderStatus { order: id, status }])
    }

    fn set_assigned_driver(
        &self,
        id: OrderId,
        driver: Option<DriverId>,
    ) -> Result<(), StoreError> {
        self.commit(&[FleetChange::SetAssignedDriver { order: id, driver }])
    }

    fn delete_order(&self, id: OrderId) -> Result<bool, StoreError> {
        match self.commit(&[FleetChange::DeleteOrder { order: id }]) {
            Ok(()) => Ok(true),
            Err(StoreError::MissingRecord { .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }
}

impl DriverStore for SqliteStore {
    fn driver(&self, id: DriverId) -> Result<Option<Driver>, StoreError> {
        self.read(|connection| {
            let sql = format!("{SELECT_DRIVERS} WHERE id = ?1");
            Ok(query_drivers(connection, &sql, [driver_key(id)?])?
                .into_iter()
                .next())
        })
    }

    fn drivers(&self) -> Result<Vec<Driver>, StoreError> {
        self.read(|connection| {
            let sql = format!("{SELECT_DRIVERS} ORDER BY id");
            Ok(query_drivers(connection, &sql, [])?)
        })
    }

    fn create_driver(&self, location: LocationId, speed: f64) -> Result<DriverId, StoreError> {
        self.write(|transaction| {
            let key = location_key(location)?;
            require(
                transaction,
                LOCATION_EXISTS,
                key,
                StoreError::missing_location(location),
            )?;
            transaction
                .execute(
                    "INSERT INTO drivers (current_location, speed) VALUES (?1, ?2)",
                    params![key, speed],
                )
                .map_err(SqliteStoreError::query("insert driver"))?;
            Ok(DriverId::new(stored_id(
                "drivers",
                transaction.last_insert_rowid(),
            )?))
        })
    }

    fn append_order(&self, driver: DriverId, order: OrderId) -> Result<(), StoreError> {
        self.commit(&[FleetChange::AppendOrder { driver, order }])
    }

    fn remove_order(&self, driver: DriverId, order: OrderId) -> Result<bool, StoreError> {
        self.write(|transaction| remove_roster_entry(transaction, driver, order))
    }

    fn set_location(&self, driver: DriverId, location: LocationId) -> Result<(), StoreError> {
        self.commit(&[FleetChange::SetDriverLocation { driver, location }])
    }
}

impl FleetStore for SqliteStore {
    fn commit(&self, changes: &[FleetChange]) -> Result<(), StoreError> {
        self.write(|transaction| {
            for change in changes {
                apply(transaction, *change)?;
            }
            Ok(())
        })?;
        log::debug!("committed {} fleet changes", changes.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests;
