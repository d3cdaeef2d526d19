//! Table layout for the dispatch database.

use rusqlite::{Connection, OptionalExtension, Transaction, TransactionBehavior};

use crate::SqliteStoreError;

/// Schema version written by this build.
pub const SCHEMA_VERSION: i64 = 1;

/// Create the dispatch tables inside `connection` when they are missing.
///
/// Foreign keys are enabled first. An existing database must already carry
/// [`SCHEMA_VERSION`]; other versions are rejected.
///
/// # Errors
/// Returns [`SqliteStoreError::Migration`] when a step fails and
/// [`SqliteStoreError::SchemaVersionMismatch`] for foreign versions.
///
/// # Examples
/// ```
/// use dispatch_store::{SCHEMA_VERSION, initialise_schema};
/// use rusqlite::Connection;
///
/// let mut conn = Connection::open_in_memory()?;
/// initialise_schema(&mut conn)?;
/// let version: i64 =
///     conn.query_row("SELECT version FROM dispatch_schema_version", [], |row| row.get(0))?;
/// assert_eq!(version, SCHEMA_VERSION);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn initialise_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    connection
        .pragma_update(None, "foreign_keys", true)
        .map_err(|source| SqliteStoreError::ForeignKeys { source })?;

    let transaction = connection
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(SqliteStoreError::migration("begin schema transaction"))?;
    create_graph_tables(&transaction)?;
    create_fleet_tables(&transaction)?;
    ensure_schema_version(&transaction)?;
    transaction
        .commit()
        .map_err(SqliteStoreError::migration("commit schema transaction"))
}

fn create_graph_tables(transaction: &Transaction<'_>) -> Result<(), SqliteStoreError> {
    run_step(
        transaction,
        "create locations",
        "CREATE TABLE IF NOT EXISTS locations (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            x REAL NOT NULL,
            y REAL NOT NULL
        )",
    )?;
    run_step(
        transaction,
        "create edges",
        "CREATE TABLE IF NOT EXISTS edges (
            source INTEGER NOT NULL,
            destination INTEGER NOT NULL,
            distance REAL NOT NULL CHECK (distance >= 0),
            traffic_factor REAL NOT NULL DEFAULT 1.0 CHECK (traffic_factor > 0),
            PRIMARY KEY (source, destination),
            FOREIGN KEY (source) REFERENCES locations(id),
            FOREIGN KEY (destination) REFERENCES locations(id)
        ) WITHOUT ROWID",
    )
}

fn create_fleet_tables(transaction: &Transaction<'_>) -> Result<(), SqliteStoreError> {
    run_step(
        transaction,
        "create drivers",
        "CREATE TABLE IF NOT EXISTS drivers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            current_location INTEGER NOT NULL,
            speed REAL NOT NULL CHECK (speed > 0),
            FOREIGN KEY (current_location) REFERENCES locations(id)
        )",
    )?;
    run_step(
        transaction,
        "create orders",
        "CREATE TABLE IF NOT EXISTS orders (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            restaurant_id INTEGER NOT NULL,
            customer_location_id INTEGER NOT NULL,
            status TEXT NOT NULL,
            assigned_driver_id INTEGER,
            FOREIGN KEY (restaurant_id) REFERENCES locations(id),
            FOREIGN KEY (customer_location_id) REFERENCES locations(id),
            FOREIGN KEY (assigned_driver_id) REFERENCES drivers(id)
        )",
    )?;
    run_step(
        transaction,
        "create driver_orders",
        "CREATE TABLE IF NOT EXISTS driver_orders (
            driver_id INTEGER NOT NULL,
            order_id INTEGER NOT NULL,
            position INTEGER NOT NULL,
            PRIMARY KEY (driver_id, order_id),
            FOREIGN KEY (driver_id) REFERENCES drivers(id),
            FOREIGN KEY (order_id) REFERENCES orders(id) ON DELETE CASCADE
        ) WITHOUT ROWID",
    )?;
    run_step(
        transaction,
        "index driver_orders",
        "CREATE INDEX IF NOT EXISTS idx_driver_orders_order
            ON driver_orders(order_id)",
    )
}

fn ensure_schema_version(transaction: &Transaction<'_>) -> Result<(), SqliteStoreError> {
    run_step(
        transaction,
        "create schema version table",
        "CREATE TABLE IF NOT EXISTS dispatch_schema_version (
            version INTEGER PRIMARY KEY CHECK (version > 0)
        ) WITHOUT ROWID",
    )?;

    let existing: Option<i64> = transaction
        .query_row(
            "SELECT version FROM dispatch_schema_version LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()
        .map_err(SqliteStoreError::migration("read schema version"))?;

    match existing {
        Some(found) if found == SCHEMA_VERSION => Ok(()),
        Some(found) => Err(SqliteStoreError::SchemaVersionMismatch {
            found,
            expected: SCHEMA_VERSION,
        }),
        None => transaction
            .execute(
                "INSERT INTO dispatch_schema_version (version) VALUES (?1)",
                [SCHEMA_VERSION],
            )
            .map(|_| ())
            .map_err(SqliteStoreError::migration("record schema version")),
    }
}

fn run_step(
    transaction: &Transaction<'_>,
    step: &'static str,
    sql: &str,
) -> Result<(), SqliteStoreError> {
    transaction
        .execute(sql, [])
        .map(|_| ())
        .map_err(SqliteStoreError::migration(step))
}
