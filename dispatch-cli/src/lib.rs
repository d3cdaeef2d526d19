//! Command-line interface for the delivery dispatch engine.
//!
//! Every subcommand opens the SQLite database, performs one operation through
//! [`DispatchService`] and prints a single JSON document on stdout. Options
//! layer defaults, configuration files, `DISPATCH_*` environment variables and
//! flags through `ortho_config`.
#![forbid(unsafe_code)]

use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand};
use dispatch_core::DispatchService;
use dispatch_store::{DEFAULT_DATABASE, SqliteStore};

mod error;
mod fleet;
mod graph;
mod listing;
mod logging;
mod orders;
mod output;
mod seed;

pub use error::CliError;
pub use output::write_error;

use fleet::{AddDriverArgs, DriverRouteArgs, RelocateDriverArgs};
use graph::{AddEdgeArgs, AddLocationArgs, ShortestPathArgs};
use listing::ListArgs;
use orders::{AssignOrderArgs, CompleteOrderArgs, PlaceOrderArgs};
use seed::SeedArgs;

pub(crate) const ARG_DATABASE: &str = "database";
pub(crate) const ARG_ID: &str = "id";
pub(crate) const ARG_NAME: &str = "name";
pub(crate) const ARG_X: &str = "x";
pub(crate) const ARG_Y: &str = "y";
pub(crate) const ARG_SOURCE: &str = "source";
pub(crate) const ARG_DESTINATION: &str = "destination";
pub(crate) const ARG_DISTANCE: &str = "distance";
pub(crate) const ARG_TRAFFIC_FACTOR: &str = "traffic-factor";
pub(crate) const ARG_START: &str = "start";
pub(crate) const ARG_END: &str = "end";
pub(crate) const ARG_SPEED: &str = "speed";
pub(crate) const ARG_DRIVER: &str = "driver";
pub(crate) const ARG_LOCATION: &str = "location";
pub(crate) const ARG_RESTAURANT: &str = "restaurant";
pub(crate) const ARG_CUSTOMER: &str = "customer";
pub(crate) const ARG_ORDER: &str = "order";
pub(crate) const ARG_KIND: &str = "kind";
pub(crate) const ARG_SEED_FILE: &str = "file";

pub(crate) const ENV_LOCATION_ID: &str = "DISPATCH_CMDS_ADD_LOCATION_ID";
pub(crate) const ENV_LOCATION_NAME: &str = "DISPATCH_CMDS_ADD_LOCATION_NAME";
pub(crate) const ENV_LOCATION_X: &str = "DISPATCH_CMDS_ADD_LOCATION_X";
pub(crate) const ENV_LOCATION_Y: &str = "DISPATCH_CMDS_ADD_LOCATION_Y";
pub(crate) const ENV_EDGE_SOURCE: &str = "DISPATCH_CMDS_ADD_EDGE_SOURCE";
pub(crate) const ENV_EDGE_DESTINATION: &str = "DISPATCH_CMDS_ADD_EDGE_DESTINATION";
pub(crate) const ENV_EDGE_DISTANCE: &str = "DISPATCH_CMDS_ADD_EDGE_DISTANCE";
pub(crate) const ENV_PATH_START: &str = "DISPATCH_CMDS_SHORTEST_PATH_START";
pub(crate) const ENV_PATH_END: &str = "DISPATCH_CMDS_SHORTEST_PATH_END";
pub(crate) const ENV_DRIVER_SPEED: &str = "DISPATCH_CMDS_ADD_DRIVER_SPEED";
pub(crate) const ENV_RELOCATE_DRIVER: &str = "DISPATCH_CMDS_RELOCATE_DRIVER_DRIVER";
pub(crate) const ENV_RELOCATE_LOCATION: &str = "DISPATCH_CMDS_RELOCATE_DRIVER_LOCATION";
pub(crate) const ENV_ROUTE_DRIVER: &str = "DISPATCH_CMDS_DRIVER_ROUTE_DRIVER";
pub(crate) const ENV_PLACE_RESTAURANT: &str = "DISPATCH_CMDS_PLACE_ORDER_RESTAURANT";
pub(crate) const ENV_PLACE_CUSTOMER: &str = "DISPATCH_CMDS_PLACE_ORDER_CUSTOMER";
pub(crate) const ENV_ASSIGN_ORDER: &str = "DISPATCH_CMDS_ASSIGN_ORDER_ORDER";
pub(crate) const ENV_COMPLETE_ORDER: &str = "DISPATCH_CMDS_COMPLETE_ORDER_ORDER";
pub(crate) const ENV_LIST_KIND: &str = "DISPATCH_CMDS_LIST_KIND";
pub(crate) const ENV_SEED_FILE: &str = "DISPATCH_CMDS_SEED_FILE";

/// Run the dispatch CLI with the current process arguments and environment.
///
/// # Errors
/// Returns [`CliError`] when parsing, configuration or the operation fails.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse()?;
    logging::init(cli.verbose);
    let mut stdout = std::io::stdout().lock();
    run_command(cli.command, &mut stdout)
}

fn run_command(command: Command, writer: &mut dyn Write) -> Result<(), CliError> {
    match command {
        Command::AddLocation(args) => graph::run_add_location_with(args, writer),
        Command::AddEdge(args) => graph::run_add_edge_with(args, writer),
        Command::ShortestPath(args) => graph::run_shortest_path_with(args, writer),
        Command::AddDriver(args) => fleet::run_add_driver_with(args, writer),
        Command::RelocateDriver(args) => fleet::run_relocate_driver_with(args, writer),
        Command::DriverRoute(args) => fleet::run_driver_route_with(args, writer),
        Command::PlaceOrder(args) => orders::run_place_order_with(args, writer),
        Command::AssignOrder(args) => orders::run_assign_order_with(args, writer),
        Command::CompleteOrder(args) => orders::run_complete_order_with(args, writer),
        Command::List(args) => listing::run_list_with(args, writer),
        Command::Seed(args) => seed::run_seed_with(args, writer),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "dispatch",
    about = "Dispatch food delivery orders to drivers over a weighted city graph",
    version
)]
struct Cli {
    /// Log debug output on stderr.
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Add a named location to the graph.
    AddLocation(AddLocationArgs),
    /// Add or replace a directed road between two locations.
    AddEdge(AddEdgeArgs),
    /// Find the cheapest path between two locations.
    ShortestPath(ShortestPathArgs),
    /// Register a driver.
    AddDriver(AddDriverArgs),
    /// Move a driver to another location.
    RelocateDriver(RelocateDriverArgs),
    /// Show the stop sequence a driver follows.
    DriverRoute(DriverRouteArgs),
    /// Create an order and dispatch it.
    PlaceOrder(PlaceOrderArgs),
    /// Dispatch an existing order again.
    AssignOrder(AssignOrderArgs),
    /// Mark an order as delivered.
    CompleteOrder(CompleteOrderArgs),
    /// List locations, orders or drivers.
    List(ListArgs),
    /// Load locations, edges and drivers from a JSON file.
    Seed(SeedArgs),
}

/// Unwrap a merged option or report which flag and variable can supply it.
pub(crate) fn required<T>(
    value: Option<T>,
    field: &'static str,
    env: &'static str,
) -> Result<T, CliError> {
    value.ok_or(CliError::MissingArgument { field, env })
}

/// Database path after merging, falling back to [`DEFAULT_DATABASE`].
pub(crate) fn database_path(database: Option<Utf8PathBuf>) -> Utf8PathBuf {
    database.unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_DATABASE))
}

/// Open the database and wrap it in a dispatch service.
pub(crate) fn open_service(database: &Utf8Path) -> Result<DispatchService<SqliteStore>, CliError> {
    let store = SqliteStore::open(database).map_err(|source| CliError::OpenStore {
        path: database.to_path_buf(),
        source,
    })?;
    Ok(DispatchService::new(store)?)
}

#[cfg(test)]
mod tests;
