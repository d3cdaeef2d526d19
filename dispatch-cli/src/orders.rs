//! Order commands: `place-order`, `assign-order` and `complete-order`.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use dispatch_core::{LocationId, OrderId};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::output::{AssignOrderOutput, Empty, PlaceOrderOutput, write_json};
use crate::{
    ARG_CUSTOMER, ARG_DATABASE, ARG_ORDER, ARG_RESTAURANT, CliError, ENV_ASSIGN_ORDER,
    ENV_COMPLETE_ORDER, ENV_PLACE_CUSTOMER, ENV_PLACE_RESTAURANT, database_path, open_service,
    required,
};

/// CLI arguments for the `place-order` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "place-order",
    about = "Create an order and dispatch it",
    long_about = "Create an order from a restaurant to a customer location and \
                 hand it to the best-scoring driver with spare capacity. The \
                 order stays pending when no driver qualifies."
)]
#[ortho_config(prefix = "DISPATCH")]
pub(crate) struct PlaceOrderArgs {
    /// SQLite database holding the graph and fleet.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Pickup location.
    #[arg(long = ARG_RESTAURANT, value_name = "id")]
    #[serde(default)]
    pub(crate) restaurant: Option<u64>,
    /// Dropoff location.
    #[arg(long = ARG_CUSTOMER, value_name = "id")]
    #[serde(default)]
    pub(crate) customer: Option<u64>,
}

/// Resolved `place-order` configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PlaceOrderConfig {
    pub(crate) database: Utf8PathBuf,
    pub(crate) restaurant: LocationId,
    pub(crate) customer: LocationId,
}

impl TryFrom<PlaceOrderArgs> for PlaceOrderConfig {
    type Error = CliError;

    fn try_from(args: PlaceOrderArgs) -> Result<Self, Self::Error> {
        let restaurant = required(args.restaurant, ARG_RESTAURANT, ENV_PLACE_RESTAURANT)?;
        let customer = required(args.customer, ARG_CUSTOMER, ENV_PLACE_CUSTOMER)?;
        Ok(Self {
            database: database_path(args.database),
            restaurant: LocationId::new(restaurant),
            customer: LocationId::new(customer),
        })
    }
}

/// CLI arguments for the `assign-order` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(name = "assign-order", about = "Dispatch an existing order again")]
#[ortho_config(prefix = "DISPATCH")]
pub(crate) struct AssignOrderArgs {
    /// SQLite database holding the graph and fleet.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Order to dispatch.
    #[arg(long = ARG_ORDER, value_name = "id")]
    #[serde(default)]
    pub(crate) order: Option<u64>,
}

/// CLI arguments for the `complete-order` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(name = "complete-order", about = "Mark an order as delivered")]
#[ortho_config(prefix = "DISPATCH")]
pub(crate) struct CompleteOrderArgs {
    /// SQLite database holding the graph and fleet.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Order that was delivered.
    #[arg(long = ARG_ORDER, value_name = "id")]
    #[serde(default)]
    pub(crate) order: Option<u64>,
}

/// Resolved configuration of a command acting on one order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct OrderConfig {
    pub(crate) database: Utf8PathBuf,
    pub(crate) order: OrderId,
}

impl TryFrom<AssignOrderArgs> for OrderConfig {
    type Error = CliError;

    fn try_from(args: AssignOrderArgs) -> Result<Self, Self::Error> {
        Ok(Self {
            database: database_path(args.database),
            order: OrderId::new(required(args.order, ARG_ORDER, ENV_ASSIGN_ORDER)?),
        })
    }
}

impl TryFrom<CompleteOrderArgs> for OrderConfig {
    type Error = CliError;

    fn try_from(args: CompleteOrderArgs) -> Result<Self, Self::Error> {
        Ok(Self {
            database: database_path(args.database),
            order: OrderId::new(required(args.order, ARG_ORDER, ENV_COMPLETE_ORDER)?),
        })
    }
}

pub(crate) fn run_place_order_with(
    args: PlaceOrderArgs,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let config = PlaceOrderConfig::try_from(merged)?;
    let service = open_service(&config.database)?;
    let placed = service.place_order(config.restaurant, config.customer)?;
    write_json(writer, &PlaceOrderOutput::from(placed))
}

pub(crate) fn run_assign_order_with(
    args: AssignOrderArgs,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let config = OrderConfig::try_from(merged)?;
    let service = open_service(&config.database)?;
    let outcome = service.assign_order(config.order)?;
    write_json(writer, &AssignOrderOutput::new(config.order, outcome))
}

pub(crate) fn run_complete_order_with(
    args: CompleteOrderArgs,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let config = OrderConfig::try_from(merged)?;
    let service = open_service(&config.database)?;
    if !service.complete_order(config.order)? {
        return Err(CliError::CompleteOrder {
            order: config.order,
        });
    }
    write_json(writer, &Empty {})
}
