//! Driver commands: `add-driver`, `relocate-driver` and `driver-route`.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use dispatch_core::{DriverId, LocationId};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::output::{Empty, NewDriverOutput, RouteOutput, raw_ids, write_json};
use crate::{
    ARG_DATABASE, ARG_DRIVER, ARG_LOCATION, ARG_SPEED, CliError, ENV_DRIVER_SPEED,
    ENV_RELOCATE_DRIVER, ENV_RELOCATE_LOCATION, ENV_ROUTE_DRIVER, database_path, open_service,
    required,
};

/// CLI arguments for the `add-driver` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "add-driver",
    about = "Register a driver",
    long_about = "Register a driver with the given speed. Without --location \
                 the driver starts at the location with the lowest id."
)]
#[ortho_config(prefix = "DISPATCH")]
pub(crate) struct AddDriverArgs {
    /// SQLite database holding the graph and fleet.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Travel speed; must be positive.
    #[arg(long = ARG_SPEED, value_name = "speed")]
    #[serde(default)]
    pub(crate) speed: Option<f64>,
    /// Starting location.
    #[arg(long = ARG_LOCATION, value_name = "id")]
    #[serde(default)]
    pub(crate) location: Option<u64>,
}

/// Resolved `add-driver` configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AddDriverConfig {
    pub(crate) database: Utf8PathBuf,
    pub(crate) speed: f64,
    pub(crate) location: Option<LocationId>,
}

impl TryFrom<AddDriverArgs> for AddDriverConfig {
    type Error = CliError;

    fn try_from(args: AddDriverArgs) -> Result<Self, Self::Error> {
        Ok(Self {
            database: database_path(args.database),
            speed: required(args.speed, ARG_SPEED, ENV_DRIVER_SPEED)?,
            location: args.location.map(LocationId::new),
        })
    }
}

/// CLI arguments for the `relocate-driver` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(name = "relocate-driver", about = "Move a driver to another location")]
#[ortho_config(prefix = "DISPATCH")]
pub(crate) struct RelocateDriverArgs {
    /// SQLite database holding the graph and fleet.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Driver to move.
    #[arg(long = ARG_DRIVER, value_name = "id")]
    #[serde(default)]
    pub(crate) driver: Option<u64>,
    /// New location.
    #[arg(long = ARG_LOCATION, value_name = "id")]
    #[serde(default)]
    pub(crate) location: Option<u64>,
}

/// Resolved `relocate-driver` configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RelocateDriverConfig {
    pub(crate) database: Utf8PathBuf,
    pub(crate) driver: DriverId,
    pub(crate) location: LocationId,
}

impl TryFrom<RelocateDriverArgs> for RelocateDriverConfig {
    type Error = CliError;

    fn try_from(args: RelocateDriverArgs) -> Result<Self, Self::Error> {
        Ok(Self {
            database: database_path(args.database),
            driver: DriverId::new(required(args.driver, ARG_DRIVER, ENV_RELOCATE_DRIVER)?),
            location: LocationId::new(required(
                args.location,
                ARG_LOCATION,
                ENV_RELOCATE_LOCATION,
            )?),
        })
    }
}

/// CLI arguments for the `driver-route` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(name = "driver-route", about = "Show the stop sequence a driver follows")]
#[ortho_config(prefix = "DISPATCH")]
pub(crate) struct DriverRouteArgs {
    /// SQLite database holding the graph and fleet.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Driver whose route to build.
    #[arg(long = ARG_DRIVER, value_name = "id")]
    #[serde(default)]
    pub(crate) driver: Option<u64>,
}

/// Resolved `driver-route` configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DriverRouteConfig {
    pub(crate) database: Utf8PathBuf,
    pub(crate) driver: DriverId,
}

impl TryFrom<DriverRouteArgs> for DriverRouteConfig {
    type Error = CliError;

    fn try_from(args: DriverRouteArgs) -> Result<Self, Self::Error> {
        Ok(Self {
            database: database_path(args.database),
            driver: DriverId::new(required(args.driver, ARG_DRIVER, ENV_ROUTE_DRIVER)?),
        })
    }
}

pub(crate) fn run_add_driver_with(
    args: AddDriverArgs,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let config = AddDriverConfig::try_from(merged)?;
    let service = open_service(&config.database)?;
    let driver = service.add_driver(config.speed, config.location)?;
    write_json(
        writer,
        &NewDriverOutput {
            driver_id: driver.get(),
        },
    )
}

pub(crate) fn run_relocate_driver_with(
    args: RelocateDriverArgs,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let config = RelocateDriverConfig::try_from(merged)?;
    let service = open_service(&config.database)?;
    service.relocate_driver(config.driver, config.location)?;
    log::info!("driver {} moved to {}", config.driver, config.location);
    write_json(writer, &Empty {})
}

pub(crate) fn run_driver_route_with(
    args: DriverRouteArgs,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let config = DriverRouteConfig::try_from(merged)?;
    let service = open_service(&config.database)?;
    let route = service.driver_route(config.driver)?;
    write_json(
        writer,
        &RouteOutput {
            route: raw_ids(&route),
        },
    )
}
