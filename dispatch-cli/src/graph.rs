//! Graph commands: `add-location`, `add-edge` and `shortest-path`.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use dispatch_core::{DEFAULT_TRAFFIC_FACTOR, Edge, Location, LocationId};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::output::{Empty, PathOutput, write_json};
use crate::{
    ARG_DATABASE, ARG_DESTINATION, ARG_DISTANCE, ARG_END, ARG_ID, ARG_NAME, ARG_SOURCE,
    ARG_START, ARG_TRAFFIC_FACTOR, ARG_X, ARG_Y, CliError, ENV_EDGE_DESTINATION,
    ENV_EDGE_DISTANCE, ENV_EDGE_SOURCE, ENV_LOCATION_ID, ENV_LOCATION_NAME, ENV_LOCATION_X,
    ENV_LOCATION_Y, ENV_PATH_END, ENV_PATH_START, database_path, open_service, required,
};

/// CLI arguments for the `add-location` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(name = "add-location", about = "Add a named location to the graph")]
#[ortho_config(prefix = "DISPATCH")]
pub(crate) struct AddLocationArgs {
    /// SQLite database holding the graph and fleet.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Identifier of the new location.
    #[arg(long = ARG_ID, value_name = "id")]
    #[serde(default)]
    pub(crate) id: Option<u64>,
    /// Display name.
    #[arg(long = ARG_NAME, value_name = "name")]
    #[serde(default)]
    pub(crate) name: Option<String>,
    /// Planar x coordinate.
    #[arg(long = ARG_X, value_name = "x", allow_negative_numbers = true)]
    #[serde(default)]
    pub(crate) x: Option<f64>,
    /// Planar y coordinate.
    #[arg(long = ARG_Y, value_name = "y", allow_negative_numbers = true)]
    #[serde(default)]
    pub(crate) y: Option<f64>,
}

/// Resolved `add-location` configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AddLocationConfig {
    pub(crate) database: Utf8PathBuf,
    pub(crate) location: Location,
}

impl TryFrom<AddLocationArgs> for AddLocationConfig {
    type Error = CliError;

    fn try_from(args: AddLocationArgs) -> Result<Self, Self::Error> {
        let id = required(args.id, ARG_ID, ENV_LOCATION_ID)?;
        let name = required(args.name, ARG_NAME, ENV_LOCATION_NAME)?;
        let x = required(args.x, ARG_X, ENV_LOCATION_X)?;
        let y = required(args.y, ARG_Y, ENV_LOCATION_Y)?;
        Ok(Self {
            database: database_path(args.database),
            location: Location::new(LocationId::new(id), name, x, y)?,
        })
    }
}

/// CLI arguments for the `add-edge` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "add-edge",
    about = "Add or replace a directed road between two locations"
)]
#[ortho_config(prefix = "DISPATCH")]
pub(crate) struct AddEdgeArgs {
    /// SQLite database holding the graph and fleet.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Location the road leaves from.
    #[arg(long = ARG_SOURCE, value_name = "id")]
    #[serde(default)]
    pub(crate) source: Option<u64>,
    /// Location the road leads to.
    #[arg(long = ARG_DESTINATION, value_name = "id")]
    #[serde(default)]
    pub(crate) destination: Option<u64>,
    /// Road length.
    #[arg(long = ARG_DISTANCE, value_name = "distance")]
    #[serde(default)]
    pub(crate) distance: Option<f64>,
    /// Congestion multiplier; defaults to 1.0.
    #[arg(long = ARG_TRAFFIC_FACTOR, value_name = "factor")]
    #[serde(default)]
    pub(crate) traffic_factor: Option<f64>,
}

/// Resolved `add-edge` configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AddEdgeConfig {
    pub(crate) database: Utf8PathBuf,
    pub(crate) edge: Edge,
}

impl TryFrom<AddEdgeArgs> for AddEdgeConfig {
    type Error = CliError;

    fn try_from(args: AddEdgeArgs) -> Result<Self, Self::Error> {
        let source = required(args.source, ARG_SOURCE, ENV_EDGE_SOURCE)?;
        let destination = required(args.destination, ARG_DESTINATION, ENV_EDGE_DESTINATION)?;
        let distance = required(args.distance, ARG_DISTANCE, ENV_EDGE_DISTANCE)?;
        let edge = Edge::new(
            LocationId::new(source),
            LocationId::new(destination),
            distance,
            args.traffic_factor.unwrap_or(DEFAULT_TRAFFIC_FACTOR),
        )?;
        Ok(Self {
            database: database_path(args.database),
            edge,
        })
    }
}

/// CLI arguments for the `shortest-path` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "shortest-path",
    about = "Find the cheapest path between two locations"
)]
#[ortho_config(prefix = "DISPATCH")]
pub(crate) struct ShortestPathArgs {
    /// SQLite database holding the graph and fleet.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Origin location.
    #[arg(long = ARG_START, value_name = "id")]
    #[serde(default)]
    pub(crate) start: Option<u64>,
    /// Destination location.
    #[arg(long = ARG_END, value_name = "id")]
    #[serde(default)]
    pub(crate) end: Option<u64>,
}

/// Resolved `shortest-path` configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ShortestPathConfig {
    pub(crate) database: Utf8PathBuf,
    pub(crate) start: LocationId,
    pub(crate) end: LocationId,
}

impl TryFrom<ShortestPathArgs> for ShortestPathConfig {
    type Error = CliError;

    fn try_from(args: ShortestPathArgs) -> Result<Self, Self::Error> {
        Ok(Self {
            database: database_path(args.database),
            start: LocationId::new(required(args.start, ARG_START, ENV_PATH_START)?),
            end: LocationId::new(required(args.end, ARG_END, ENV_PATH_END)?),
        })
    }
}

pub(crate) fn run_add_location_with(
    args: AddLocationArgs,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let config = AddLocationConfig::try_from(merged)?;
    let service = open_service(&config.database)?;
    let id = config.location.id;
    service.add_location(config.location)?;
    log::info!("location {id} added");
    write_json(writer, &Empty {})
}

pub(crate) fn run_add_edge_with(args: AddEdgeArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let config = AddEdgeConfig::try_from(merged)?;
    let service = open_service(&config.database)?;
    service.add_edge(config.edge)?;
    log::info!(
        "edge {} -> {} stored",
        config.edge.source,
        config.edge.destination
    );
    write_json(writer, &Empty {})
}

pub(crate) fn run_shortest_path_with(
    args: ShortestPathArgs,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let config = ShortestPathConfig::try_from(merged)?;
    let service = open_service(&config.database)?;
    let path = service.shortest_path(config.start, config.end)?;
    write_json(writer, &PathOutput::from(path))
}
