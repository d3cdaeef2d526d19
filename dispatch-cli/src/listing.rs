//! The `list` command.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::{Parser, ValueEnum};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::output::{DriverRow, LocationRow, OrderRow, write_json};
use crate::{
    ARG_DATABASE, ARG_KIND, CliError, ENV_LIST_KIND, database_path, open_service, required,
};

/// Record families `list` can print.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum RecordSet {
    Locations,
    Orders,
    Drivers,
}

/// CLI arguments for the `list` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(name = "list", about = "List locations, orders or drivers")]
#[ortho_config(prefix = "DISPATCH")]
pub(crate) struct ListArgs {
    /// SQLite database holding the graph and fleet.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Which records to print.
    #[arg(long = ARG_KIND, value_enum, value_name = "kind")]
    #[serde(default)]
    pub(crate) kind: Option<RecordSet>,
}

/// Resolved `list` configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ListConfig {
    pub(crate) database: Utf8PathBuf,
    pub(crate) kind: RecordSet,
}

impl TryFrom<ListArgs> for ListConfig {
    type Error = CliError;

    fn try_from(args: ListArgs) -> Result<Self, Self::Error> {
        Ok(Self {
            database: database_path(args.database),
            kind: required(args.kind, ARG_KIND, ENV_LIST_KIND)?,
        })
    }
}

pub(crate) fn run_list_with(args: ListArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let config = ListConfig::try_from(merged)?;
    let service = open_service(&config.database)?;
    match config.kind {
        RecordSet::Locations => {
            let rows: Vec<LocationRow> = service
                .locations()?
                .into_iter()
                .map(LocationRow::from)
                .collect();
            write_json(writer, &rows)
        }
        RecordSet::Orders => {
            let rows: Vec<OrderRow> = service.orders()?.into_iter().map(OrderRow::from).collect();
            write_json(writer, &rows)
        }
        RecordSet::Drivers => {
            let rows: Vec<DriverRow> = service
                .drivers()?
                .into_iter()
                .map(DriverRow::from)
                .collect();
            write_json(writer, &rows)
        }
    }
}
