//! The `seed` command: bulk-load a JSON dataset.

use std::collections::BTreeSet;
use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use dispatch_core::{
    DEFAULT_TRAFFIC_FACTOR, DispatchError, DispatchService, Edge, Location, LocationId,
    validate_speed,
};
use dispatch_store::SqliteStore;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::output::write_json;
use crate::{ARG_DATABASE, ARG_SEED_FILE, CliError, ENV_SEED_FILE, database_path, open_service};

/// CLI arguments for the `seed` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "seed",
    about = "Load locations, edges and drivers from a JSON file",
    long_about = "Load a dataset of the form {\"locations\": [...], \"edges\": \
                 [...], \"drivers\": [...]} into the database. Locations are \
                 inserted first, then edges, then drivers."
)]
#[ortho_config(prefix = "DISPATCH")]
pub(crate) struct SeedArgs {
    /// SQLite database holding the graph and fleet.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// JSON dataset to load.
    #[arg(long = ARG_SEED_FILE, value_name = "path")]
    #[serde(default)]
    pub(crate) file: Option<Utf8PathBuf>,
}

/// Resolved `seed` configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SeedConfig {
    pub(crate) database: Utf8PathBuf,
    pub(crate) file: Utf8PathBuf,
}

impl TryFrom<SeedArgs> for SeedConfig {
    type Error = CliError;

    fn try_from(args: SeedArgs) -> Result<Self, Self::Error> {
        let file = args.file.ok_or(CliError::MissingArgument {
            field: ARG_SEED_FILE,
            env: ENV_SEED_FILE,
        })?;
        require_existing(&file)?;
        Ok(Self {
            database: database_path(args.database),
            file,
        })
    }
}

fn require_existing(path: &Utf8Path) -> Result<(), CliError> {
    match dispatch_fs::is_file(path) {
        Ok(true) => Ok(()),
        Ok(false) => Err(CliError::MissingSourceFile {
            field: ARG_SEED_FILE,
            path: path.to_path_buf(),
        }),
        Err(source) => Err(CliError::InspectSourcePath {
            field: ARG_SEED_FILE,
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct SeedDocument {
    pub(crate) locations: Vec<SeedLocation>,
    pub(crate) edges: Vec<SeedEdge>,
    pub(crate) drivers: Vec<SeedDriver>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SeedLocation {
    pub(crate) id: u64,
    pub(crate) name: String,
    pub(crate) x: f64,
    pub(crate) y: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SeedEdge {
    pub(crate) source: u64,
    pub(crate) destination: u64,
    pub(crate) distance: f64,
    #[serde(default = "default_traffic_factor")]
    pub(crate) traffic_factor: f64,
}

const fn default_traffic_factor() -> f64 {
    DEFAULT_TRAFFIC_FACTOR
}

#[derive(Debug, Deserialize)]
pub(crate) struct SeedDriver {
    pub(crate) speed: f64,
    #[serde(default)]
    pub(crate) location: Option<u64>,
}

/// Summary printed once the dataset is loaded.
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SeedOutput {
    pub(crate) locations: usize,
    pub(crate) edges: usize,
    pub(crate) driver_ids: Vec<u64>,
}

pub(crate) fn parse_seed(path: &Utf8Path) -> Result<SeedDocument, CliError> {
    let text = dispatch_fs::read_to_string(path).map_err(|source| CliError::ReadSeed {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| CliError::ParseSeed {
        path: path.to_path_buf(),
        source,
    })
}

/// A seed document checked against itself and the existing graph.
#[derive(Debug)]
pub(crate) struct SeedPlan {
    locations: Vec<Location>,
    edges: Vec<Edge>,
    drivers: Vec<(f64, Option<LocationId>)>,
}

fn invalid(section: &'static str, index: usize) -> impl FnOnce(DispatchError) -> CliError {
    move |source| CliError::InvalidSeed {
        entry: format!("{section}[{index}]"),
        source,
    }
}

/// Check every entry of `document` before anything is written.
///
/// Locations must carry finite coordinates and ids unused by `existing` or
/// earlier entries. Edges and driver start locations must name a location
/// that exists or is seeded by the same document.
pub(crate) fn validate_seed(
    document: SeedDocument,
    existing: &[Location],
) -> Result<SeedPlan, CliError> {
    let mut known: BTreeSet<LocationId> = existing.iter().map(|l| l.id).collect();
    let require_known = |known: &BTreeSet<LocationId>, id: LocationId| {
        if known.contains(&id) {
            Ok(())
        } else {
            Err(DispatchError::unknown_location(id))
        }
    };

    let mut locations = Vec::with_capacity(document.locations.len());
    for (index, entry) in document.locations.into_iter().enumerate() {
        let id = LocationId::new(entry.id);
        let location =
            Location::new(id, entry.name, entry.x, entry.y).map_err(invalid("locations", index))?;
        if !known.insert(id) {
            return Err(invalid("locations", index)(DispatchError::InvalidInput(
                format!("location {id} already exists"),
            )));
        }
        locations.push(location);
    }

    let mut edges = Vec::with_capacity(document.edges.len());
    for (index, entry) in document.edges.into_iter().enumerate() {
        let edge = Edge::new(
            LocationId::new(entry.source),
            LocationId::new(entry.destination),
            entry.distance,
            entry.traffic_factor,
        )
        .map_err(invalid("edges", index))?;
        require_known(&known, edge.source)
            .and_then(|()| require_known(&known, edge.destination))
            .map_err(invalid("edges", index))?;
        edges.push(edge);
    }

    let mut drivers = Vec::with_capacity(document.drivers.len());
    for (index, entry) in document.drivers.into_iter().enumerate() {
        validate_speed(entry.speed).map_err(invalid("drivers", index))?;
        let start = entry.location.map(LocationId::new);
        match start {
            Some(id) => require_known(&known, id).map_err(invalid("drivers", index))?,
            None if known.is_empty() => {
                return Err(invalid("drivers", index)(DispatchError::InvalidInput(
                    "no locations exist to start a driver at".to_owned(),
                )));
            }
            None => {}
        }
        drivers.push((entry.speed, start));
    }

    Ok(SeedPlan {
        locations,
        edges,
        drivers,
    })
}

/// Write a validated plan: locations, then edges, then drivers.
///
/// Each record is its own store write. Validation rules out the failures the
/// document can cause, so a partial seed only follows a storage failure.
pub(crate) fn apply_seed(
    service: &DispatchService<SqliteStore>,
    plan: SeedPlan,
) -> Result<SeedOutput, CliError> {
    let locations = plan.locations.len();
    for location in plan.locations {
        service.add_location(location)?;
    }
    let edges = plan.edges.len();
    for edge in plan.edges {
        service.add_edge(edge)?;
    }
    let mut driver_ids = Vec::with_capacity(plan.drivers.len());
    for (speed, start) in plan.drivers {
        driver_ids.push(service.add_driver(speed, start)?.get());
    }
    Ok(SeedOutput {
        locations,
        edges,
        driver_ids,
    })
}

pub(crate) fn run_seed_with(args: SeedArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let config = SeedConfig::try_from(merged)?;
    let document = parse_seed(&config.file)?;
    let service = open_service(&config.database)?;
    let plan = validate_seed(document, &service.locations()?)?;
    let summary = apply_seed(&service, plan)?;
    log::info!(
        "seeded {} locations, {} edges and {} drivers from {}",
        summary.locations,
        summary.edges,
        summary.driver_ids.len(),
        config.file
    );
    write_json(writer, &summary)
}
