//! Error types emitted by the dispatch CLI.

use std::sync::Arc;

use camino::Utf8PathBuf;
use dispatch_core::{DispatchError, OrderId};
use dispatch_store::SqliteStoreError;
use thiserror::Error;

/// Errors emitted by the dispatch CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        /// Flag name without the leading dashes.
        field: &'static str,
        /// Environment variable that can supply the value.
        env: &'static str,
    },
    /// A referenced input path does not exist or is not a file.
    #[error("{field} path {path:?} does not exist or is not a file")]
    MissingSourceFile {
        /// Flag naming the path.
        field: &'static str,
        /// Offending path.
        path: Utf8PathBuf,
    },
    /// A referenced input path could not be inspected.
    #[error("failed to inspect {field} path {path:?}: {source}")]
    InspectSourcePath {
        /// Flag naming the path.
        field: &'static str,
        /// Offending path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Opening the dispatch database failed.
    #[error("failed to open database {path:?}: {source}")]
    OpenStore {
        /// Database path.
        path: Utf8PathBuf,
        /// Store error.
        #[source]
        source: SqliteStoreError,
    },
    /// The dispatch engine rejected the operation.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    /// Completing an order failed because it does not exist.
    #[error("failed to complete order {order}")]
    CompleteOrder {
        /// Order that could not be completed.
        order: OrderId,
    },
    /// Reading the seed file failed.
    #[error("failed to read seed file {path:?}: {source}")]
    ReadSeed {
        /// Seed file path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Seed JSON could not be decoded.
    #[error("failed to parse seed file {path:?}: {source}")]
    ParseSeed {
        /// Seed file path.
        path: Utf8PathBuf,
        /// Decoding error.
        #[source]
        source: serde_json::Error,
    },
    /// A seed entry failed validation; nothing was written.
    #[error("invalid seed entry {entry}: {source}")]
    InvalidSeed {
        /// Position of the entry, such as `edges[2]`.
        entry: String,
        /// Why the entry was rejected.
        #[source]
        source: DispatchError,
    },
    /// Serializing command output failed.
    #[error("failed to serialize output: {0}")]
    SerializeOutput(#[source] serde_json::Error),
    /// Writing command output failed.
    #[error("failed to write output: {0}")]
    WriteOutput(#[source] std::io::Error),
}
