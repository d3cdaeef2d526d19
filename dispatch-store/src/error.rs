//! Errors raised by the SQLite store.

use camino::Utf8PathBuf;
use dispatch_core::{RecordKind, StoreError};
use rusqlite::Error as SqliteError;
use thiserror::Error;

/// Failures specific to the SQLite backend.
///
/// Trait methods surface these wrapped in [`StoreError::Backend`]; missing and
/// duplicate records are reported through the dedicated [`StoreError`]
/// variants instead.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Failed to create the directory holding the database file.
    #[error("failed to create parent directory {path:?}")]
    CreateDirectory {
        /// Directory that could not be created.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Opening the database failed.
    #[error("failed to open SQLite database at {path:?}")]
    Open {
        /// Database path.
        path: Utf8PathBuf,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// Enabling foreign key enforcement failed.
    #[error("failed to enable SQLite foreign keys")]
    ForeignKeys {
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// Configuring a connection pragma failed.
    #[error("failed to set SQLite pragma {pragma}")]
    Pragma {
        /// Pragma being configured.
        pragma: &'static str,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// A schema migration step failed.
    #[error("schema migration failed during {step}")]
    Migration {
        /// Step that failed.
        step: &'static str,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// The database was created by an incompatible schema version.
    #[error("unsupported schema version {found}; expected {expected}")]
    SchemaVersionMismatch {
        /// Version recorded in the database.
        found: i64,
        /// Version this build understands.
        expected: i64,
    },
    /// A query or statement failed.
    #[error("failed to {step}")]
    Query {
        /// Operation that failed.
        step: &'static str,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// An identifier does not fit an SQLite integer.
    #[error("{kind} id {id} exceeds SQLite i64 range")]
    IdOutOfRange {
        /// Kind of record.
        kind: RecordKind,
        /// Offending identifier.
        id: u64,
    },
    /// A stored row could not be turned back into a domain record.
    #[error("corrupt {table} row: {detail}")]
    CorruptRow {
        /// Table holding the row.
        table: &'static str,
        /// What was wrong with it.
        detail: String,
    },
}

impl SqliteStoreError {
    pub(crate) fn query(step: &'static str) -> impl FnOnce(SqliteError) -> Self {
        move |source| Self::Query { step, source }
    }

    pub(crate) fn migration(step: &'static str) -> impl FnOnce(SqliteError) -> Self {
        move |source| Self::Migration { step, source }
    }
}

impl From<SqliteStoreError> for StoreError {
    fn from(err: SqliteStoreError) -> Self {
        Self::backend(err)
    }
}
