//! Upload handlers that populate each store from its native source file.
//!
//! # Responsibility
//! - Load annotation and metadata CSV files into the relational store.
//! - Load IIIF collection JSON into the triplestore.
//!
//! # Invariants
//! - `upload_data` never panics and never returns an error; failures are
//!   logged and reported as `false`.
//! - Re-uploading the same file does not duplicate relational rows.

use crate::db::DbError;
use crate::repo::fragment::BackendKind;
use crate::repo::query::Processor;
use crate::repo::sparql::SparqlError;
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::time::Instant;

pub mod collection;
pub mod relational;

pub type IngestResult<T> = Result<T, IngestError>;

/// Upload failure for any backend.
#[derive(Debug)]
pub enum IngestError {
    NotConfigured(BackendKind),
    Io(std::io::Error),
    Csv(csv::Error),
    Json(serde_json::Error),
    Db(DbError),
    Sparql(SparqlError),
    /// Source file parsed but violates the expected shape.
    InvalidData(String),
}

impl Display for IngestError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotConfigured(backend) => {
                write!(f, "{backend} upload has no database path or url configured")
            }
            Self::Io(err) => write!(f, "{err}"),
            Self::Csv(err) => write!(f, "{err}"),
            Self::Json(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Sparql(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid source data: {message}"),
        }
    }
}

impl Error for IngestError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Csv(err) => Some(err),
            Self::Json(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Sparql(err) => Some(err),
            Self::NotConfigured(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<std::io::Error> for IngestError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<csv::Error> for IngestError {
    fn from(value: csv::Error) -> Self {
        Self::Csv(value)
    }
}

impl From<serde_json::Error> for IngestError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<DbError> for IngestError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for IngestError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<SparqlError> for IngestError {
    fn from(value: SparqlError) -> Self {
        Self::Sparql(value)
    }
}

/// Upload side of the backend contract.
pub trait UploadHandler: Processor {
    /// Stable handler name used in log events.
    fn handler_name(&self) -> &'static str;

    /// Loads `path` into the configured store, returning the number of
    /// records written.
    fn try_upload_data(&self, path: &Path) -> IngestResult<usize>;

    /// Loads `path`, reporting success as a boolean.
    ///
    /// # Side effects
    /// - Emits one `upload` event with status, record count or error.
    fn upload_data(&self, path: &Path) -> bool {
        let started_at = Instant::now();
        match self.try_upload_data(path) {
            Ok(records) => {
                info!(
                    "event=upload module=ingest status=ok handler={} records={} duration_ms={}",
                    self.handler_name(),
                    records,
                    started_at.elapsed().as_millis()
                );
                true
            }
            Err(err) => {
                error!(
                    "event=upload module=ingest status=error handler={} duration_ms={} error={}",
                    self.handler_name(),
                    started_at.elapsed().as_millis(),
                    err
                );
                false
            }
        }
    }
}

/// Normalizes a source cell: trims and maps blank cells to `None`.
pub(crate) fn normalize_cell(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
