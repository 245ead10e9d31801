//! Record ingestion
//!
//! Resolves metadata rows to WFDB record files, validates them against the
//! record manifest, decodes the signal matrix and assembles datasets while
//! skipping (and counting) records that cannot be used.

pub mod ingestor;
pub mod loader;
pub mod manifest;
pub mod metadata;
pub mod wfdb;

pub use ingestor::SignalIngestor;
pub use loader::{DatasetLoader, IngestReport, LoaderSettings};
pub use manifest::RecordManifest;
pub use metadata::{FilenameColumn, MetadataRow, MetadataTable};

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Per-record ingestion failure (non-fatal: the record is skipped)
#[derive(Debug, Error)]
pub enum IngestError {
    /// Filename field empty or record file absent on disk
    #[error("Missing record file: {0}")]
    MissingFile(String),

    /// Filename not listed in the record manifest
    #[error("Record not in manifest: {0}")]
    UnknownRecord(String),

    /// Header or signal data could not be read or decoded
    #[error("Parse error in {path}: {reason}")]
    Parse { path: String, reason: String },

    /// Decoded matrix is not (samples × 12) with samples > 0
    #[error("Invalid signal shape: {0}")]
    InvalidShape(String),
}

impl IngestError {
    pub fn kind(&self) -> IngestErrorKind {
        match self {
            IngestError::MissingFile(_) => IngestErrorKind::MissingFile,
            IngestError::UnknownRecord(_) => IngestErrorKind::UnknownRecord,
            IngestError::Parse { .. } => IngestErrorKind::Parse,
            IngestError::InvalidShape(_) => IngestErrorKind::InvalidShape,
        }
    }
}

/// Skip reason used for tallies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestErrorKind {
    MissingFile,
    UnknownRecord,
    Parse,
    InvalidShape,
}

impl fmt::Display for IngestErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IngestErrorKind::MissingFile => "missing_file",
            IngestErrorKind::UnknownRecord => "unknown_record",
            IngestErrorKind::Parse => "parse",
            IngestErrorKind::InvalidShape => "invalid_shape",
        };
        f.write_str(name)
    }
}

/// Dataset-level failure (fatal for the run)
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("Unsupported sampling rate {0} Hz (expected 100 or 500)")]
    UnsupportedSamplingRate(u32),

    /// Every record was skipped
    #[error("no valid ECG records found")]
    Empty,

    #[error("Inconsistent dataset: {0}")]
    Inconsistent(String),
}
