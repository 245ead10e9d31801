//! Single-record ingestion: metadata row → validated (samples × 12) recording

use super::metadata::{FilenameColumn, MetadataRow};
use super::wfdb::{self, WfdbError};
use super::{DatasetError, IngestError, RecordManifest};
use crate::types::Recording;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Resolves and decodes records below a dataset root
///
/// Stateless apart from its configuration; safe to share across threads.
#[derive(Debug, Clone)]
pub struct SignalIngestor {
    base_dir: PathBuf,
    manifest: RecordManifest,
    sampling_rate: u32,
    column: FilenameColumn,
}

impl SignalIngestor {
    /// Fails for sampling rates without a filename column (only 100 and 500 Hz)
    pub fn new(
        base_dir: impl Into<PathBuf>,
        manifest: RecordManifest,
        sampling_rate: u32,
    ) -> Result<Self, DatasetError> {
        let column = FilenameColumn::for_rate(sampling_rate)?;
        Ok(Self {
            base_dir: base_dir.into(),
            manifest,
            sampling_rate,
            column,
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn sampling_rate(&self) -> u32 {
        self.sampling_rate
    }

    pub fn column(&self) -> FilenameColumn {
        self.column
    }

    /// Ingest the record referenced by a metadata row
    pub fn ingest(&self, row: &MetadataRow) -> Result<Recording, IngestError> {
        let filename = row.filename(self.column).ok_or_else(|| {
            IngestError::MissingFile(format!(
                "{}: empty {} field",
                row.id(),
                self.column.column_name()
            ))
        })?;
        self.ingest_filename(filename)
    }

    /// Ingest a record by its manifest path (relative, no extension)
    pub fn ingest_filename(&self, filename: &str) -> Result<Recording, IngestError> {
        if !self.manifest.contains(filename) {
            return Err(IngestError::UnknownRecord(filename.to_string()));
        }

        let record_path = self.base_dir.join(filename);
        for required in [wfdb::header_path(&record_path), wfdb::data_path(&record_path)] {
            if !required.is_file() {
                return Err(IngestError::MissingFile(required.display().to_string()));
            }
        }

        let (header, samples) = wfdb::read_record(&record_path).map_err(|e| match e {
            WfdbError::Io(io) if io.kind() == std::io::ErrorKind::NotFound => {
                IngestError::MissingFile(format!("{}: {}", record_path.display(), io))
            }
            other => IngestError::Parse {
                path: record_path.display().to_string(),
                reason: other.to_string(),
            },
        })?;

        if (header.sampling_frequency - self.sampling_rate as f64).abs() > f64::EPSILON {
            warn!(
                record = filename,
                header_rate = header.sampling_frequency,
                expected_rate = self.sampling_rate,
                "Header sampling rate differs from configured rate"
            );
        }

        let recording = Recording::new(samples, self.sampling_rate)?;
        debug!(record = filename, samples = recording.len(), "Ingested record");
        Ok(recording)
    }
}
