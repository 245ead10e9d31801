//! Dataset assembly: metadata table + manifest → normalized, labelled records
//!
//! Records are ingested in parallel. Failures never abort the run: each one is
//! logged with its record id and reason and tallied by kind. Only a run with
//! zero surviving records fails.

use super::{
    DatasetError, IngestError, IngestErrorKind, MetadataTable, RecordManifest, SignalIngestor,
};
use crate::dataset::{Dataset, DatasetRecord};
use crate::signal::Normalizer;
use ecgx_common::config::Settings;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{info, warn};

/// Metadata table file name inside the dataset root
pub const DEFAULT_METADATA_FILE: &str = "ptbxl_metadata.csv";

/// Record manifest file name inside the dataset root
pub const DEFAULT_MANIFEST_FILE: &str = "RECORDS";

/// Inputs for one dataset load
#[derive(Debug, Clone, PartialEq)]
pub struct LoaderSettings {
    pub dataset_dir: PathBuf,
    pub metadata_file: String,
    pub manifest_file: String,
    pub sampling_rate: u32,
    pub duration_seconds: u32,
}

impl LoaderSettings {
    pub fn new(dataset_dir: impl Into<PathBuf>, sampling_rate: u32, duration_seconds: u32) -> Self {
        Self {
            dataset_dir: dataset_dir.into(),
            metadata_file: DEFAULT_METADATA_FILE.to_string(),
            manifest_file: DEFAULT_MANIFEST_FILE.to_string(),
            sampling_rate,
            duration_seconds,
        }
    }

    /// Requires a configured dataset directory
    pub fn from_settings(settings: &Settings) -> ecgx_common::Result<Self> {
        let dir = settings.require_dataset_dir()?;
        Ok(Self::new(
            dir,
            settings.loader.sampling_rate,
            settings.loader.duration_seconds,
        ))
    }

    pub fn with_metadata_file(mut self, name: impl Into<String>) -> Self {
        self.metadata_file = name.into();
        self
    }

    pub fn with_manifest_file(mut self, name: impl Into<String>) -> Self {
        self.manifest_file = name.into();
        self
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.dataset_dir.join(&self.metadata_file)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.dataset_dir.join(&self.manifest_file)
    }
}

/// Outcome tally for one load
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub total: usize,
    pub loaded: usize,
    pub skipped: BTreeMap<IngestErrorKind, usize>,
}

impl IngestReport {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    pub fn record_skip(&mut self, kind: IngestErrorKind) {
        *self.skipped.entry(kind).or_insert(0) += 1;
    }

    pub fn skipped_total(&self) -> usize {
        self.skipped.values().sum()
    }

    pub fn skipped_of(&self, kind: IngestErrorKind) -> usize {
        self.skipped.get(&kind).copied().unwrap_or(0)
    }
}

pub struct DatasetLoader {
    settings: LoaderSettings,
}

impl DatasetLoader {
    pub fn new(settings: LoaderSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &LoaderSettings {
        &self.settings
    }

    /// Build an ingestor for this dataset root (loads the manifest)
    pub fn ingestor(&self) -> Result<SignalIngestor, DatasetError> {
        let manifest = RecordManifest::load(&self.settings.manifest_path())?;
        SignalIngestor::new(
            &self.settings.dataset_dir,
            manifest,
            self.settings.sampling_rate,
        )
    }

    /// Load, normalize and label every usable record
    pub fn load(&self) -> Result<Dataset, DatasetError> {
        let table = MetadataTable::load(&self.settings.metadata_path())?;
        let ingestor = self.ingestor()?;
        let normalizer =
            Normalizer::for_duration(self.settings.duration_seconds, self.settings.sampling_rate)
                .map_err(|e| DatasetError::Inconsistent(e.to_string()))?;

        info!(
            "Loading {} records from {} at {} Hz",
            table.len(),
            self.settings.dataset_dir.display(),
            self.settings.sampling_rate
        );

        let outcomes: Vec<Result<DatasetRecord, IngestError>> = table
            .rows()
            .par_iter()
            .map(|row| {
                let recording = ingestor.ingest(row)?;
                Ok(DatasetRecord {
                    id: row.id(),
                    recording: normalizer.normalize(&recording)?,
                    attributes: row.attributes(),
                    codes: row.scp_codes(),
                })
            })
            .collect();

        let mut report = IngestReport::new(table.len());
        let mut records = Vec::with_capacity(outcomes.len());
        for (row, outcome) in table.rows().iter().zip(outcomes) {
            match outcome {
                Ok(record) => {
                    report.loaded += 1;
                    records.push(record);
                }
                Err(e) => {
                    warn!(kind = %e.kind(), "Skipping record {}: {}", row.id(), e);
                    report.record_skip(e.kind());
                }
            }
        }

        info!(
            "Loaded {} of {} records ({} skipped)",
            report.loaded,
            report.total,
            report.skipped_total()
        );

        Dataset::from_records(records, report)
    }
}
