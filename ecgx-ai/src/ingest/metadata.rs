//! Metadata table (PTB-XL `ptbxl_metadata.csv` layout)
//!
//! Only the columns used by the pipeline are read; everything else in the
//! table is ignored. Missing columns deserialize as absent values.

use super::DatasetError;
use crate::labels;
use crate::types::{CodeSet, PatientAttributes};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

/// Which filename column serves a given sampling rate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilenameColumn {
    /// `filename_lr` (100 Hz records)
    LowRate,
    /// `filename_hr` (500 Hz records)
    HighRate,
}

impl FilenameColumn {
    pub fn for_rate(sampling_rate: u32) -> Result<Self, DatasetError> {
        match sampling_rate {
            100 => Ok(FilenameColumn::LowRate),
            500 => Ok(FilenameColumn::HighRate),
            other => Err(DatasetError::UnsupportedSamplingRate(other)),
        }
    }

    pub fn column_name(self) -> &'static str {
        match self {
            FilenameColumn::LowRate => "filename_lr",
            FilenameColumn::HighRate => "filename_hr",
        }
    }
}

/// One metadata row
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetadataRow {
    /// Zero-based position in the table
    #[serde(skip)]
    pub row_index: usize,

    #[serde(default)]
    pub ecg_id: Option<String>,

    #[serde(default)]
    pub age: Option<String>,

    #[serde(default)]
    pub sex: Option<String>,

    #[serde(default)]
    pub scp_codes: Option<String>,

    #[serde(default)]
    pub filename_lr: Option<String>,

    #[serde(default)]
    pub filename_hr: Option<String>,
}

impl MetadataRow {
    /// Record identifier for logs: `ecg_id` when present, else the row index
    pub fn id(&self) -> String {
        non_empty(self.ecg_id.as_deref())
            .map(str::to_string)
            .unwrap_or_else(|| format!("row {}", self.row_index))
    }

    /// Record path (relative to the dataset root, no extension)
    pub fn filename(&self, column: FilenameColumn) -> Option<&str> {
        let value = match column {
            FilenameColumn::LowRate => self.filename_lr.as_deref(),
            FilenameColumn::HighRate => self.filename_hr.as_deref(),
        };
        non_empty(value)
    }

    /// Age in years; 0 when missing, unparseable, non-finite or negative
    pub fn age(&self) -> f32 {
        non_empty(self.age.as_deref())
            .and_then(|raw| raw.parse::<f32>().ok())
            .filter(|age| age.is_finite() && *age >= 0.0)
            .unwrap_or(0.0)
    }

    /// True for `F`/`female` (any case) or the numeric code `1`
    pub fn is_female(&self) -> bool {
        match non_empty(self.sex.as_deref()) {
            Some(raw) => {
                raw.eq_ignore_ascii_case("f")
                    || raw.eq_ignore_ascii_case("female")
                    || raw.parse::<f64>().map(|v| v == 1.0).unwrap_or(false)
            }
            None => false,
        }
    }

    pub fn attributes(&self) -> PatientAttributes {
        PatientAttributes::new(self.age(), self.is_female())
    }

    /// Diagnostic codes; empty when the field is missing or malformed
    pub fn scp_codes(&self) -> CodeSet {
        labels::codes_or_empty(self.scp_codes.as_deref())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Parsed metadata table
#[derive(Debug, Clone, Default)]
pub struct MetadataTable {
    rows: Vec<MetadataRow>,
}

impl MetadataTable {
    pub fn load(path: &Path) -> Result<Self, DatasetError> {
        let file = std::fs::File::open(path).map_err(|source| DatasetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::from_reader(file)
            .map_err(|e| DatasetError::Metadata(format!("{}: {}", path.display(), e)))?;
        tracing::debug!(path = %path.display(), rows = table.len(), "Loaded metadata table");
        Ok(table)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, csv::Error> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let mut rows = Vec::new();
        for (row_index, result) in csv_reader.deserialize::<MetadataRow>().enumerate() {
            let mut row = result?;
            row.row_index = row_index;
            rows.push(row);
        }
        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[MetadataRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl From<Vec<MetadataRow>> for MetadataTable {
    fn from(mut rows: Vec<MetadataRow>) -> Self {
        for (index, row) in rows.iter_mut().enumerate() {
            row.row_index = index;
        }
        Self { rows }
    }
}
