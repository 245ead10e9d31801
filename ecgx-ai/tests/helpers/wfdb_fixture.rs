//! WFDB Dataset Fixture Generator
//!
//! Writes synthetic PTB-XL style datasets: format-16 record pairs, a RECORDS
//! manifest and a metadata CSV, all inside a temporary directory.

use ecgx_ai::ingest::LoaderSettings;
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// ADC units per mV in generated headers
pub const FIXTURE_GAIN: f64 = 1000.0;

/// One metadata row as written to the CSV
#[derive(Debug, Clone, Default)]
pub struct MetadataFixture {
    pub ecg_id: String,
    pub age: String,
    pub sex: String,
    pub scp_codes: String,
    pub filename: String,
}

/// Synthetic multi-lead signal: a per-lead sine plus a little noise, in mV
pub fn synthetic_ecg(samples: usize, leads: usize, sampling_rate: u32, seed: u64) -> Array2<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    Array2::from_shape_fn((samples, leads), |(t, c)| {
        let time = t as f32 / sampling_rate as f32;
        let freq = 1.0 + c as f32 * 0.25;
        0.8 * (2.0 * std::f32::consts::PI * freq * time).sin() + rng.gen_range(-0.05..0.05)
    })
}

/// Write `<record>.hea` and `<record>.dat` (format 16, shared data file)
pub fn write_record(record: &Path, samples: &Array2<f32>, sampling_rate: u32) -> anyhow::Result<()> {
    if let Some(parent) = record.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let name = record
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| anyhow::anyhow!("record path has no file name"))?;
    let (rows, cols) = samples.dim();

    let mut header = format!("{} {} {} {}\n", name, cols, sampling_rate, rows);
    for c in 0..cols {
        header.push_str(&format!(
            "{}.dat 16 {}(0)/mV 16 0 0 0 0 lead{}\n",
            name, FIXTURE_GAIN, c
        ));
    }
    std::fs::write(record.with_file_name(format!("{}.hea", name)), header)?;

    let mut bytes = Vec::with_capacity(rows * cols * 2);
    for row in samples.rows() {
        for &value in row {
            let digital = (value as f64 * FIXTURE_GAIN).round() as i16;
            bytes.extend_from_slice(&digital.to_le_bytes());
        }
    }
    std::fs::write(record.with_file_name(format!("{}.dat", name)), bytes)?;
    Ok(())
}

/// Dataset directory under construction
pub struct DatasetFixture {
    dir: TempDir,
    sampling_rate: u32,
    manifest: Vec<String>,
    rows: Vec<MetadataFixture>,
}

impl DatasetFixture {
    pub fn new(sampling_rate: u32) -> anyhow::Result<Self> {
        Ok(Self {
            dir: TempDir::new()?,
            sampling_rate,
            manifest: Vec::new(),
            rows: Vec::new(),
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Manifest path of record `id` (relative, no extension)
    pub fn record_name(&self, id: &str) -> String {
        let suffix = if self.sampling_rate == 100 { "lr" } else { "hr" };
        format!("records{}/00000/{}_{}", self.sampling_rate, id, suffix)
    }

    fn row(&self, id: &str, codes: &str, filename: String) -> MetadataFixture {
        MetadataFixture {
            ecg_id: id.to_string(),
            age: "56".to_string(),
            sex: "1".to_string(),
            scp_codes: codes.to_string(),
            filename,
        }
    }

    /// Listed in the manifest, written to disk, referenced by metadata
    pub fn add_record(&mut self, id: &str, samples: &Array2<f32>, codes: &str) -> anyhow::Result<()> {
        let name = self.record_name(id);
        write_record(&self.dir.path().join(&name), samples, self.sampling_rate)?;
        self.manifest.push(name.clone());
        self.rows.push(self.row(id, codes, name));
        Ok(())
    }

    /// Listed and referenced, but no files on disk
    pub fn add_missing_record(&mut self, id: &str) {
        let name = self.record_name(id);
        self.manifest.push(name.clone());
        self.rows.push(self.row(id, "{'NORM': 100.0}", name));
    }

    /// Written and referenced, but absent from the manifest
    pub fn add_unlisted_record(&mut self, id: &str, samples: &Array2<f32>) -> anyhow::Result<()> {
        let name = self.record_name(id);
        write_record(&self.dir.path().join(&name), samples, self.sampling_rate)?;
        self.rows.push(self.row(id, "{'NORM': 100.0}", name));
        Ok(())
    }

    /// Metadata row with an empty filename field
    pub fn add_row_without_filename(&mut self, id: &str) {
        self.rows.push(self.row(id, "{'NORM': 100.0}", String::new()));
    }

    pub fn push_row(&mut self, row: MetadataFixture) {
        self.rows.push(row);
    }

    pub fn push_manifest_entry(&mut self, name: impl Into<String>) {
        self.manifest.push(name.into());
    }

    /// Write RECORDS and ptbxl_metadata.csv
    pub fn finish(&self) -> anyhow::Result<PathBuf> {
        let mut manifest = self.manifest.join("\n");
        manifest.push('\n');
        std::fs::write(self.dir.path().join("RECORDS"), manifest)?;

        let mut writer = csv::Writer::from_path(self.dir.path().join("ptbxl_metadata.csv"))?;
        writer.write_record(["ecg_id", "age", "sex", "scp_codes", "filename_lr", "filename_hr"])?;
        for row in &self.rows {
            let (lr, hr) = if self.sampling_rate == 100 {
                (row.filename.as_str(), "")
            } else {
                ("", row.filename.as_str())
            };
            writer.write_record([
                row.ecg_id.as_str(),
                row.age.as_str(),
                row.sex.as_str(),
                row.scp_codes.as_str(),
                lr,
                hr,
            ])?;
        }
        writer.flush()?;
        Ok(self.dir.path().to_path_buf())
    }

    pub fn loader_settings(&self, duration_seconds: u32) -> LoaderSettings {
        LoaderSettings::new(self.dir.path(), self.sampling_rate, duration_seconds)
    }
}
