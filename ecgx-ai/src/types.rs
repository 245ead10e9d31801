//! Core value types shared across the pipeline

use crate::ingest::IngestError;
use ndarray::{Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Number of channels in a standard 12-lead recording
pub const NUM_LEADS: usize = 12;

/// Set of diagnostic statement codes attached to one record
pub type CodeSet = BTreeSet<String>;

/// Standard ECG lead, in storage column order
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Lead {
    I,
    II,
    III,
    AVR,
    AVL,
    AVF,
    V1,
    V2,
    V3,
    V4,
    V5,
    V6,
}

impl Lead {
    /// All leads in column order
    pub const ALL: [Lead; NUM_LEADS] = [
        Lead::I,
        Lead::II,
        Lead::III,
        Lead::AVR,
        Lead::AVL,
        Lead::AVF,
        Lead::V1,
        Lead::V2,
        Lead::V3,
        Lead::V4,
        Lead::V5,
        Lead::V6,
    ];

    /// Column index in a (time × 12) matrix
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Lead> {
        Self::ALL.get(index).copied()
    }

    /// Conventional display name ("aVR", "V1", ...)
    pub fn name(self) -> &'static str {
        match self {
            Lead::I => "I",
            Lead::II => "II",
            Lead::III => "III",
            Lead::AVR => "aVR",
            Lead::AVL => "aVL",
            Lead::AVF => "aVF",
            Lead::V1 => "V1",
            Lead::V2 => "V2",
            Lead::V3 => "V3",
            Lead::V4 => "V4",
            Lead::V5 => "V5",
            Lead::V6 => "V6",
        }
    }
}

impl fmt::Display for Lead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Multi-lead recording: (time_samples × 12) matrix plus its sampling rate
///
/// Construction guarantees exactly 12 channels and at least one sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Recording {
    samples: Array2<f32>,
    sampling_rate: u32,
}

impl Recording {
    pub fn new(samples: Array2<f32>, sampling_rate: u32) -> Result<Self, IngestError> {
        let (rows, cols) = samples.dim();
        if cols != NUM_LEADS {
            return Err(IngestError::InvalidShape(format!(
                "expected {} channels, found {}",
                NUM_LEADS, cols
            )));
        }
        if rows == 0 {
            return Err(IngestError::InvalidShape("recording has no samples".to_string()));
        }
        Ok(Self {
            samples,
            sampling_rate,
        })
    }

    pub fn samples(&self) -> &Array2<f32> {
        &self.samples
    }

    pub fn into_samples(self) -> Array2<f32> {
        self.samples
    }

    pub fn sampling_rate(&self) -> u32 {
        self.sampling_rate
    }

    /// Samples per channel
    pub fn len(&self) -> usize {
        self.samples.nrows()
    }

    /// Always false for a constructed recording; provided for API symmetry
    pub fn is_empty(&self) -> bool {
        self.samples.nrows() == 0
    }

    pub fn duration_seconds(&self) -> f64 {
        if self.sampling_rate == 0 {
            return 0.0;
        }
        self.len() as f64 / self.sampling_rate as f64
    }

    pub fn lead(&self, lead: Lead) -> ArrayView1<'_, f32> {
        self.samples.index_axis(Axis(1), lead.index())
    }

    /// One channel widened to f64 for numeric work
    pub fn lead_f64(&self, lead: Lead) -> Vec<f64> {
        self.lead(lead).iter().map(|&v| v as f64).collect()
    }
}

/// Per-patient clinical inputs fed to the classifier
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PatientAttributes {
    /// Age in years (0 when missing)
    pub age: f32,
    /// 1.0 female, 0.0 male or unknown
    pub sex: f32,
}

impl PatientAttributes {
    pub fn new(age: f32, female: bool) -> Self {
        Self {
            age: if age.is_finite() && age > 0.0 { age } else { 0.0 },
            sex: if female { 1.0 } else { 0.0 },
        }
    }

    pub fn as_vector(&self) -> [f32; 2] {
        [self.age, self.sex]
    }
}
