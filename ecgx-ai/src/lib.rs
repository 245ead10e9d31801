//! ecgx-ai library interface
//!
//! 12-lead ECG analysis core: record ingestion and normalization, label
//! encoding, waveform features, clinical risk scores, the multimodal
//! classifier's architecture description, and the reasoning report.

pub mod dataset;
pub mod features;
pub mod feedback;
pub mod ingest;
pub mod labels;
pub mod model;
pub mod report;
pub mod risk;
pub mod signal;
pub mod types;

pub use crate::types::{CodeSet, Lead, PatientAttributes, Recording, NUM_LEADS};
