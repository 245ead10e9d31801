//! Single-channel waveform features
//!
//! [`FeatureExtractor::extract`] produces a fixed, ordered [`FeatureVector`]:
//! summary statistics, wavelet entropy, spectral entropy, sample entropy and
//! the DFA exponent. Extraction is pure; one extractor can serve any number of
//! threads.

pub mod nonlinear;
pub mod spectral;
pub mod statistics;
pub mod wavelet;

use crate::types::{Lead, Recording};
use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

/// Added inside the logarithm of every entropy term
pub const ENTROPY_EPSILON: f64 = 1e-8;

#[derive(Debug, Error, PartialEq)]
pub enum FeatureError {
    #[error("Signal too short: {len} samples (need at least {min})")]
    SignalTooShort { len: usize, min: usize },

    #[error("Non-finite sample at index {0}")]
    NonFinite(usize),

    /// Total energy is zero, so relative energies are undefined
    #[error("Zero total energy in {0}")]
    ZeroEnergy(&'static str),

    #[error("Feature undefined: {0}")]
    Undefined(String),

    #[error("Computation failed: {0}")]
    Computation(String),

    #[error("Invalid extractor parameter: {0}")]
    InvalidParameter(String),
}

/// `-Σ p·log2(p + ε)` over the normalized weights
pub(crate) fn shannon_entropy(weights: &[f64], what: &'static str) -> Result<f64, FeatureError> {
    let total: f64 = weights.iter().sum();
    if total <= 0.0 || !total.is_finite() {
        return Err(FeatureError::ZeroEnergy(what));
    }
    Ok(-weights
        .iter()
        .map(|w| {
            let p = w / total;
            p * (p + ENTROPY_EPSILON).log2()
        })
        .sum::<f64>())
}

/// Ordered feature values for one channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureVector {
    pub mean: f64,
    pub std: f64,
    pub max: f64,
    pub min: f64,
    pub wavelet_entropy: f64,
    pub spectral_entropy: f64,
    pub sample_entropy: f64,
    pub dfa_alpha: f64,
}

impl FeatureVector {
    pub const LEN: usize = 8;

    pub const NAMES: [&'static str; Self::LEN] = [
        "mean",
        "std",
        "max",
        "min",
        "wavelet_entropy",
        "spectral_entropy",
        "sample_entropy",
        "dfa_alpha",
    ];

    pub fn to_array(&self) -> [f64; Self::LEN] {
        [
            self.mean,
            self.std,
            self.max,
            self.min,
            self.wavelet_entropy,
            self.spectral_entropy,
            self.sample_entropy,
            self.dfa_alpha,
        ]
    }
}

/// Features for one lead of a recording
#[derive(Debug)]
pub struct LeadFeatures {
    pub lead: Lead,
    pub features: Result<FeatureVector, FeatureError>,
}

/// Feature extractor with fixed reference parameters
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    sampling_rate: f64,
    wavelet_level: usize,
    welch_segment_len: usize,
    sampen_order: usize,
    sampen_tolerance_ratio: f64,
    dfa_min_window: usize,
    dfa_growth_factor: f64,
}

impl FeatureExtractor {
    /// Daubechies-4 / 4 levels, Welch segments of 256, sample entropy order 2
    /// at 0.2 × std, DFA windows from 4 growing by 1.2
    pub fn new(sampling_rate: u32) -> Self {
        Self {
            sampling_rate: sampling_rate as f64,
            wavelet_level: 4,
            welch_segment_len: spectral::DEFAULT_SEGMENT_LEN,
            sampen_order: 2,
            sampen_tolerance_ratio: 0.2,
            dfa_min_window: 4,
            dfa_growth_factor: 1.2,
        }
    }

    pub fn with_wavelet_level(mut self, level: usize) -> Result<Self, FeatureError> {
        if level == 0 {
            return Err(FeatureError::InvalidParameter(
                "wavelet level must be >= 1".to_string(),
            ));
        }
        self.wavelet_level = level;
        Ok(self)
    }

    pub fn with_welch_segment_len(mut self, len: usize) -> Result<Self, FeatureError> {
        if len < 2 {
            return Err(FeatureError::InvalidParameter(
                "Welch segment length must be >= 2".to_string(),
            ));
        }
        self.welch_segment_len = len;
        Ok(self)
    }

    pub fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }

    pub fn extract(&self, x: &[f64]) -> Result<FeatureVector, FeatureError> {
        if x.is_empty() {
            return Err(FeatureError::SignalTooShort { len: 0, min: 1 });
        }
        if let Some(index) = x.iter().position(|v| !v.is_finite()) {
            return Err(FeatureError::NonFinite(index));
        }

        let stats = statistics::summary(x);
        let wavelet_entropy = wavelet::wavelet_entropy(x, self.wavelet_level)?;
        let spectral_entropy =
            spectral::spectral_entropy(x, self.sampling_rate, self.welch_segment_len)?;
        let sample_entropy = nonlinear::sample_entropy(
            x,
            self.sampen_order,
            self.sampen_tolerance_ratio * stats.std,
        )?;
        let dfa_alpha = nonlinear::dfa(x, self.dfa_min_window, self.dfa_growth_factor)?;

        Ok(FeatureVector {
            mean: stats.mean,
            std: stats.std,
            max: stats.max,
            min: stats.min,
            wavelet_entropy,
            spectral_entropy,
            sample_entropy,
            dfa_alpha,
        })
    }

    pub fn extract_lead(
        &self,
        recording: &Recording,
        lead: Lead,
    ) -> Result<FeatureVector, FeatureError> {
        self.extract(&recording.lead_f64(lead))
    }

    /// All 12 leads in parallel; each lead succeeds or fails independently
    pub fn extract_all_leads(&self, recording: &Recording) -> Vec<LeadFeatures> {
        let results: Vec<LeadFeatures> = Lead::ALL
            .par_iter()
            .map(|&lead| LeadFeatures {
                lead,
                features: self.extract_lead(recording, lead),
            })
            .collect();
        let failed = results.iter().filter(|r| r.features.is_err()).count();
        debug!(failed, "Extracted features for {} leads", results.len());
        results
    }
}
