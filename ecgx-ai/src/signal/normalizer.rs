//! Fixed-length, per-channel standardized recordings
//!
//! Every recording is cut or zero-padded at the tail to the target length,
//! then each channel is shifted to zero mean and scaled to unit (population)
//! standard deviation. Statistics are accumulated in f64.

use crate::ingest::IngestError;
use crate::types::Recording;
use ndarray::{s, Array2, Axis};

/// Added to the channel standard deviation before dividing
pub const STD_EPSILON: f64 = 1e-8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Normalizer {
    target_len: usize,
}

impl Normalizer {
    pub fn new(target_len: usize) -> Result<Self, IngestError> {
        if target_len == 0 {
            return Err(IngestError::InvalidShape(
                "target length must be positive".to_string(),
            ));
        }
        Ok(Self { target_len })
    }

    /// Target length `seconds × rate`
    pub fn for_duration(seconds: u32, sampling_rate: u32) -> Result<Self, IngestError> {
        Self::new(seconds as usize * sampling_rate as usize)
    }

    pub fn target_len(&self) -> usize {
        self.target_len
    }

    /// Truncate to the leading `target_len` samples or zero-pad at the tail
    pub fn fit_length(&self, samples: &Array2<f32>) -> Array2<f32> {
        let (rows, cols) = samples.dim();
        if rows == self.target_len {
            return samples.clone();
        }
        let mut fitted = Array2::<f32>::zeros((self.target_len, cols));
        let keep = rows.min(self.target_len);
        fitted
            .slice_mut(s![..keep, ..])
            .assign(&samples.slice(s![..keep, ..]));
        fitted
    }

    /// `(x - mean) / (std + 1e-8)` per channel
    pub fn standardize(&self, samples: &Array2<f32>) -> Array2<f32> {
        let mut out = samples.clone();
        let n = samples.nrows();
        if n == 0 {
            return out;
        }
        for mut column in out.axis_iter_mut(Axis(1)) {
            let mean = column.iter().map(|&v| v as f64).sum::<f64>() / n as f64;
            let variance = column
                .iter()
                .map(|&v| {
                    let d = v as f64 - mean;
                    d * d
                })
                .sum::<f64>()
                / n as f64;
            let scale = variance.sqrt() + STD_EPSILON;
            column.mapv_inplace(|v| ((v as f64 - mean) / scale) as f32);
        }
        out
    }

    /// Length fitting only, amplitudes untouched
    pub fn fit_recording(&self, recording: &Recording) -> Result<Recording, IngestError> {
        Recording::new(self.fit_length(recording.samples()), recording.sampling_rate())
    }

    /// Length fitting followed by standardization
    pub fn normalize(&self, recording: &Recording) -> Result<Recording, IngestError> {
        let fitted = self.fit_length(recording.samples());
        Recording::new(self.standardize(&fitted), recording.sampling_rate())
    }
}
