//! Welch power spectral density and spectral entropy
//!
//! Segments of `nperseg` samples (256, or the whole signal when shorter) with
//! 50% overlap are mean-detrended, weighted by a periodic Hann window and
//! transformed; one-sided density spectra are averaged across segments.

use super::{shannon_entropy, FeatureError};
use realfft::RealFftPlanner;
use std::f64::consts::PI;

/// Default Welch segment length
pub const DEFAULT_SEGMENT_LEN: usize = 256;

/// One-sided power spectral density estimate
#[derive(Debug, Clone, PartialEq)]
pub struct PowerSpectrum {
    pub frequencies: Vec<f64>,
    pub density: Vec<f64>,
}

/// Periodic Hann window of length `len`
pub fn hann_periodic(len: usize) -> Vec<f64> {
    if len == 1 {
        return vec![1.0];
    }
    (0..len)
        .map(|n| 0.5 - 0.5 * (2.0 * PI * n as f64 / len as f64).cos())
        .collect()
}

/// Welch estimate with `segment_len` capped at the signal length
pub fn welch(
    x: &[f64],
    sampling_rate: f64,
    segment_len: usize,
) -> Result<PowerSpectrum, FeatureError> {
    if x.is_empty() || segment_len == 0 {
        return Err(FeatureError::SignalTooShort { len: x.len(), min: 1 });
    }
    let nperseg = segment_len.min(x.len());
    let noverlap = nperseg / 2;
    let step = nperseg - noverlap;
    let num_segments = (x.len() - noverlap) / step;

    let window = hann_periodic(nperseg);
    let window_power: f64 = window.iter().map(|w| w * w).sum();
    let scale = 1.0 / (sampling_rate * window_power);

    let mut planner = RealFftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(nperseg);
    let mut input = fft.make_input_vec();
    let mut spectrum = fft.make_output_vec();
    let bins = spectrum.len();
    let mut density = vec![0.0; bins];

    for segment in 0..num_segments {
        let chunk = &x[segment * step..segment * step + nperseg];
        let chunk_mean = chunk.iter().sum::<f64>() / nperseg as f64;
        for ((slot, &v), &w) in input.iter_mut().zip(chunk).zip(&window) {
            *slot = (v - chunk_mean) * w;
        }
        fft.process(&mut input, &mut spectrum)
            .map_err(|e| FeatureError::Computation(format!("FFT failed: {}", e)))?;
        for (acc, c) in density.iter_mut().zip(&spectrum) {
            *acc += c.norm_sqr() * scale;
        }
    }

    // One-sided: double every bin except DC and, for even lengths, Nyquist
    let last_doubled = if nperseg % 2 == 0 { bins - 1 } else { bins };
    for value in density.iter_mut().take(last_doubled).skip(1) {
        *value *= 2.0;
    }
    for value in density.iter_mut() {
        *value /= num_segments as f64;
    }

    let frequencies = (0..bins)
        .map(|k| k as f64 * sampling_rate / nperseg as f64)
        .collect();
    Ok(PowerSpectrum {
        frequencies,
        density,
    })
}

/// Shannon entropy (bits) of the normalized Welch spectrum
pub fn spectral_entropy(
    x: &[f64],
    sampling_rate: f64,
    segment_len: usize,
) -> Result<f64, FeatureError> {
    let spectrum = welch(x, sampling_rate, segment_len)?;
    shannon_entropy(&spectrum.density, "power spectrum")
}
