//! Morphological summary statistics

/// Mean, population standard deviation, maximum and minimum
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SummaryStats {
    pub mean: f64,
    pub std: f64,
    pub max: f64,
    pub min: f64,
}

/// Caller guarantees a non-empty, finite slice
pub fn summary(x: &[f64]) -> SummaryStats {
    let n = x.len() as f64;
    let mean = x.iter().sum::<f64>() / n;
    SummaryStats {
        mean,
        std: population_std(x, mean),
        max: x.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        min: x.iter().copied().fold(f64::INFINITY, f64::min),
    }
}

pub fn mean(x: &[f64]) -> f64 {
    x.iter().sum::<f64>() / x.len() as f64
}

/// Standard deviation with divisor N
pub fn population_std(x: &[f64], mean: f64) -> f64 {
    let variance = x.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / x.len() as f64;
    variance.sqrt()
}
