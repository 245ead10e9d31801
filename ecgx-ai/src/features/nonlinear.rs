//! Nonlinear complexity measures: sample entropy and detrended fluctuation
//! analysis

use super::statistics;
use super::FeatureError;

/// Sample entropy `-ln(A / B)`
///
/// B counts pairs of length-`order` templates (N - order of them) within
/// Chebyshev distance `< tolerance`; A counts those pairs that still match
/// when extended by one sample.
pub fn sample_entropy(x: &[f64], order: usize, tolerance: f64) -> Result<f64, FeatureError> {
    let n = x.len();
    if order == 0 || n < order + 2 {
        return Err(FeatureError::SignalTooShort {
            len: n,
            min: order + 2,
        });
    }

    let templates = n - order;
    let mut matches_m: u64 = 0;
    let mut matches_m1: u64 = 0;
    for i in 0..templates {
        for j in (i + 1)..templates {
            let within = (0..order).all(|k| (x[i + k] - x[j + k]).abs() < tolerance);
            if within {
                matches_m += 1;
                if (x[i + order] - x[j + order]).abs() < tolerance {
                    matches_m1 += 1;
                }
            }
        }
    }

    if matches_m == 0 || matches_m1 == 0 {
        return Err(FeatureError::Undefined(format!(
            "sample entropy has no template matches (B={}, A={})",
            matches_m, matches_m1
        )));
    }
    Ok(-(matches_m1 as f64 / matches_m as f64).ln())
}

/// Window sizes `floor(min_n × factor^i)`, deduplicated and increasing
pub fn log_spaced_sizes(min_n: usize, max_n: f64, factor: f64) -> Vec<usize> {
    let mut sizes = vec![min_n];
    if min_n == 0 || max_n < min_n as f64 || factor <= 1.0 {
        return sizes;
    }
    let max_i = ((max_n / min_n as f64).ln() / factor.ln()).floor() as i32;
    for i in 0..=max_i {
        let size = (min_n as f64 * factor.powi(i)).floor() as usize;
        if sizes.last().is_some_and(|&last| size > last) {
            sizes.push(size);
        }
    }
    sizes
}

/// Least-squares (slope, intercept)
fn linear_fit(x: &[f64], y: &[f64]) -> (f64, f64) {
    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (&xi, &yi) in x.iter().zip(y) {
        sxy += (xi - mean_x) * (yi - mean_y);
        sxx += (xi - mean_x) * (xi - mean_x);
    }
    let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };
    (slope, mean_y - slope * mean_x)
}

/// Detrended fluctuation analysis exponent
///
/// The integrated, mean-removed series is cut into non-overlapping windows
/// of each size; each window is linearly detrended. F(n) is the RMS of the
/// residuals over all windows, and the exponent is the slope of log F(n)
/// against log n over sizes with F(n) > 0.
pub fn dfa(x: &[f64], min_window: usize, factor: f64) -> Result<f64, FeatureError> {
    let n = x.len();
    if n < min_window * 2 {
        return Err(FeatureError::SignalTooShort {
            len: n,
            min: min_window * 2,
        });
    }

    let mean = statistics::mean(x);
    let walk: Vec<f64> = x
        .iter()
        .scan(0.0, |acc, &v| {
            *acc += v - mean;
            Some(*acc)
        })
        .collect();

    let mut log_sizes = Vec::new();
    let mut log_fluctuations = Vec::new();
    for size in log_spaced_sizes(min_window, 0.1 * n as f64, factor) {
        let windows = n / size;
        if windows == 0 {
            continue;
        }
        let positions: Vec<f64> = (0..size).map(|p| p as f64).collect();
        let mut mean_square = 0.0;
        for window in walk.chunks_exact(size).take(windows) {
            let (slope, intercept) = linear_fit(&positions, window);
            let residual: f64 = window
                .iter()
                .zip(&positions)
                .map(|(&y, &p)| (y - (intercept + slope * p)).powi(2))
                .sum();
            mean_square += residual / size as f64;
        }
        let fluctuation = (mean_square / windows as f64).sqrt();
        if fluctuation > 0.0 {
            log_sizes.push((size as f64).ln());
            log_fluctuations.push(fluctuation.ln());
        }
    }

    if log_sizes.len() < 2 {
        return Err(FeatureError::Undefined(format!(
            "DFA needs at least two window sizes with non-zero fluctuation, found {}",
            log_sizes.len()
        )));
    }
    let (alpha, _) = linear_fit(&log_sizes, &log_fluctuations);
    Ok(alpha)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn uniform_noise(n: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n).map(|_| rng.gen_range(-1.0..1.0)).collect()
    }

    fn tolerance(x: &[f64]) -> f64 {
        0.2 * statistics::population_std(x, statistics::mean(x))
    }

    #[test]
    fn test_log_spaced_sizes_for_5000_samples() {
        let sizes = log_spaced_sizes(4, 500.0, 1.2);
        assert_eq!(&sizes[..6], &[4, 5, 6, 8, 9, 11]);
        assert_eq!(*sizes.last().unwrap(), 457);
        assert!(sizes.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_log_spaced_sizes_short_range() {
        assert_eq!(log_spaced_sizes(4, 3.0, 1.2), vec![4]);
    }

    #[test]
    fn test_sample_entropy_uniform_noise() {
        let x = uniform_noise(2000, 42);
        let sampen = sample_entropy(&x, 2, tolerance(&x)).unwrap();
        // -ln(r - r^2/4) with r = 0.2 * (1 / sqrt(3)) ≈ 2.19
        assert!(sampen > 1.9 && sampen < 2.5, "sampen {}", sampen);
    }

    #[test]
    fn test_sample_entropy_regular_signal_is_lower() {
        let sine: Vec<f64> = (0..2000).map(|i| (i as f64 * 0.1).sin()).collect();
        let noise = uniform_noise(2000, 3);
        let regular = sample_entropy(&sine, 2, tolerance(&sine)).unwrap();
        let irregular = sample_entropy(&noise, 2, tolerance(&noise)).unwrap();
        assert!(regular < irregular, "sine {} noise {}", regular, irregular);
    }

    #[test]
    fn test_sample_entropy_without_matches_is_error() {
        let x = [0.0, 10.0, 20.0, 30.0, 40.0, 50.0];
        assert!(matches!(
            sample_entropy(&x, 2, 0.5),
            Err(FeatureError::Undefined(_))
        ));
    }

    #[test]
    fn test_sample_entropy_zero_tolerance_is_error() {
        let x = [1.0; 50];
        assert!(sample_entropy(&x, 2, 0.0).is_err());
    }

    #[test]
    fn test_dfa_white_noise_near_half() {
        let x = uniform_noise(5000, 42);
        let alpha = dfa(&x, 4, 1.2).unwrap();
        assert!(alpha > 0.35 && alpha < 0.65, "alpha {}", alpha);
    }

    #[test]
    fn test_dfa_random_walk_near_one_and_a_half() {
        let steps = uniform_noise(5000, 9);
        let walk: Vec<f64> = steps
            .iter()
            .scan(0.0, |acc, &s| {
                *acc += s;
                Some(*acc)
            })
            .collect();
        let alpha = dfa(&walk, 4, 1.2).unwrap();
        assert!(alpha > 1.3 && alpha < 1.7, "alpha {}", alpha);
    }

    #[test]
    fn test_dfa_short_signal_is_error() {
        let x = uniform_noise(30, 1);
        assert!(dfa(&x, 4, 1.2).is_err());
    }
}
