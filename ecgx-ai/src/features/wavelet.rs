//! Daubechies-4 multilevel decomposition and wavelet entropy
//!
//! Each level convolves the current approximation with the decomposition
//! filters over a symmetrically extended signal (`... x1 x0 | x0 x1 ... xn-1 |
//! xn-1 xn-2 ...`) and keeps every second output starting at index 1, giving
//! `floor((N + 7) / 2)` coefficients per band.

use super::{shannon_entropy, FeatureError};

/// db4 low-pass decomposition filter
pub const DB4_DEC_LO: [f64; 8] = [
    -0.010597401784997278,
    0.032883011666982945,
    0.030841381835986965,
    -0.18703481171888114,
    -0.02798376941698385,
    0.6308807679295904,
    0.7148465705525415,
    0.23037781330885523,
];

/// db4 high-pass decomposition filter
pub const DB4_DEC_HI: [f64; 8] = [
    -0.23037781330885523,
    0.7148465705525415,
    -0.6308807679295904,
    -0.02798376941698385,
    0.18703481171888114,
    0.030841381835986965,
    -0.032883011666982945,
    -0.010597401784997278,
];

/// Symmetric (half-sample) extension index into `0..n`
fn reflect(index: isize, n: usize) -> usize {
    let period = 2 * n as isize;
    let m = index.rem_euclid(period) as usize;
    if m < n {
        m
    } else {
        2 * n - 1 - m
    }
}

/// Filter and downsample by two
fn downsample_convolve(x: &[f64], filter: &[f64]) -> Vec<f64> {
    let n = x.len();
    let f = filter.len();
    let out_len = (n + f - 1) / 2;
    (0..out_len)
        .map(|o| {
            let i = (2 * o + 1) as isize;
            filter
                .iter()
                .enumerate()
                .map(|(j, &tap)| tap * x[reflect(i - j as isize, n)])
                .sum()
        })
        .collect()
}

/// Single-level transform: (approximation, detail)
pub fn dwt(x: &[f64]) -> (Vec<f64>, Vec<f64>) {
    (
        downsample_convolve(x, &DB4_DEC_LO),
        downsample_convolve(x, &DB4_DEC_HI),
    )
}

/// Multilevel transform: `[cA_level, cD_level, ..., cD_1]`
pub fn wavedec(x: &[f64], level: usize) -> Result<Vec<Vec<f64>>, FeatureError> {
    if x.is_empty() {
        return Err(FeatureError::SignalTooShort { len: 0, min: 1 });
    }
    let mut details = Vec::with_capacity(level);
    let mut approximation = x.to_vec();
    for _ in 0..level {
        let (ca, cd) = dwt(&approximation);
        details.push(cd);
        approximation = ca;
    }
    let mut bands = Vec::with_capacity(level + 1);
    bands.push(approximation);
    bands.extend(details.into_iter().rev());
    Ok(bands)
}

/// Shannon entropy (bits) of the relative band energies
pub fn wavelet_entropy(x: &[f64], level: usize) -> Result<f64, FeatureError> {
    let energies: Vec<f64> = wavedec(x, level)?
        .iter()
        .map(|band| band.iter().map(|c| c * c).sum())
        .collect();
    shannon_entropy(&energies, "wavelet band energies")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filters_are_quadrature_mirrors() {
        for k in 0..8 {
            let sign = if k % 2 == 0 { -1.0 } else { 1.0 };
            assert!((DB4_DEC_HI[k] - sign * DB4_DEC_LO[7 - k]).abs() < 1e-15);
        }
        let dc_gain: f64 = DB4_DEC_LO.iter().sum();
        assert!((dc_gain - std::f64::consts::SQRT_2).abs() < 1e-12);
    }

    #[test]
    fn test_reflect_symmetric_extension() {
        // x = [a b c]: ... b a | a b c | c b ...
        assert_eq!(reflect(-1, 3), 0);
        assert_eq!(reflect(-2, 3), 1);
        assert_eq!(reflect(3, 3), 2);
        assert_eq!(reflect(4, 3), 1);
        assert_eq!(reflect(1, 3), 1);
    }

    #[test]
    fn test_band_lengths() {
        let x: Vec<f64> = (0..100).map(|i| (i as f64 * 0.3).sin()).collect();
        let bands = wavedec(&x, 4).unwrap();
        let lengths: Vec<usize> = bands.iter().map(Vec::len).collect();
        // 100 -> 53 -> 30 -> 18 -> 12
        assert_eq!(lengths, vec![12, 12, 18, 30, 53]);
    }

    #[test]
    fn test_constant_signal_energy_in_approximation() {
        let x = vec![1.0; 64];
        let (ca, cd) = dwt(&x);
        assert!(cd.iter().all(|c| c.abs() < 1e-12));
        assert!(ca.iter().all(|c| (c - std::f64::consts::SQRT_2).abs() < 1e-12));
    }

    #[test]
    fn test_wavelet_entropy_bounds() {
        let x: Vec<f64> = (0..1000).map(|i| ((i * 7919) % 97) as f64 - 48.0).collect();
        let h = wavelet_entropy(&x, 4).unwrap();
        assert!(h > 0.0 && h <= 5f64.log2() + 1e-9, "entropy {}", h);
    }

    #[test]
    fn test_zero_signal_rejected() {
        let result = wavelet_entropy(&[0.0; 256], 4);
        assert!(matches!(result, Err(FeatureError::ZeroEnergy(_))));
    }
}
