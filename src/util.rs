use rustfft::num_complex::Complex64;

use crate::error::AcqError;

const PI: f64 = std::f64::consts::PI;

pub fn norm_square(v: &[Complex64]) -> f64 {
    v.iter().map(|&x| x.norm_sqr()).sum::<f64>()
}

pub fn mean_power(v: &[Complex64]) -> f64 {
    if v.is_empty() {
        return 0.0;
    }
    norm_square(v) / v.len() as f64
}

/// Population variance of a complex sequence: mean(|x - mean(x)|^2).
pub fn variance(v: &[Complex64]) -> f64 {
    if v.is_empty() {
        return f64::NAN;
    }
    let n = v.len() as f64;
    let mean = v.iter().sum::<Complex64>() / n;
    v.iter().map(|&x| (x - mean).norm_sqr()).sum::<f64>() / n
}

pub fn to_complex(v: &[f64]) -> Vec<Complex64> {
    v.iter().map(|&x| Complex64::new(x, 0.0)).collect()
}

pub fn check_finite(v: &[Complex64], what: &str) -> Result<(), AcqError> {
    match v.iter().position(|x| !x.is_finite()) {
        Some(idx) => Err(AcqError::numerical(format!(
            "{}: non-finite value at index {}",
            what, idx
        ))),
        None => Ok(()),
    }
}

/// Multiplies sample `t` by `exp(-2*pi*j*freq_norm*t)`, `freq_norm` in cycles/sample.
pub fn downconvert(signal: &[Complex64], freq_norm: f64) -> Vec<Complex64> {
    signal
        .iter()
        .enumerate()
        .map(|(t, &s)| s * Complex64::from_polar(1.0, -2.0 * PI * freq_norm * t as f64))
        .collect()
}

pub fn get_max_with_idx(v: &[f64]) -> (usize, f64) {
    let mut max = f64::NEG_INFINITY;
    let mut idx = 0;
    for (i, &x) in v.iter().enumerate() {
        if x > max {
            max = x;
            idx = i;
        }
    }
    (idx, max)
}
