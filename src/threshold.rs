use puruspe::{gammq, invgammp};
use rand::Rng;
use rustfft::num_complex::Complex64;

use crate::acquisition::check_freq;
use crate::acquisition::compute_search_space;
use crate::code::resample_code;
use crate::error::AcqError;
use crate::types::DopplerGrid;

const ISF_MAX_ITER: usize = 64;
const ISF_REL_TOL: f64 = 1e-13;

/// Noise floor of the correlator outputs for input `y`.
///
/// Correlates `y` at the intermediate frequency against a random bipolar
/// code, keeps one output per chip and returns half their mean power:
/// the per-component variance of a correlator output over `y.len()` samples.
pub fn estimate_noise_variance<R: Rng>(
    y: &[Complex64],
    fs: f64,
    fc: f64,
    fif: f64,
    rng: &mut R,
) -> Result<f64, AcqError> {
    if y.is_empty() {
        return Err(AcqError::invalid("empty input"));
    }
    check_freq("sampling frequency", fs)?;
    check_freq("chip rate", fc)?;

    let clen = (y.len() as f64 / fs * fc).round() as usize;
    if clen == 0 {
        return Err(AcqError::invalid(format!(
            "{} samples span less than one chip",
            y.len()
        )));
    }
    let step = (fs / fc).round() as usize;
    if step == 0 {
        return Err(AcqError::invalid(format!(
            "sampling frequency {} below half the chip rate {}",
            fs, fc
        )));
    }

    let code: Vec<f64> = (0..clen)
        .map(|_| if rng.gen_bool(0.5) { 1.0 } else { -1.0 })
        .collect();
    let loc = resample_code(&code, y.len(), fs, 0.0, fc)?;

    let grid = DopplerGrid::new(1, 0.0)?;
    let sspace = compute_search_space(y, &loc, &grid, fs, fif)?;

    let correlators: Vec<f64> = sspace.row(0).iter().step_by(step).copied().collect();
    let sigma2 = correlators.iter().sum::<f64>() / correlators.len() as f64 / 2.0;

    log::debug!(
        "noise variance: samples={} chips={} step={} sigma2={:.4e}",
        y.len(),
        clen,
        step,
        sigma2
    );
    Ok(sigma2)
}

/// Per-cell false alarm probability keeping the system level one at
/// `pfa_sys` over `nel` independent cells.
pub fn cell_false_alarm(pfa_sys: f64, nel: usize) -> Result<f64, AcqError> {
    if !(pfa_sys > 0.0 && pfa_sys < 1.0) {
        return Err(AcqError::invalid(format!(
            "system false alarm probability {} outside (0, 1)",
            pfa_sys
        )));
    }
    if nel == 0 {
        return Err(AcqError::invalid("number of search cells must be positive"));
    }
    // 1 - (1 - pfa)^(1 / nel)
    Ok(-((-pfa_sys).ln_1p() / nel as f64).exp_m1())
}

/// Inverse survival function of a chi-squared variable with `2 * k` degrees
/// of freedom.
pub fn chi2_isf(q: f64, k: usize) -> Result<f64, AcqError> {
    if !(q > 0.0 && q < 1.0) {
        return Err(AcqError::invalid(format!("tail probability {} outside (0, 1)", q)));
    }
    if k == 0 {
        return Err(AcqError::invalid("degrees of freedom must be positive"));
    }

    // chi2(2k) / 2 is Gamma(k, 1); work in gamma units.
    let a = k as f64;
    let ln_gamma_a: f64 = (1..k).map(|j| (j as f64).ln()).sum();
    let ln_q = q.ln();

    let p = 1.0 - q;
    let mut x = if p < 1.0 { invgammp(p, a) } else { a - ln_q };
    if !(x.is_finite() && x > 0.0) {
        x = a;
    }

    // Newton on ln Q(a, x) = ln q, stable far in the tail where 1 - q rounds.
    for _ in 0..ISF_MAX_ITER {
        let sf = gammq(a, x);
        if sf <= 0.0 {
            x /= 2.0;
            continue;
        }
        let pdf = ((a - 1.0) * x.ln() - x - ln_gamma_a).exp();
        if pdf <= 0.0 || !pdf.is_finite() {
            break;
        }
        let mut next = x + (sf.ln() - ln_q) * sf / pdf;
        if next <= 0.0 || !next.is_finite() {
            next = x / 2.0;
        }
        let done = (next - x).abs() <= ISF_REL_TOL * x;
        x = next;
        if done {
            break;
        }
    }

    if !x.is_finite() {
        return Err(AcqError::numerical(format!(
            "chi-squared quantile diverged for q={} dof={}",
            q,
            2 * k
        )));
    }
    Ok(2.0 * x)
}

/// Normalized decision threshold for `k` non-coherent integrations over
/// `nel` search cells at system false alarm probability `pfa_sys`.
pub fn normalized_decision_threshold(pfa_sys: f64, nel: usize, k: usize) -> Result<f64, AcqError> {
    let pfa_cell = cell_false_alarm(pfa_sys, nel)?;
    let th = chi2_isf(pfa_cell, k)?;
    log::debug!(
        "threshold: pfa_sys={:.2e} nel={} K={} pfa_cell={:.3e} th={:.3}",
        pfa_sys,
        nel,
        k,
        pfa_cell,
        th
    );
    Ok(th)
}
