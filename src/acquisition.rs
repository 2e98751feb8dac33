use colored::Colorize;
use rand::Rng;
use rayon::prelude::*;
use rustfft::num_complex::Complex64;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

use crate::code::Code;
use crate::code::resample_code;
use crate::error::AcqError;
use crate::gold_code::GoldCode;
use crate::threshold::estimate_noise_variance;
use crate::threshold::normalized_decision_threshold;
use crate::types::AcquisitionResult;
use crate::types::DopplerGrid;
use crate::types::SearchSpace;
use crate::util::check_finite;
use crate::util::downconvert;
use crate::util::to_complex;

const SIGNAL: &str = "L1CA";

pub(crate) fn check_freq(name: &str, hz: f64) -> Result<(), AcqError> {
    if hz > 0.0 && hz.is_finite() {
        Ok(())
    } else {
        Err(AcqError::invalid(format!("{} must be positive: {}", name, hz)))
    }
}

/// FFT based parallel code-phase search against one local code replica.
///
/// The conjugated spectrum of the replica is computed once; each Doppler
/// bin then costs one forward and one inverse FFT of the wiped-off input.
pub struct CorrelationEngine {
    fft_fw: Arc<dyn Fft<f64>>,
    fft_bw: Arc<dyn Fft<f64>>,
    code_fft_conj: Vec<Complex64>,
}

impl CorrelationEngine {
    pub fn new(local_code: &[f64]) -> Result<Self, AcqError> {
        if local_code.is_empty() {
            return Err(AcqError::invalid("empty local code"));
        }
        let mut code = to_complex(local_code);
        check_finite(&code, "local code")?;

        let mut fft_planner: FftPlanner<f64> = FftPlanner::new();
        let fft_fw = fft_planner.plan_fft_forward(code.len());
        let fft_bw = fft_planner.plan_fft_inverse(code.len());

        fft_fw.process(&mut code);
        let code_fft_conj = code.iter().map(|c| c.conj()).collect();

        Ok(Self {
            fft_fw,
            fft_bw,
            code_fft_conj,
        })
    }

    /// Samples per coherent integration (the replica length).
    pub fn len(&self) -> usize {
        self.code_fft_conj.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code_fft_conj.is_empty()
    }

    // circular correlation power for one carrier hypothesis, freq in cycles/sample
    fn correlate(&self, signal: &[Complex64], freq_norm: f64) -> Vec<f64> {
        let mut buf = downconvert(signal, freq_norm);
        self.fft_fw.process(&mut buf);
        for (x, c) in buf.iter_mut().zip(self.code_fft_conj.iter()) {
            *x = *x * *c;
        }
        self.fft_bw.process(&mut buf);

        let scale = 1.0 / buf.len() as f64;
        buf.iter().map(|&x| (x * scale).norm_sqr()).collect()
    }

    /// Computes the `grid.num_bins x len()` power search space of `signal`.
    pub fn search(
        &self,
        signal: &[Complex64],
        grid: &DopplerGrid,
        fs: f64,
        fi: f64,
    ) -> Result<SearchSpace, AcqError> {
        if signal.len() != self.len() {
            return Err(AcqError::invalid(format!(
                "signal length {} != local code length {}",
                signal.len(),
                self.len()
            )));
        }
        grid.validate()?;
        check_freq("sampling frequency", fs)?;
        if !fi.is_finite() {
            return Err(AcqError::invalid(format!("intermediate frequency {}", fi)));
        }
        check_finite(signal, "input signal")?;

        let fif = fi / fs;
        let deltaf = grid.step_hz / fs;

        let rows: Vec<Vec<f64>> = (0..grid.num_bins)
            .into_par_iter()
            .map(|ff| self.correlate(signal, fif + grid.bin_offset(ff) * deltaf))
            .collect();

        Ok(SearchSpace::from_rows(rows, self.len()))
    }
}

/// One coherent search of `signal` against `local_code` (same length).
pub fn compute_search_space(
    signal: &[Complex64],
    local_code: &[f64],
    grid: &DopplerGrid,
    fs: f64,
    fi: f64,
) -> Result<SearchSpace, AcqError> {
    CorrelationEngine::new(local_code)?.search(signal, grid, fs, fi)
}

/// Sums the search spaces of `k` consecutive code periods of `data`.
///
/// Each period is `local_code.len()` samples long and is searched on its
/// own time axis; `data` must hold at least `k` periods.
pub fn accumulate_non_coherent(
    data: &[Complex64],
    local_code: &[f64],
    grid: &DopplerGrid,
    fs: f64,
    fi: f64,
    k: usize,
) -> Result<SearchSpace, AcqError> {
    if k == 0 {
        return Err(AcqError::invalid("number of non-coherent integrations must be positive"));
    }
    let engine = CorrelationEngine::new(local_code)?;
    let n = engine.len();
    let needed = k
        .checked_mul(n)
        .ok_or_else(|| AcqError::invalid("non-coherent window overflows"))?;
    if data.len() < needed {
        return Err(AcqError::invalid(format!(
            "need {} samples for {} code periods, got {}",
            needed,
            k,
            data.len()
        )));
    }

    let spaces: Vec<SearchSpace> = (0..k)
        .into_par_iter()
        .map(|idx| engine.search(&data[idx * n..(idx + 1) * n], grid, fs, fi))
        .collect::<Result<_, _>>()?;

    let mut sspace = SearchSpace::zeros(grid.num_bins, n);
    for s in &spaces {
        sspace.accumulate(s)?;
    }
    Ok(sspace)
}

#[derive(Debug, Clone, Copy)]
pub struct AcquisitionConfig {
    pub fs: f64,
    pub fi: f64,
    pub grid: DopplerGrid,
    pub num_non_coherent: usize,
    pub pfa_sys: f64,
}

impl AcquisitionConfig {
    pub fn samples_per_code(&self) -> usize {
        Code::get_samples_per_code(SIGNAL, self.fs)
    }
}

pub fn try_acquisition_one_sat<R: Rng>(
    gold_code: &GoldCode,
    data: &[Complex64],
    prn: usize,
    cfg: &AcquisitionConfig,
    rng: &mut R,
) -> Result<AcquisitionResult, AcqError> {
    check_freq("sampling frequency", cfg.fs)?;
    let fc = Code::get_chip_rate(SIGNAL);
    let n = cfg.samples_per_code();
    if n == 0 {
        return Err(AcqError::invalid(format!(
            "sampling frequency {} too low for one code period",
            cfg.fs
        )));
    }

    let local_code = resample_code(gold_code.get_code(prn)?, n, cfg.fs, 0.0, fc)?;
    let sspace = accumulate_non_coherent(
        data,
        &local_code,
        &cfg.grid,
        cfg.fs,
        cfg.fi,
        cfg.num_non_coherent,
    )?;
    let peak = sspace.peak();

    let noise_var = estimate_noise_variance(&data[..n], cfg.fs, fc, cfg.fi, rng)?;
    if !noise_var.is_finite() || noise_var <= 0.0 {
        return Err(AcqError::numerical(format!(
            "sat_id {}: noise variance estimate {}",
            prn, noise_var
        )));
    }
    let threshold = normalized_decision_threshold(
        cfg.pfa_sys,
        cfg.grid.num_bins * n,
        cfg.num_non_coherent,
    )?;

    let test_statistic = peak.value / noise_var;
    let res = AcquisitionResult {
        prn,
        doppler_bin: peak.doppler_bin,
        doppler_hz: cfg.grid.doppler_hz(peak.doppler_bin),
        code_phase_idx: peak.code_phase_idx,
        code_phase_chips: peak.code_phase_idx as f64 * fc / cfg.fs,
        peak: peak.value,
        noise_var,
        test_statistic,
        threshold,
        detected: test_statistic > threshold,
    };

    log::debug!(
        "sat_id={} -- bins={} K={} peak={:.3e} mean={:.3e} sigma2={:.3e}",
        prn,
        cfg.grid.num_bins,
        cfg.num_non_coherent,
        peak.value,
        sspace.mean(),
        noise_var,
    );
    if res.detected {
        log::info!(
            " sat_id: {} -- doppler_hz: {:6.0} code_idx: {:5} stat: {} th: {:.2}",
            format!("{:2}", prn).yellow(),
            res.doppler_hz,
            res.code_phase_idx,
            format!("{:.2}", res.test_statistic).green(),
            res.threshold,
        );
    } else {
        log::info!(
            " sat_id: {} -- not detected, stat: {} th: {:.2}",
            format!("{:2}", prn).yellow(),
            format!("{:.2}", res.test_statistic).red(),
            res.threshold,
        );
    }
    Ok(res)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gold_code::gen_code;

    const FS: f64 = 2.046e6;
    const FC: f64 = 1.023e6;

    fn tone(n: usize, freq_hz: f64, fs: f64) -> Vec<Complex64> {
        (0..n)
            .map(|t| Complex64::from_polar(1.0, 2.0 * std::f64::consts::PI * freq_hz * t as f64 / fs))
            .collect()
    }

    fn synth(prn: usize, n: usize, delay_chips: f64, carrier_hz: f64) -> Vec<Complex64> {
        let code = resample_code(&gen_code(prn).unwrap(), n, FS, -delay_chips, FC).unwrap();
        tone(n, carrier_hz, FS)
            .into_iter()
            .zip(code)
            .map(|(c, x)| c * x)
            .collect()
    }

    #[test]
    fn aligned_replica_peaks_at_injected_cell() {
        let n = 2046;
        let grid = DopplerGrid::new(7, 500.0).unwrap();
        let loc = resample_code(&gen_code(3).unwrap(), n, FS, 0.0, FC).unwrap();
        // bin 5 is +1000 Hz
        let sig = synth(3, n, 100.0, 1000.0);

        let sspace = compute_search_space(&sig, &loc, &grid, FS, 0.0).unwrap();
        assert_eq!(sspace.shape(), (7, n));
        let peak = sspace.peak();
        assert_eq!(peak.doppler_bin, 5);
        assert_eq!(peak.code_phase_idx, 200);
        // noiseless and aligned: |sum c^2|^2 == N^2
        let expected = (n * n) as f64;
        assert!((peak.value - expected).abs() < 1e-6 * expected);
    }

    #[test]
    fn intermediate_frequency_shifts_the_grid() {
        let n = 2046;
        let fi = 250e3;
        let grid = DopplerGrid::new(5, 1000.0).unwrap();
        let loc = resample_code(&gen_code(11).unwrap(), n, FS, 0.0, FC).unwrap();
        let sig = synth(11, n, 0.0, fi - 1000.0);

        let peak = compute_search_space(&sig, &loc, &grid, FS, fi).unwrap().peak();
        assert_eq!(grid.doppler_hz(peak.doppler_bin), -1000.0);
        assert_eq!(peak.code_phase_idx, 0);
    }

    #[test]
    fn non_coherent_sum_of_periods() {
        let n = 1023;
        let k = 3;
        let grid = DopplerGrid::new(3, 500.0).unwrap();
        let loc = gen_code(7).unwrap();
        let data: Vec<Complex64> = (0..k * n + 10)
            .map(|i| Complex64::new(((i * 37) % 11) as f64 - 5.0, ((i * 13) % 7) as f64 - 3.0))
            .collect();

        let total = accumulate_non_coherent(&data, &loc, &grid, FC, 0.0, k).unwrap();
        let mut expected = SearchSpace::zeros(3, n);
        for idx in 0..k {
            let s = compute_search_space(&data[idx * n..(idx + 1) * n], &loc, &grid, FC, 0.0)
                .unwrap();
            expected.accumulate(&s).unwrap();
        }
        for d in 0..3 {
            for j in 0..n {
                assert!((total.get(d, j) - expected.get(d, j)).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn argument_errors() {
        let grid = DopplerGrid::new(3, 500.0).unwrap();
        let loc = vec![1.0; 8];
        let sig = vec![Complex64::new(1.0, 0.0); 8];

        let err = compute_search_space(&sig[..7], &loc, &grid, FS, 0.0);
        assert!(matches!(err, Err(AcqError::InvalidArgument(_))));
        assert!(compute_search_space(&sig, &loc, &grid, 0.0, 0.0).is_err());
        assert!(compute_search_space(&sig, &[], &grid, FS, 0.0).is_err());

        let bad_grid = DopplerGrid {
            num_bins: 0,
            step_hz: 1.0,
        };
        assert!(compute_search_space(&sig, &loc, &bad_grid, FS, 0.0).is_err());

        let mut nan_sig = sig.clone();
        nan_sig[3] = Complex64::new(f64::NAN, 0.0);
        assert!(matches!(
            compute_search_space(&nan_sig, &loc, &grid, FS, 0.0),
            Err(AcqError::NumericalError(_))
        ));

        assert!(accumulate_non_coherent(&sig, &loc, &grid, FS, 0.0, 0).is_err());
        assert!(matches!(
            accumulate_non_coherent(&sig, &loc, &grid, FS, 0.0, 2),
            Err(AcqError::InvalidArgument(_))
        ));
    }
}
