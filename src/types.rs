use crate::error::AcqError;
use crate::util::get_max_with_idx;

/// Evenly spaced Doppler hypotheses. Bin `ff` (0-based) is offset by
/// `(ff + 1 - ceil(num_bins / 2)) * step_hz` from the intermediate frequency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DopplerGrid {
    pub num_bins: usize,
    pub step_hz: f64,
}

impl DopplerGrid {
    pub fn new(num_bins: usize, step_hz: f64) -> Result<Self, AcqError> {
        let grid = Self { num_bins, step_hz };
        grid.validate()?;
        Ok(grid)
    }

    pub fn validate(&self) -> Result<(), AcqError> {
        if self.num_bins == 0 {
            return Err(AcqError::invalid("number of Doppler bins must be positive"));
        }
        if !self.step_hz.is_finite() {
            return Err(AcqError::invalid(format!("Doppler step {}", self.step_hz)));
        }
        Ok(())
    }

    /// Signed bin offset relative to the zero Doppler bin.
    pub fn bin_offset(&self, ff: usize) -> f64 {
        ff as f64 + 1.0 - (self.num_bins as f64 / 2.0).ceil()
    }

    /// 0-based index of the zero Doppler bin.
    pub fn zero_bin(&self) -> usize {
        self.num_bins.div_ceil(2) - 1
    }

    pub fn doppler_hz(&self, ff: usize) -> f64 {
        self.bin_offset(ff) * self.step_hz
    }

    pub fn frequencies_hz(&self) -> Vec<f64> {
        (0..self.num_bins).map(|ff| self.doppler_hz(ff)).collect()
    }
}

/// Location and value of the largest cell of a search space.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct CafPeak {
    pub doppler_bin: usize,
    pub code_phase_idx: usize,
    pub value: f64,
}

/// Doppler x code-phase correlation power (the CAF), one row per Doppler bin.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchSpace {
    rows: Vec<Vec<f64>>,
    num_code_phases: usize,
}

impl SearchSpace {
    pub fn zeros(num_doppler_bins: usize, num_code_phases: usize) -> Self {
        Self {
            rows: vec![vec![0.0; num_code_phases]; num_doppler_bins],
            num_code_phases,
        }
    }

    pub(crate) fn from_rows(rows: Vec<Vec<f64>>, num_code_phases: usize) -> Self {
        debug_assert!(rows.iter().all(|r| r.len() == num_code_phases));
        Self {
            rows,
            num_code_phases,
        }
    }

    pub fn num_doppler_bins(&self) -> usize {
        self.rows.len()
    }

    pub fn num_code_phases(&self) -> usize {
        self.num_code_phases
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.num_doppler_bins(), self.num_code_phases)
    }

    pub fn get(&self, doppler_bin: usize, code_phase_idx: usize) -> f64 {
        self.rows[doppler_bin][code_phase_idx]
    }

    pub fn row(&self, doppler_bin: usize) -> &[f64] {
        &self.rows[doppler_bin]
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Vec<f64>> {
        self.rows
    }

    /// Element-wise sum of `other` into `self` (non-coherent integration).
    pub fn accumulate(&mut self, other: &SearchSpace) -> Result<(), AcqError> {
        if self.shape() != other.shape() {
            return Err(AcqError::invalid(format!(
                "search space shape mismatch: {:?} vs {:?}",
                self.shape(),
                other.shape()
            )));
        }
        for (dst, src) in self.rows.iter_mut().zip(other.rows.iter()) {
            for (d, s) in dst.iter_mut().zip(src.iter()) {
                *d += s;
            }
        }
        Ok(())
    }

    pub fn peak(&self) -> CafPeak {
        let mut peak = CafPeak {
            value: f64::NEG_INFINITY,
            ..Default::default()
        };
        for (i, row) in self.rows.iter().enumerate() {
            let (j, v) = get_max_with_idx(row);
            if v > peak.value {
                peak = CafPeak {
                    doppler_bin: i,
                    code_phase_idx: j,
                    value: v,
                };
            }
        }
        peak
    }

    pub fn mean(&self) -> f64 {
        let n = self.num_doppler_bins() * self.num_code_phases;
        if n == 0 {
            return 0.0;
        }
        self.rows.iter().flatten().sum::<f64>() / n as f64
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AcquisitionResult {
    pub prn: usize,
    pub doppler_bin: usize,
    pub doppler_hz: f64,
    pub code_phase_idx: usize,
    pub code_phase_chips: f64,
    pub peak: f64,
    pub noise_var: f64,
    pub test_statistic: f64,
    pub threshold: f64,
    pub detected: bool,
}
