//! Adaptive notch filter for narrowband interference.
//!
//! A one-pole/one-zero complex filter
//!
//! ```text
//!          1 - z0 z^-1
//! H(z) = ---------------
//!        1 - ka z0 z^-1
//! ```
//!
//! whose zero `z0` follows the strongest narrowband component of the input
//! with a stochastic gradient update. `ka` contracts the pole towards the
//! origin and sets the notch width.

use rustfft::num_complex::Complex64;

use crate::error::AcqError;
use crate::util::variance;

// below this input variance the step normalization is meaningless
const MIN_ENERGY: f64 = 1e-20;

#[derive(Debug, Clone)]
pub struct AdaptiveNotch {
    z0: Complex64,
    xi: Complex64,
    ka: f64,
    mu: f64,
}

impl AdaptiveNotch {
    /// `ka` in (0, 1); `mu` defaults to `0.25 * (1 - ka)` when `None`.
    pub fn new(ka: f64, mu: Option<f64>) -> Result<Self, AcqError> {
        if !(ka > 0.0 && ka < 1.0) {
            return Err(AcqError::invalid(format!(
                "pole contraction factor {} outside (0, 1)",
                ka
            )));
        }
        let mu = match mu {
            Some(mu) if mu > 0.0 && mu.is_finite() => mu,
            Some(mu) => {
                return Err(AcqError::invalid(format!("adaptation step {}", mu)));
            }
            None => 0.25 * (1.0 - ka),
        };
        Ok(Self {
            z0: Complex64::default(),
            xi: Complex64::default(),
            ka,
            mu,
        })
    }

    pub fn ka(&self) -> f64 {
        self.ka
    }

    pub fn mu(&self) -> f64 {
        self.mu
    }

    /// Current zero estimate.
    pub fn zero(&self) -> Complex64 {
        self.z0
    }

    /// Normalized frequency of the tracked interferer, in cycles/sample.
    pub fn frequency(&self) -> f64 {
        self.z0.arg() / (2.0 * std::f64::consts::PI)
    }

    pub fn reset(&mut self) {
        self.z0 = Complex64::default();
        self.xi = Complex64::default();
    }

    /// Advances the filter by one sample with step `mu_eff`.
    pub fn step(&mut self, x: Complex64, mu_eff: f64) -> Complex64 {
        // AR part
        let xi = x + self.ka * self.z0 * self.xi;
        // MA part
        let y = xi - self.z0 * self.xi;

        self.z0 += mu_eff * y * self.xi.conj();
        self.xi = xi;
        y
    }

    /// Filters `x`, returning the output and the zero trajectory.
    ///
    /// The step is normalized by the variance of the whole block, so the
    /// block is scanned once before adaptation starts. State carries over
    /// to the next call.
    pub fn filter(&mut self, x: &[Complex64]) -> Result<(Vec<Complex64>, Vec<Complex64>), AcqError> {
        if x.is_empty() {
            return Ok((vec![], vec![]));
        }
        if let Some(idx) = x.iter().position(|v| !v.is_finite()) {
            return Err(AcqError::numerical(format!(
                "non-finite input at index {}",
                idx
            )));
        }
        let energy = variance(x);
        if energy <= MIN_ENERGY {
            return Err(AcqError::numerical(format!(
                "input energy {:.3e} too small to normalize the adaptation step",
                energy
            )));
        }
        let mu_eff = self.mu / energy;

        let mut y = Vec::with_capacity(x.len());
        let mut z0 = Vec::with_capacity(x.len());
        for &v in x {
            y.push(self.step(v, mu_eff));
            z0.push(self.z0);
        }

        log::debug!(
            "notch: ka={} mu={:.4} energy={:.3e} z0={:.4} freq={:.5}",
            self.ka,
            self.mu,
            energy,
            self.z0,
            self.frequency()
        );
        Ok((y, z0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::mean_power;
    use std::f64::consts::PI;

    fn tone(n: usize, f: f64) -> Vec<Complex64> {
        (0..n)
            .map(|t| Complex64::from_polar(1.0, 2.0 * PI * f * t as f64))
            .collect()
    }

    #[test]
    fn default_step() {
        let anf = AdaptiveNotch::new(0.8, None).unwrap();
        assert!((anf.mu() - 0.05).abs() < 1e-15);
        assert_eq!(AdaptiveNotch::new(0.8, Some(0.01)).unwrap().mu(), 0.01);
        assert_eq!(anf.zero(), Complex64::default());
    }

    #[test]
    fn converges_on_single_tone() {
        let f = 0.1;
        let x = tone(4000, f);
        let mut anf = AdaptiveNotch::new(0.9, None).unwrap();
        let (y, z0) = anf.filter(&x).unwrap();
        assert_eq!(y.len(), x.len());
        assert_eq!(z0.len(), x.len());

        let z = *z0.last().unwrap();
        assert_eq!(z, anf.zero());
        assert!((z.norm() - 1.0).abs() < 0.05, "|z0| = {}", z.norm());
        assert!((z.arg() - 2.0 * PI * f).abs() < 0.05, "arg z0 = {}", z.arg());
        assert!((anf.frequency() - f).abs() < 0.01);

        let p_in = mean_power(&x[3000..]);
        let p_out = mean_power(&y[3000..]);
        assert!(p_out < 0.01 * p_in, "{} vs {}", p_out, p_in);
        assert!(mean_power(&y[..50]) > p_out);
    }

    #[test]
    fn state_persists_across_calls() {
        let x = tone(2000, -0.2);
        let mut whole = AdaptiveNotch::new(0.8, Some(0.05)).unwrap();
        let (y_whole, _) = whole.filter(&x).unwrap();

        let mut split = AdaptiveNotch::new(0.8, Some(0.05)).unwrap();
        let (y1, _) = split.filter(&x[..1000]).unwrap();
        let (y2, _) = split.filter(&x[1000..]).unwrap();

        // both halves of a unit tone have unit variance, so the steps match
        for (a, b) in y_whole.iter().zip(y1.iter().chain(y2.iter())) {
            assert!((a - b).norm() < 1e-9);
        }

        split.reset();
        assert_eq!(split.zero(), Complex64::default());
    }

    #[test]
    fn errors() {
        assert!(AdaptiveNotch::new(0.0, None).is_err());
        assert!(AdaptiveNotch::new(1.0, None).is_err());
        assert!(AdaptiveNotch::new(0.9, Some(-1.0)).is_err());

        let mut anf = AdaptiveNotch::new(0.9, None).unwrap();
        let dc = vec![Complex64::new(3.0, -1.0); 100];
        assert!(matches!(anf.filter(&dc), Err(AcqError::NumericalError(_))));
        let (y, z) = anf.filter(&[]).unwrap();
        assert!(y.is_empty() && z.is_empty());
    }
}
