use crate::constants::L1CA_CHIP_RATE_HZ;
use crate::constants::L1CA_CODE_SEC;
use crate::constants::PRN_CODE_LEN;
use crate::error::AcqError;
use crate::gold_code::gen_code;

pub struct Code {}

impl Code {
    pub fn gen_code(sig: &str, prn: usize) -> Result<Vec<f64>, AcqError> {
        match sig {
            "L1CA" => gen_code(prn),
            _ => Err(AcqError::invalid(format!("unsupported signal {}", sig))),
        }
    }

    pub fn get_code_period(sig: &str) -> f64 {
        match sig {
            "L1CA" => L1CA_CODE_SEC,
            _ => 0.0,
        }
    }

    pub fn get_code_len(sig: &str) -> usize {
        match sig {
            "L1CA" => PRN_CODE_LEN,
            _ => 0,
        }
    }

    pub fn get_chip_rate(sig: &str) -> f64 {
        match sig {
            "L1CA" => L1CA_CHIP_RATE_HZ,
            _ => 0.0,
        }
    }

    /// Number of samples spanning one code period at `fs`.
    pub fn get_samples_per_code(sig: &str, fs: f64) -> usize {
        (Self::get_code_period(sig) * fs).round() as usize
    }
}

/// Maps `code` (one value per chip) onto `num_points` samples taken at `fs`.
///
/// Sample `i` takes chip `floor(i * fc / fs + tau0) mod code.len()`, the
/// last chip edge at or before the sample instant. `tau0` is the chip
/// phase of the first sample and may be negative.
pub fn resample_code(
    code: &[f64],
    num_points: usize,
    fs: f64,
    tau0: f64,
    fc: f64,
) -> Result<Vec<f64>, AcqError> {
    if code.is_empty() {
        return Err(AcqError::invalid("empty code"));
    }
    if num_points == 0 {
        return Err(AcqError::invalid("number of points must be positive"));
    }
    if !(fs > 0.0 && fs.is_finite()) {
        return Err(AcqError::invalid(format!("sampling frequency {}", fs)));
    }
    if !(fc > 0.0 && fc.is_finite()) {
        return Err(AcqError::invalid(format!("chip rate {}", fc)));
    }
    if !tau0.is_finite() {
        return Err(AcqError::invalid(format!("code phase {}", tau0)));
    }

    let len = code.len() as i64;
    let resampled = (0..num_points)
        .map(|i| {
            let chip = (i as f64 * fc / fs + tau0).floor() as i64;
            code[chip.rem_euclid(len) as usize]
        })
        .collect();
    Ok(resampled)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(n: usize) -> Vec<f64> {
        (0..n).map(|i| i as f64).collect()
    }

    #[test]
    fn unit_ratio_is_identity() {
        let code = gen_code(5).unwrap();
        let out = resample_code(&code, 3000, 1.023e6, 0.0, 1.023e6).unwrap();
        assert_eq!(out.len(), 3000);
        for (i, v) in out.iter().enumerate() {
            assert_eq!(*v, code[i % PRN_CODE_LEN]);
        }
    }

    #[test]
    fn upsampling_holds_each_chip() {
        let out = resample_code(&ramp(4), 8, 2.0, 0.0, 1.0).unwrap();
        assert_eq!(out, vec![0.0, 0.0, 1.0, 1.0, 2.0, 2.0, 3.0, 3.0]);
    }

    #[test]
    fn negative_phase_wraps() {
        let out = resample_code(&ramp(5), 4, 1.0, -2.0, 1.0).unwrap();
        assert_eq!(out, vec![3.0, 4.0, 0.0, 1.0]);

        // floor, not truncation: -0.5 lands on the last chip
        let out = resample_code(&ramp(5), 2, 2.0, -0.5, 1.0).unwrap();
        assert_eq!(out, vec![4.0, 0.0]);
    }

    #[test]
    fn one_chip_shift_rotates_by_one_sample() {
        let code = gen_code(9).unwrap();
        let base = resample_code(&code, PRN_CODE_LEN, 1.023e6, 0.0, 1.023e6).unwrap();
        let shifted = resample_code(&code, PRN_CODE_LEN, 1.023e6, 1.0, 1.023e6).unwrap();
        let mut rotated = base.clone();
        rotated.rotate_left(1);
        assert_eq!(shifted, rotated);
    }

    #[test]
    fn samples_per_code() {
        assert_eq!(Code::get_samples_per_code("L1CA", 2.046e6), 2046);
        assert_eq!(Code::get_code_len("L1CA"), PRN_CODE_LEN);
        assert!(Code::gen_code("E1B", 1).is_err());
    }

    #[test]
    fn bad_arguments() {
        let code = ramp(4);
        assert!(resample_code(&[], 4, 1.0, 0.0, 1.0).is_err());
        assert!(resample_code(&code, 0, 1.0, 0.0, 1.0).is_err());
        assert!(resample_code(&code, 4, 0.0, 0.0, 1.0).is_err());
        assert!(resample_code(&code, 4, 1.0, 0.0, -1.0).is_err());
        assert!(resample_code(&code, 4, 1.0, f64::NAN, 1.0).is_err());
    }
}
