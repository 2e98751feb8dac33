use rustfft::FftPlanner;
use rustfft::num_complex::Complex64;
use std::fmt;
use std::str::FromStr;

use crate::constants::CLIPPING_EPSILON;
use crate::error::AcqError;
use crate::notch::AdaptiveNotch;
use crate::util::check_finite;

/// Input conditioning applied before the correlation search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Mitigation {
    None,
    /// adaptive notch filter with pole contraction `ka`
    Anf { ka: f64 },
    /// frequency domain clipping
    Fdcs,
    /// frequency domain pulse blanking
    Fdpb { threshold: f64 },
    /// time domain clipping
    Tdcs,
    /// time domain pulse blanking
    Tdpb { threshold: f64 },
}

fn parse_param(name: &str, param: Option<&str>) -> Result<f64, AcqError> {
    let param = param.ok_or_else(|| AcqError::invalid(format!("{}: missing parameter", name)))?;
    param
        .parse::<f64>()
        .map_err(|e| AcqError::invalid(format!("{}: bad parameter {}: {}", name, param, e)))
}

fn check_threshold(threshold: f64) -> Result<(), AcqError> {
    if threshold > 0.0 && threshold.is_finite() {
        Ok(())
    } else {
        Err(AcqError::invalid(format!("blanking threshold {}", threshold)))
    }
}

impl FromStr for Mitigation {
    type Err = AcqError;
    fn from_str(input: &str) -> Result<Mitigation, Self::Err> {
        let mut it = input.splitn(2, ':');
        let name = it.next().unwrap_or_default().to_ascii_lowercase();
        let param = it.next();
        let m = match name.as_str() {
            "none" => Mitigation::None,
            "anf" => Mitigation::Anf {
                ka: parse_param(&name, param.or(Some("0.8")))?,
            },
            "fdcs" => Mitigation::Fdcs,
            "fdpb" => Mitigation::Fdpb {
                threshold: parse_param(&name, param)?,
            },
            "tdcs" => Mitigation::Tdcs,
            "tdpb" => Mitigation::Tdpb {
                threshold: parse_param(&name, param)?,
            },
            _ => return Err(AcqError::invalid(format!("Failed to parse {}", input))),
        };
        m.validate()?;
        Ok(m)
    }
}

impl fmt::Display for Mitigation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Mitigation::None => write!(f, "none"),
            Mitigation::Anf { ka } => write!(f, "anf:{}", ka),
            Mitigation::Fdcs => write!(f, "fdcs"),
            Mitigation::Fdpb { threshold } => write!(f, "fdpb:{}", threshold),
            Mitigation::Tdcs => write!(f, "tdcs"),
            Mitigation::Tdpb { threshold } => write!(f, "tdpb:{}", threshold),
        }
    }
}

impl Mitigation {
    pub fn validate(&self) -> Result<(), AcqError> {
        match *self {
            Mitigation::Anf { ka } => AdaptiveNotch::new(ka, None).map(|_| ()),
            Mitigation::Fdpb { threshold } | Mitigation::Tdpb { threshold } => {
                check_threshold(threshold)
            }
            _ => Ok(()),
        }
    }

    /// Returns a conditioned copy of `data`.
    pub fn apply(&self, data: &[Complex64]) -> Result<Vec<Complex64>, AcqError> {
        self.validate()?;
        check_finite(data, "mitigation input")?;

        let out = match *self {
            Mitigation::None => data.to_vec(),
            Mitigation::Anf { ka } => {
                let mut notch = AdaptiveNotch::new(ka, None)?;
                let (y, _) = notch.filter(data)?;
                y
            }
            Mitigation::Fdcs => in_freq_domain(data, |x| x / (x.norm() + CLIPPING_EPSILON)),
            Mitigation::Fdpb { threshold } => in_freq_domain(data, |x| {
                if x.norm() < threshold {
                    x
                } else {
                    Complex64::default()
                }
            }),
            Mitigation::Tdcs => data
                .iter()
                .map(|&x| x / (x.norm() + CLIPPING_EPSILON))
                .collect(),
            Mitigation::Tdpb { threshold } => data
                .iter()
                .map(|&x| {
                    if x.norm() < threshold {
                        x
                    } else {
                        Complex64::default()
                    }
                })
                .collect(),
        };
        log::debug!("mitigation {}: {} samples", self, out.len());
        Ok(out)
    }
}

// forward FFT, per-bin map, inverse FFT scaled by 1/N
fn in_freq_domain<F>(data: &[Complex64], op: F) -> Vec<Complex64>
where
    F: Fn(Complex64) -> Complex64,
{
    if data.is_empty() {
        return vec![];
    }
    let mut fft_planner: FftPlanner<f64> = FftPlanner::new();
    let fft_fw = fft_planner.plan_fft_forward(data.len());
    let fft_bw = fft_planner.plan_fft_inverse(data.len());

    let mut buf = data.to_vec();
    fft_fw.process(&mut buf);
    for x in buf.iter_mut() {
        *x = op(*x);
    }
    fft_bw.process(&mut buf);

    let scale = 1.0 / buf.len() as f64;
    buf.iter().map(|&x| x * scale).collect()
}
