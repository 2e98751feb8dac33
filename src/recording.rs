use colored::Colorize;
use rustfft::num_complex::Complex64;
use std::error::Error;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Instant;

const BUFFER_SIZE: usize = 128 * 1024;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IQFileType {
    TypePairFloat32,
    TypePairInt16,
    TypePairInt8,
    TypeOneInt8,
}

impl FromStr for IQFileType {
    type Err = Box<dyn Error>;
    fn from_str(input: &str) -> Result<IQFileType, Self::Err> {
        match input {
            "2xf32" => Ok(IQFileType::TypePairFloat32),
            "2xi16" => Ok(IQFileType::TypePairInt16),
            "2xi8" => Ok(IQFileType::TypePairInt8),
            "i8" => Ok(IQFileType::TypeOneInt8),
            _ => Err(format!("Failed to parse {}", input).into()),
        }
    }
}

impl fmt::Display for IQFileType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            IQFileType::TypePairFloat32 => write!(f, "2xf32"),
            IQFileType::TypePairInt16 => write!(f, "2xi16"),
            IQFileType::TypePairInt8 => write!(f, "2xi8"),
            IQFileType::TypeOneInt8 => write!(f, "i8"),
        }
    }
}

impl IQFileType {
    pub fn sample_size(&self) -> usize {
        match *self {
            IQFileType::TypePairFloat32 => 8,
            IQFileType::TypePairInt16 => 4,
            IQFileType::TypePairInt8 => 2,
            IQFileType::TypeOneInt8 => 1,
        }
    }

    fn decode(&self, b: &[u8]) -> Complex64 {
        match *self {
            IQFileType::TypePairInt8 => Complex64 {
                re: b[0] as i8 as f64 / i8::MAX as f64,
                im: b[1] as i8 as f64 / i8::MAX as f64,
            },
            IQFileType::TypeOneInt8 => Complex64 {
                re: b[0] as i8 as f64 / i8::MAX as f64,
                im: 0.0,
            },
            IQFileType::TypePairInt16 => {
                let i = i16::from_le_bytes([b[0], b[1]]);
                let q = i16::from_le_bytes([b[2], b[3]]);
                Complex64 {
                    re: i as f64 / i16::MAX as f64,
                    im: q as f64 / i16::MAX as f64,
                }
            }
            IQFileType::TypePairFloat32 => {
                let i = f32::from_le_bytes([b[0], b[1], b[2], b[3]]);
                let q = f32::from_le_bytes([b[4], b[5], b[6], b[7]]);
                Complex64 {
                    re: i as f64,
                    im: q as f64,
                }
            }
        }
    }
}

pub struct IQRecording {
    pub file_path: PathBuf,
    pub sample_rate: f64,
    pub iq_vec: Vec<Complex64>,
    pub file_type: IQFileType,
}

impl IQRecording {
    pub fn new(file_path: PathBuf, sample_rate: f64, file_type: IQFileType) -> Self {
        Self {
            file_path,
            sample_rate,
            iq_vec: vec![],
            file_type,
        }
    }

    /// Reads samples until EOF or until `max_samples` have been read.
    pub fn read_iq_file(&mut self, max_samples: Option<usize>) -> Result<(), Box<dyn Error>> {
        let file = File::open(&self.file_path)?;
        let mut reader = BufReader::with_capacity(BUFFER_SIZE, file);
        let sample_size = self.file_type.sample_size();
        let limit = max_samples.unwrap_or(usize::MAX);
        let mut pending: Vec<u8> = Vec::with_capacity(sample_size);
        let mut n: u64 = 0;
        let ts = Instant::now();

        self.iq_vec.clear();
        while self.iq_vec.len() < limit {
            let buf = reader.fill_buf()?;
            let len = buf.len();
            if len == 0 {
                break;
            }

            let mut off = 0;
            // sample split across two reads
            if !pending.is_empty() {
                let take = usize::min(sample_size - pending.len(), len);
                pending.extend_from_slice(&buf[..take]);
                off = take;
                if pending.len() == sample_size {
                    self.iq_vec.push(self.file_type.decode(&pending));
                    pending.clear();
                }
            }
            for chunk in buf[off..].chunks(sample_size) {
                if self.iq_vec.len() >= limit {
                    break;
                }
                if chunk.len() < sample_size {
                    pending.extend_from_slice(chunk);
                } else {
                    self.iq_vec.push(self.file_type.decode(chunk));
                }
            }
            n += 1;
            reader.consume(len);
        }

        log::info!(
            "{}: num_samples: {} -- {:.1} msec",
            self.file_path.display(),
            format!("{}", self.iq_vec.len()).yellow(),
            self.iq_vec.len() as f64 * 1000.0 / self.sample_rate,
        );
        let bw = n as f64 * BUFFER_SIZE as f64 / 1024.0 / 1024.0 / ts.elapsed().as_secs_f64();
        log::debug!(
            "read_from_file: {} msec -- bandwidth: {:.1} MB/sec -- num_read_ops={}",
            ts.elapsed().as_millis(),
            bw,
            n
        );

        Ok(())
    }

    pub fn samples_per_msec(&self) -> usize {
        (self.sample_rate / 1000.0).round() as usize
    }

    pub fn get_msec_sample(&self, off_msec: usize, num_msec: usize) -> Result<&[Complex64], Box<dyn Error>> {
        let num_samples_per_msec = self.samples_per_msec();
        let lo = off_msec * num_samples_per_msec;
        let hi = lo + num_msec * num_samples_per_msec;
        log::debug!(
            "get_msec_sample: off_msec={} duration={} msec lo={} hi={}",
            off_msec,
            num_msec,
            lo,
            hi
        );
        if hi > self.iq_vec.len() {
            return Err(format!(
                "window [{}, {}) past end of recording ({} samples)",
                lo,
                hi,
                self.iq_vec.len()
            )
            .into());
        }
        Ok(&self.iq_vec[lo..hi])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_file(name: &str, bytes: &[u8]) -> PathBuf {
        let path = std::env::temp_dir().join(format!("gnss-acq-{}-{}", std::process::id(), name));
        let mut f = File::create(&path).unwrap();
        f.write_all(bytes).unwrap();
        path
    }

    #[test]
    fn file_type_round_trip() {
        for s in ["2xf32", "2xi16", "2xi8", "i8"] {
            assert_eq!(s.parse::<IQFileType>().unwrap().to_string(), s);
        }
        assert!("3xi8".parse::<IQFileType>().is_err());
    }

    #[test]
    fn read_int8_pairs() {
        let path = temp_file("2xi8", &[127, 129, 0, 127, 5]);
        let mut rec = IQRecording::new(path.clone(), 2000.0, IQFileType::TypePairInt8);
        rec.read_iq_file(None).unwrap();
        std::fs::remove_file(path).unwrap();

        // trailing odd byte is dropped
        assert_eq!(
            rec.iq_vec,
            vec![Complex64::new(1.0, -1.0), Complex64::new(0.0, 1.0)]
        );
    }

    #[test]
    fn read_float_pairs_with_limit() {
        let mut bytes = vec![];
        for v in [0.5f32, -0.25, 1.5, 2.0, 3.0, 4.0] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        let path = temp_file("2xf32", &bytes);
        let mut rec = IQRecording::new(path.clone(), 1000.0, IQFileType::TypePairFloat32);
        rec.read_iq_file(Some(2)).unwrap();
        std::fs::remove_file(path).unwrap();

        assert_eq!(
            rec.iq_vec,
            vec![Complex64::new(0.5, -0.25), Complex64::new(1.5, 2.0)]
        );
        assert_eq!(rec.get_msec_sample(1, 1).unwrap(), &rec.iq_vec[1..2]);
        assert!(rec.get_msec_sample(1, 2).is_err());
    }

    #[test]
    fn missing_file() {
        let mut rec = IQRecording::new(PathBuf::from("/nonexistent/iq"), 1e6, IQFileType::TypeOneInt8);
        assert!(rec.read_iq_file(None).is_err());
    }
}
