use colored::Colorize;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use std::path::PathBuf;
use std::time::Instant;
use structopt::StructOpt;

use gnss_acq::acquisition::{AcquisitionConfig, try_acquisition_one_sat};
use gnss_acq::constants::NUM_GPS_SATS;
use gnss_acq::gold_code::GoldCode;
use gnss_acq::mitigation::Mitigation;
use gnss_acq::recording::{IQFileType, IQRecording};
use gnss_acq::types::{AcquisitionResult, DopplerGrid};

#[derive(StructOpt, Debug)]
#[structopt(name = "gnss-acq", about = "GPS L1 C/A acquisition")]
struct Options {
    #[structopt(long, default_value = "nov_3_time_18_48_st_ives")]
    file: PathBuf,
    #[structopt(long, default_value = "2xi8")]
    file_type: IQFileType,
    #[structopt(long, default_value = "2046000")]
    sample_rate: f64,
    #[structopt(long, default_value = "0")]
    if_freq: f64,
    /// 0 searches all satellites
    #[structopt(short = "p", long, default_value = "0")]
    prn: usize,
    #[structopt(long, default_value = "41")]
    doppler_bins: usize,
    #[structopt(long, default_value = "500")]
    doppler_step: f64,
    #[structopt(short = "k", long, default_value = "1")]
    non_coherent: usize,
    #[structopt(long, default_value = "0.01")]
    pfa: f64,
    /// none, anf[:ka], fdcs, fdpb:th, tdcs, tdpb:th
    #[structopt(short = "m", long, default_value = "none")]
    mitigation: Mitigation,
    #[structopt(long, default_value = "0")]
    seed: u64,
    #[structopt(long, default_value = "0")]
    off_msec: usize,
    #[structopt(long)]
    print_codes: bool,
}

fn print_result(res: &AcquisitionResult) {
    let status = if res.detected {
        "DETECTED".green()
    } else {
        "--------".normal()
    };
    println!(
        "  sat {}: {} dopp={:6.0}Hz code_idx={:5} chips={:7.2} stat={:8.2} th={:.2}",
        format!("{:2}", res.prn).yellow(),
        status,
        res.doppler_hz,
        res.code_phase_idx,
        res.code_phase_chips,
        res.test_statistic,
        res.threshold,
    );
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let opt = Options::from_args();

    let gold_code = GoldCode::new();
    if opt.print_codes {
        gold_code.print_gold_codes();
        return Ok(());
    }

    let cfg = AcquisitionConfig {
        fs: opt.sample_rate,
        fi: opt.if_freq,
        grid: DopplerGrid::new(opt.doppler_bins, opt.doppler_step)?,
        num_non_coherent: opt.non_coherent,
        pfa_sys: opt.pfa,
    };
    log::info!(
        "gnss-acq: file: {} ({}) fs={} fi={} bins={}x{}Hz K={} pfa={} mitigation={}",
        opt.file.display(),
        opt.file_type,
        cfg.fs,
        cfg.fi,
        cfg.grid.num_bins,
        cfg.grid.step_hz,
        cfg.num_non_coherent,
        cfg.pfa_sys,
        opt.mitigation,
    );

    let mut recording = IQRecording::new(opt.file.clone(), opt.sample_rate, opt.file_type);
    let num_msec = cfg.num_non_coherent;
    let max_samples = (opt.off_msec + num_msec) * recording.samples_per_msec();
    recording.read_iq_file(Some(max_samples))?;

    let data = opt
        .mitigation
        .apply(recording.get_msec_sample(opt.off_msec, num_msec)?)?;

    let prns: Vec<usize> = if opt.prn > 0 {
        vec![opt.prn]
    } else {
        (1..=NUM_GPS_SATS).collect()
    };

    let ts = Instant::now();
    let results: Vec<AcquisitionResult> = prns
        .par_iter()
        .map(|&prn| {
            let mut rng = StdRng::seed_from_u64(opt.seed.wrapping_add(prn as u64));
            try_acquisition_one_sat(&gold_code, &data, prn, &cfg, &mut rng)
        })
        .collect::<Result<_, _>>()?;
    log::info!("acq. took {} msec", ts.elapsed().as_millis());

    for res in &results {
        print_result(res);
    }
    let num_detected = results.iter().filter(|r| r.detected).count();
    println!(
        "{} of {} satellites detected",
        format!("{}", num_detected).green(),
        results.len()
    );
    Ok(())
}
