use crate::constants::NUM_GPS_SATS;
use crate::constants::PRN_CODE_LEN;
use crate::error::AcqError;

// 1-indexed register stages
const G1_TAP: [usize; 2] = [3, 10];
const G2_TAP: [usize; 6] = [2, 3, 6, 8, 9, 10];
const PRN_TO_G2_TAP: [(usize, usize); NUM_GPS_SATS] = [
    (2, 6),
    (3, 7),
    (4, 8),
    (5, 9),
    (1, 9),
    (2, 10),
    (1, 8),
    (2, 9),
    (3, 10),
    (2, 3),
    (3, 4),
    (5, 6),
    (6, 7),
    (7, 8),
    (8, 9),
    (9, 10),
    (1, 4),
    (2, 5),
    (3, 6),
    (4, 7),
    (5, 8),
    (6, 9),
    (1, 3),
    (4, 6),
    (5, 7),
    (6, 8),
    (7, 9),
    (8, 10),
    (1, 6),
    (2, 7),
    (3, 8),
    (4, 9),
];

fn check_prn(prn: usize) -> Result<(), AcqError> {
    if prn == 0 || prn > NUM_GPS_SATS {
        return Err(AcqError::invalid(format!(
            "satellite index {} outside [1, {}]",
            prn, NUM_GPS_SATS
        )));
    }
    Ok(())
}

/// Raw {0,1} chips of the L1 C/A code for `prn`.
pub fn gen_code_bits(prn: usize) -> Result<Vec<u8>, AcqError> {
    check_prn(prn)?;
    let (tap1, tap2) = PRN_TO_G2_TAP[prn - 1];

    let mut g1 = [1u8; 10];
    let mut g2 = [1u8; 10];
    let mut g = Vec::with_capacity(PRN_CODE_LEN);

    for _i in 0..PRN_CODE_LEN {
        g.push(g1[9] ^ g2[tap1 - 1] ^ g2[tap2 - 1]);

        let v = G1_TAP.iter().fold(0, |acc, &x| acc ^ g1[x - 1]);
        g1.rotate_right(1);
        g1[0] = v;

        let v = G2_TAP.iter().fold(0, |acc, &x| acc ^ g2[x - 1]);
        g2.rotate_right(1);
        g2[0] = v;
    }
    Ok(g)
}

/// Bipolar (+1/-1) L1 C/A code for satellite `prn` in [1, 32].
pub fn gen_code(prn: usize) -> Result<Vec<f64>, AcqError> {
    let bits = gen_code_bits(prn)?;
    Ok(bits.iter().map(|&b| 1.0 - 2.0 * b as f64).collect())
}

pub struct GoldCode {
    codes: Vec<Vec<f64>>,
}

impl GoldCode {
    pub fn new() -> Self {
        let codes = (1..=NUM_GPS_SATS)
            .map(|prn| gen_code(prn).unwrap_or_default())
            .collect();
        Self { codes }
    }

    pub fn get_code(&self, prn: usize) -> Result<&[f64], AcqError> {
        check_prn(prn)?;
        Ok(&self.codes[prn - 1])
    }

    pub fn print_gold_codes(&self) {
        println!("generating gold codes");
        for (i, code) in self.codes.iter().enumerate() {
            let bits: Vec<u8> = code[0..20].iter().map(|&c| (c < 0.0) as u8).collect();
            println!("  code-{:02}: {:?}", i + 1, bits);
        }
    }
}

impl Default for GoldCode {
    fn default() -> Self {
        Self::new()
    }
}
