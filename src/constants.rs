pub const PRN_CODE_LEN: usize = 1023;
pub const NUM_GPS_SATS: usize = 32;

pub const L1CA_CHIP_RATE_HZ: f64 = 1.023e6;
pub const L1CA_CODE_SEC: f64 = 1e-3;

// used by both the time and frequency domain clipping front ends
pub const CLIPPING_EPSILON: f64 = 1e-6;
