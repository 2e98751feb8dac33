pub mod acquisition;
pub mod code;
pub mod constants;
pub mod error;
pub mod gold_code;
pub mod mitigation;
pub mod notch;
pub mod recording;
pub mod threshold;
pub mod types;
pub mod util;

pub use crate::acquisition::{
    AcquisitionConfig, CorrelationEngine, accumulate_non_coherent, compute_search_space,
    try_acquisition_one_sat,
};
pub use crate::code::resample_code;
pub use crate::error::AcqError;
pub use crate::gold_code::gen_code;
pub use crate::mitigation::Mitigation;
pub use crate::notch::AdaptiveNotch;
pub use crate::threshold::{estimate_noise_variance, normalized_decision_threshold};
pub use crate::types::{AcquisitionResult, CafPeak, DopplerGrid, SearchSpace};
