//! Noise analysis: per-frame statistics and leaky pixel handling.

mod outliers;
mod statistics;

pub use outliers::{detect, repair, Outlier, OutlierReport};
pub use statistics::NoiseStatistics;
