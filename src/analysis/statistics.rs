//! Noise statistics and the derived dynamic-range metric.

use crate::calibration::Calibration;
use crate::frame::RawFrame;

/// Noise statistics for one (post-crop) frame.
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseStatistics {
    /// Population mean over every sample.
    pub mean: f64,
    /// Population standard deviation over every sample.
    pub std: f64,
    /// Smallest sample value.
    pub min: u16,
    /// Largest sample value.
    pub max: u16,
    /// Exposure value: `log2((white - black) / std)`.
    ///
    /// Present iff the white level is known, finite and above the
    /// black level, and `std > 0`; absent otherwise, never a NaN or
    /// sentinel.
    pub ev: Option<f64>,
}

impl NoiseStatistics {
    /// Computes statistics over every sample of a frame.
    ///
    /// Deterministic and pure; tolerates any rectangular buffer of at
    /// least one sample.
    pub fn compute(frame: &RawFrame, calibration: &Calibration) -> Self {
        let samples = frame.samples();
        let n = samples.len() as f64;

        let mut min = u16::MAX;
        let mut max = u16::MIN;
        let mut sum = 0.0f64;
        for &v in samples {
            min = min.min(v);
            max = max.max(v);
            sum += f64::from(v);
        }
        let mean = sum / n;

        let sum_sq: f64 = samples
            .iter()
            .map(|&v| {
                let d = f64::from(v) - mean;
                d * d
            })
            .sum();
        let std = (sum_sq / n).sqrt();

        let ev = match calibration.white_level {
            // A profile can supply a black level at or above the white
            // level; the ratio is then meaningless, so EV stays absent
            // rather than becoming NaN or -inf.
            Some(white) if white.is_finite() && std > 0.0 && white > calibration.black_level => {
                Some(((white - calibration.black_level) / std).log2())
            }
            _ => None,
        };

        Self {
            mean,
            std,
            min,
            max,
            ev,
        }
    }
}
