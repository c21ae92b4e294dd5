//! Leaky pixel detection and neighbor-based repair.
//!
//! A leaky (outlier) pixel reads abnormally higher than the sensor's
//! noise distribution predicts. Detection thresholds on a sigma
//! multiple of the unrepaired buffer's statistics; repair replaces
//! flagged pixels with the mean of their in-bounds 8-neighborhood,
//! always reading neighbor values from the original snapshot so the
//! result cannot depend on repair order.

use super::NoiseStatistics;
use crate::calibration::Calibration;
use crate::frame::RawFrame;

/// One detected outlier sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outlier {
    /// Row index in the scanned buffer.
    pub row: usize,
    /// Column index in the scanned buffer.
    pub col: usize,
    /// The sample value that exceeded the threshold.
    pub value: u16,
}

/// Result of an outlier scan.
#[derive(Debug, Clone)]
pub struct OutlierReport {
    /// Sigma multiple the scan used.
    pub sigma: f64,
    /// Detection threshold: `mean + sigma * std`.
    pub threshold: f64,
    /// Samples strictly above the threshold, sorted by value
    /// descending. Order among equal values follows row-major scan
    /// order but is not otherwise specified.
    pub outliers: Vec<Outlier>,
    /// Count a Gaussian noise model would predict above the threshold:
    /// `pixels * (1 - phi(sigma))`. Display reference only; no
    /// decision is based on it.
    pub expected_count: f64,
}

/// Scans a frame for samples exceeding `mean + sigma * std`.
///
/// Statistics come from the unrepaired buffer; repairing and
/// re-detecting with the same sigma must never feed a repair back into
/// its own threshold. `sigma` must be positive (6, 9 and 12 are the
/// recommended choices, but any positive value is accepted).
pub fn detect(frame: &RawFrame, sigma: f64) -> OutlierReport {
    debug_assert!(sigma > 0.0, "sigma must be positive");

    // The threshold only needs mean/std; calibration plays no part here.
    let stats = NoiseStatistics::compute(
        frame,
        &Calibration {
            black_level: 0.0,
            white_level: None,
            crop: None,
        },
    );
    let threshold = stats.mean + sigma * stats.std;

    let mut outliers = Vec::new();
    for row in 0..frame.height() {
        for col in 0..frame.width() {
            let value = frame.sample(row, col);
            if f64::from(value) > threshold {
                outliers.push(Outlier { row, col, value });
            }
        }
    }
    // Stable sort keeps row-major order among equal values.
    outliers.sort_by(|a, b| b.value.cmp(&a.value));

    let expected_count = frame.sample_count() as f64 * (1.0 - normal_cdf(sigma));

    tracing::debug!(
        source = %frame.source().display(),
        sigma,
        threshold,
        found = outliers.len(),
        expected = expected_count,
        "Outlier scan complete"
    );

    OutlierReport {
        sigma,
        threshold,
        outliers,
        expected_count,
    }
}

/// Replaces each outlier with the rounded mean of its in-bounds
/// 8-neighborhood, producing a new frame.
///
/// Neighbor values are always read from the input frame, never from a
/// partially repaired buffer; edge and corner pixels use the fewer
/// neighbors they have. An empty outlier list yields a copy of the
/// input, and no non-outlier pixel is ever modified.
pub fn repair(frame: &RawFrame, outliers: &[Outlier]) -> RawFrame {
    let mut repaired = frame.samples().to_vec();

    for outlier in outliers {
        let mut sum = 0u32;
        let mut count = 0u32;
        for dr in -1i64..=1 {
            for dc in -1i64..=1 {
                if dr == 0 && dc == 0 {
                    continue;
                }
                let r = outlier.row as i64 + dr;
                let c = outlier.col as i64 + dc;
                if r < 0 || c < 0 || r >= frame.height() as i64 || c >= frame.width() as i64 {
                    continue;
                }
                sum += u32::from(frame.sample(r as usize, c as usize));
                count += 1;
            }
        }
        if count > 0 {
            let mean = (f64::from(sum) / f64::from(count)).round() as u16;
            repaired[outlier.row * frame.width() + outlier.col] = mean;
        }
    }

    frame.derived(repaired, frame.width(), frame.height(), frame.is_cropped())
}

/// Standard normal CDF via the Abramowitz & Stegun 7.1.26 erf
/// approximation (max absolute error ~1.5e-7, ample for a display
/// reference count).
fn normal_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x / std::f64::consts::SQRT_2))
}

fn erf(x: f64) -> f64 {
    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    const A1: f64 = 0.254829592;
    const A2: f64 = -0.284496736;
    const A3: f64 = 1.421413741;
    const A4: f64 = -1.453152027;
    const A5: f64 = 1.061405429;
    const P: f64 = 0.3275911;

    let t = 1.0 / (1.0 + P * x);
    let y = 1.0 - (((((A5 * t + A4) * t) + A3) * t + A2) * t + A1) * t * (-x * x).exp();
    sign * y
}
