//! Scaling of raw sample buffers to 8-bit display buffers.

use crate::frame::RawFrame;

/// Fixed log-mode ceiling: `log10(65536)`, the full 16-bit range.
///
/// Using a fixed reference instead of the buffer's own log-range keeps
/// two independently scaled buffers visually comparable.
const LOG_CEILING: f64 = 4.816_479_930_623_699;

/// How raw sample values map onto the 8-bit display range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleMode {
    /// Linear map of an explicit `[min, max]` onto `[0, 255]`.
    Linear,
    /// `log10(x + 1)` then linear map of `[0, log10(65536)]` onto
    /// `[0, 255]`.
    Log,
    /// Linear map of the buffer's own `[min, max]` onto `[0, 255]`.
    Normalize,
    /// Normalization stretch followed by classic histogram
    /// equalization over 256 bins.
    Equalize,
}

/// Explicit scaling bounds for [`ScaleMode::Linear`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Sample value mapped to 0.
    pub min: f64,
    /// Sample value mapped to 255.
    pub max: f64,
}

/// An 8-bit grayscale buffer ready for display or encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayImage {
    pixels: Vec<u8>,
    width: usize,
    height: usize,
}

impl DisplayImage {
    pub(crate) fn new(pixels: Vec<u8>, width: usize, height: usize) -> Self {
        debug_assert_eq!(pixels.len(), width * height);
        Self {
            pixels,
            width,
            height,
        }
    }

    /// Pixel buffer in row-major order.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Pixel at a (row, column) position.
    ///
    /// # Panics
    /// Panics when the position is out of bounds.
    pub fn pixel(&self, row: usize, col: usize) -> u8 {
        self.pixels[row * self.width + col]
    }
}

/// Maps a raw buffer onto an 8-bit display buffer.
///
/// The output always has the input's width and height and every output
/// value lies in `[0, 255]`. Degenerate input (constant buffer, or
/// linear bounds with `max <= min`) produces an all-zero image rather
/// than an error. `bounds` applies to [`ScaleMode::Linear`] only; when
/// absent, linear falls back to the buffer's own extremes.
pub fn scale(frame: &RawFrame, mode: ScaleMode, bounds: Option<Bounds>) -> DisplayImage {
    let samples = frame.samples();
    let pixels = match mode {
        ScaleMode::Linear => {
            let bounds = bounds.unwrap_or_else(|| buffer_bounds(samples));
            linear_map(samples, bounds)
        }
        ScaleMode::Log => samples
            .iter()
            .map(|&v| to_u8((f64::from(v) + 1.0).log10() / LOG_CEILING * 255.0))
            .collect(),
        ScaleMode::Normalize => linear_map(samples, buffer_bounds(samples)),
        ScaleMode::Equalize => equalize(&linear_map(samples, buffer_bounds(samples))),
    };

    tracing::trace!(
        source = %frame.source().display(),
        ?mode,
        width = frame.width(),
        height = frame.height(),
        "Scaled frame for display"
    );

    DisplayImage::new(pixels, frame.width(), frame.height())
}

fn buffer_bounds(samples: &[u16]) -> Bounds {
    let mut min = u16::MAX;
    let mut max = u16::MIN;
    for &v in samples {
        min = min.min(v);
        max = max.max(v);
    }
    Bounds {
        min: f64::from(min),
        max: f64::from(max),
    }
}

fn linear_map(samples: &[u16], bounds: Bounds) -> Vec<u8> {
    let range = bounds.max - bounds.min;
    if range <= 0.0 {
        return vec![0; samples.len()];
    }
    samples
        .iter()
        .map(|&v| to_u8((f64::from(v) - bounds.min) / range * 255.0))
        .collect()
}

/// Classic histogram equalization over an already 8-bit buffer.
fn equalize(pixels: &[u8]) -> Vec<u8> {
    let mut histogram = [0u64; 256];
    for &p in pixels {
        histogram[usize::from(p)] += 1;
    }

    let mut cumulative = [0u64; 256];
    let mut running = 0u64;
    for (bin, &count) in histogram.iter().enumerate() {
        running += count;
        cumulative[bin] = running;
    }

    let total = pixels.len() as u64;
    let cdf_min = cumulative
        .iter()
        .copied()
        .find(|&c| c > 0)
        .unwrap_or(total);
    if total == cdf_min {
        // Single occupied bin: no contrast to redistribute.
        return vec![0; pixels.len()];
    }

    let mut lut = [0u8; 256];
    for bin in 0..256 {
        let mapped = (cumulative[bin] - cdf_min) as f64 / (total - cdf_min) as f64 * 255.0;
        lut[bin] = to_u8(mapped);
    }

    pixels.iter().map(|&p| lut[usize::from(p)]).collect()
}

/// Round-then-clamp conversion shared by every mode.
fn to_u8(value: f64) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(samples: Vec<u16>, width: usize, height: usize) -> RawFrame {
        RawFrame::new(samples, width, height, 16, "/tmp/a.dng")
    }

    #[test]
    fn test_linear_with_explicit_bounds() {
        let f = frame(vec![0, 500, 1000, 1000], 2, 2);
        let image = scale(
            &f,
            ScaleMode::Linear,
            Some(Bounds {
                min: 0.0,
                max: 1000.0,
            }),
        );
        // 500 / 1000 * 255 = 127.5, rounds to 128
        assert_eq!(image.pixels(), &[0, 128, 255, 255]);
    }

    #[test]
    fn test_linear_clamps_outside_bounds() {
        let f = frame(vec![0, 2000], 2, 1);
        let image = scale(
            &f,
            ScaleMode::Linear,
            Some(Bounds {
                min: 100.0,
                max: 1000.0,
            }),
        );
        assert_eq!(image.pixels(), &[0, 255]);
    }

    #[test]
    fn test_linear_degenerate_bounds_all_zero() {
        let f = frame(vec![10, 20, 30, 40], 2, 2);
        let image = scale(
            &f,
            ScaleMode::Linear,
            Some(Bounds {
                min: 50.0,
                max: 50.0,
            }),
        );
        assert_eq!(image.pixels(), &[0, 0, 0, 0]);
    }

    #[test]
    fn test_log_fixed_ceiling() {
        let f = frame(vec![0, 65535], 2, 1);
        let image = scale(&f, ScaleMode::Log, None);
        assert_eq!(image.pixel(0, 0), 0);
        assert_eq!(image.pixel(0, 1), 255);

        // 999 + 1 = 1000: log10 = 3, 3 / log10(65536) * 255 ~ 158.8
        let mid = scale(&frame(vec![999], 1, 1), ScaleMode::Log, None);
        assert_eq!(mid.pixel(0, 0), 159);
    }

    #[test]
    fn test_normalize_full_stretch() {
        let f = frame(vec![100, 150, 200, 200], 2, 2);
        let image = scale(&f, ScaleMode::Normalize, None);
        assert_eq!(image.pixels(), &[0, 128, 255, 255]);
    }

    #[test]
    fn test_constant_buffer_all_zero_every_mode() {
        let f = frame(vec![777; 16], 4, 4);
        for mode in [ScaleMode::Linear, ScaleMode::Normalize, ScaleMode::Equalize] {
            let image = scale(&f, mode, None);
            assert!(
                image.pixels().iter().all(|&p| p == 0),
                "constant input must scale to all-zero under {mode:?}"
            );
        }
        // Log of a constant is constant but well-defined, not zero
        let log = scale(&f, ScaleMode::Log, None);
        assert!(log.pixels().iter().all(|&p| p == log.pixel(0, 0)));
    }

    #[test]
    fn test_equalize_two_level_buffer() {
        // 12 dark + 4 bright: equalization pushes dark to its CDF
        // position and bright to 255
        let mut samples = vec![100u16; 16];
        for s in samples.iter_mut().take(4) {
            *s = 900;
        }
        let image = scale(&frame(samples, 4, 4), ScaleMode::Equalize, None);
        let bright = image.pixel(0, 0);
        let dark = image.pixel(3, 3);
        assert_eq!(bright, 255);
        assert_eq!(dark, 0);
    }

    #[test]
    fn test_output_dimensions_match_input() {
        let f = frame(vec![0; 15], 5, 3);
        for mode in [
            ScaleMode::Linear,
            ScaleMode::Log,
            ScaleMode::Normalize,
            ScaleMode::Equalize,
        ] {
            let image = scale(&f, mode, None);
            assert_eq!(image.width(), 5);
            assert_eq!(image.height(), 3);
            assert_eq!(image.pixels().len(), 15);
        }
    }

    proptest::proptest! {
        #[test]
        fn prop_scale_preserves_shape_and_stretch(
            samples in proptest::collection::vec(proptest::prelude::any::<u16>(), 1..256)
        ) {
            let len = samples.len();
            let f = frame(samples.clone(), len, 1);
            let constant = samples.iter().all(|&v| v == samples[0]);

            for mode in [
                ScaleMode::Linear,
                ScaleMode::Log,
                ScaleMode::Normalize,
                ScaleMode::Equalize,
            ] {
                let image = scale(&f, mode, None);
                proptest::prop_assert_eq!(image.pixels().len(), len);
                if constant && mode != ScaleMode::Log {
                    proptest::prop_assert!(image.pixels().iter().all(|&p| p == 0));
                }
            }

            if !constant {
                // Normalization is a full-contrast stretch
                let image = scale(&f, ScaleMode::Normalize, None);
                proptest::prop_assert!(image.pixels().contains(&0));
                proptest::prop_assert!(image.pixels().contains(&255));
            }
        }
    }

    #[test]
    fn test_range_law_arbitrary_input() {
        let samples: Vec<u16> = (0..256).map(|i| (i * 257) as u16).collect();
        let f = frame(samples, 16, 16);
        for mode in [
            ScaleMode::Linear,
            ScaleMode::Log,
            ScaleMode::Normalize,
            ScaleMode::Equalize,
        ] {
            let image = scale(&f, mode, None);
            assert_eq!(image.pixels().len(), 256);
            // u8 output makes the range law structural; check the
            // extremes land where the stretch puts them
            assert!(image.pixels().contains(&0) || mode == ScaleMode::Log);
        }
    }
}
