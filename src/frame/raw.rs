//! Raw frame type holding undemosaiced sensor samples.

use std::path::{Path, PathBuf};

/// A single decoded raw sensor frame.
///
/// Holds one channel of row-major integer samples straight from the
/// sensor, before any color processing. Frames are immutable once
/// built; transforms (crop, repair) produce new frames.
#[derive(Clone)]
pub struct RawFrame {
    /// Row-major sensor samples.
    samples: Vec<u16>,
    /// Frame width in samples.
    width: usize,
    /// Frame height in samples.
    height: usize,
    /// Sample bit depth (8 or 16).
    bit_depth: u8,
    /// Source file this frame was decoded from.
    source: PathBuf,
    /// Sensor-embedded per-channel black levels, if the decoder provided them.
    black_levels: Vec<u16>,
    /// Sensor-embedded per-channel white levels, if the decoder provided them.
    white_levels: Vec<u16>,
    /// Camera model string reported by the decoder.
    camera_model: Option<String>,
    /// Whether a camera crop has already been applied to this buffer.
    cropped: bool,
}

impl RawFrame {
    /// Creates a frame from raw samples and dimensions.
    pub fn new(
        samples: Vec<u16>,
        width: usize,
        height: usize,
        bit_depth: u8,
        source: impl Into<PathBuf>,
    ) -> Self {
        Self {
            samples,
            width,
            height,
            bit_depth,
            source: source.into(),
            black_levels: Vec::new(),
            white_levels: Vec::new(),
            camera_model: None,
            cropped: false,
        }
    }

    /// Attaches sensor-embedded black and white levels.
    pub fn with_levels(mut self, black: Vec<u16>, white: Vec<u16>) -> Self {
        self.black_levels = black;
        self.white_levels = white;
        self
    }

    /// Attaches the decoder-reported camera model string.
    pub fn with_camera_model(mut self, model: impl Into<String>) -> Self {
        self.camera_model = Some(model.into());
        self
    }

    /// Returns the raw samples in row-major order.
    #[inline]
    pub fn samples(&self) -> &[u16] {
        &self.samples
    }

    /// Returns the frame width.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the frame height.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the sample bit depth.
    #[inline]
    pub fn bit_depth(&self) -> u8 {
        self.bit_depth
    }

    /// Returns the source file path.
    #[inline]
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Returns the sample at the given row and column.
    ///
    /// # Panics
    ///
    /// Panics if the position is out of bounds.
    #[inline]
    pub fn sample(&self, row: usize, col: usize) -> u16 {
        self.samples[row * self.width + col]
    }

    /// Returns the first-channel embedded black level, if known.
    pub fn embedded_black_level(&self) -> Option<f64> {
        self.black_levels.first().map(|&v| f64::from(v))
    }

    /// Returns the first-channel embedded white level, if known.
    pub fn embedded_white_level(&self) -> Option<f64> {
        self.white_levels.first().map(|&v| f64::from(v))
    }

    /// Returns the camera model string, if the decoder reported one.
    pub fn camera_model(&self) -> Option<&str> {
        self.camera_model.as_deref()
    }

    /// Returns true if a camera crop has already been applied.
    #[inline]
    pub fn is_cropped(&self) -> bool {
        self.cropped
    }

    /// Returns the total number of samples (width * height).
    #[inline]
    pub fn sample_count(&self) -> usize {
        self.width * self.height
    }

    /// Validates that the sample buffer size matches the dimensions.
    pub fn is_valid(&self) -> bool {
        self.samples.len() == self.sample_count()
    }

    /// Builds a sibling frame with replaced samples and dimensions,
    /// keeping source identity and calibration context.
    pub(crate) fn derived(
        &self,
        samples: Vec<u16>,
        width: usize,
        height: usize,
        cropped: bool,
    ) -> Self {
        Self {
            samples,
            width,
            height,
            bit_depth: self.bit_depth,
            source: self.source.clone(),
            black_levels: self.black_levels.clone(),
            white_levels: self.white_levels.clone(),
            camera_model: self.camera_model.clone(),
            cropped,
        }
    }
}

impl std::fmt::Debug for RawFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bit_depth", &self.bit_depth)
            .field("source", &self.source)
            .field("camera_model", &self.camera_model)
            .field("cropped", &self.cropped)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_creation() {
        let frame = RawFrame::new(vec![0u16; 640 * 480], 640, 480, 16, "/tmp/a.dng");
        assert_eq!(frame.width(), 640);
        assert_eq!(frame.height(), 480);
        assert_eq!(frame.bit_depth(), 16);
        assert!(frame.is_valid());
        assert!(!frame.is_cropped());
    }

    #[test]
    fn test_frame_invalid_size() {
        let frame = RawFrame::new(vec![0u16; 100], 640, 480, 16, "/tmp/a.dng");
        assert!(!frame.is_valid());
    }

    #[test]
    fn test_sample_indexing() {
        let samples: Vec<u16> = (0..12).collect();
        let frame = RawFrame::new(samples, 4, 3, 16, "/tmp/a.dng");
        assert_eq!(frame.sample(0, 0), 0);
        assert_eq!(frame.sample(1, 2), 6);
        assert_eq!(frame.sample(2, 3), 11);
    }

    #[test]
    fn test_embedded_levels() {
        let frame = RawFrame::new(vec![0u16; 4], 2, 2, 16, "/tmp/a.dng")
            .with_levels(vec![64, 64, 64, 64], vec![16383, 16383, 16383, 16383]);
        assert_eq!(frame.embedded_black_level(), Some(64.0));
        assert_eq!(frame.embedded_white_level(), Some(16383.0));
    }

    #[test]
    fn test_missing_levels_are_none() {
        let frame = RawFrame::new(vec![0u16; 4], 2, 2, 16, "/tmp/a.dng");
        assert_eq!(frame.embedded_black_level(), None);
        assert_eq!(frame.embedded_white_level(), None);
    }
}
