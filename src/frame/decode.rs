//! Raw file decoding behind a trait seam.
//!
//! The decoder is treated as an external collaborator: it turns a file
//! path into a [`RawFrame`] and nothing else. A mock implementation
//! generates deterministic synthetic frames for testing.

use super::RawFrame;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while decoding a raw file.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The file does not exist at the given path.
    #[error("raw file not found: {0}")]
    NotFound(PathBuf),
    /// The decoder rejected or failed to parse the file.
    #[error("failed to decode {path}: {reason}")]
    Failed {
        /// The file that failed to decode.
        path: PathBuf,
        /// Decoder-reported reason.
        reason: String,
    },
}

/// Trait for raw file decoders.
///
/// `preview` requests a lower-fidelity buffer suitable for thumbnails;
/// implementations may return reduced-resolution data in that mode.
pub trait RawDecoder {
    /// Decodes the file at `path` into a raw sensor frame.
    fn decode(&self, path: &Path, preview: bool) -> Result<RawFrame, DecodeError>;
}

/// Decoder backed by the `rawloader` crate.
#[derive(Debug, Default)]
pub struct RawloaderDecoder;

impl RawloaderDecoder {
    /// Creates a new rawloader-backed decoder.
    pub fn new() -> Self {
        Self
    }
}

impl RawDecoder for RawloaderDecoder {
    fn decode(&self, path: &Path, preview: bool) -> Result<RawFrame, DecodeError> {
        if !path.exists() {
            return Err(DecodeError::NotFound(path.to_path_buf()));
        }

        let raw = rawloader::decode_file(path).map_err(|e| DecodeError::Failed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let width = raw.width;
        let height = raw.height;

        // Normalize sample data to u16 regardless of the decoder's
        // internal representation.
        let samples: Vec<u16> = match raw.data {
            rawloader::RawImageData::Integer(values) => values,
            rawloader::RawImageData::Float(values) => values
                .iter()
                .map(|&v| (v * 65535.0).clamp(0.0, 65535.0) as u16)
                .collect(),
        };

        let bit_depth = if raw.whitelevels[0] <= 255 { 8 } else { 16 };
        let black_levels = raw.blacklevels.to_vec();
        let white_levels = raw.whitelevels.to_vec();

        let frame = RawFrame::new(samples, width, height, bit_depth, path)
            .with_levels(black_levels, white_levels)
            .with_camera_model(raw.clean_model);

        tracing::debug!(
            path = %path.display(),
            width,
            height,
            preview,
            "Decoded raw file"
        );

        if preview {
            // rawloader has no embedded-thumbnail extraction, so fast
            // preview is a 2x2 box downsample of the full sensor data.
            return Ok(half_size(&frame));
        }
        Ok(frame)
    }
}

/// Averages 2x2 sample blocks into a half-resolution frame.
fn half_size(frame: &RawFrame) -> RawFrame {
    let width = (frame.width() / 2).max(1);
    let height = (frame.height() / 2).max(1);
    let mut samples = Vec::with_capacity(width * height);

    for row in 0..height {
        for col in 0..width {
            let r = row * 2;
            let c = col * 2;
            let mut sum = u32::from(frame.sample(r, c));
            let mut count = 1u32;
            if c + 1 < frame.width() {
                sum += u32::from(frame.sample(r, c + 1));
                count += 1;
            }
            if r + 1 < frame.height() {
                sum += u32::from(frame.sample(r + 1, c));
                count += 1;
            }
            if c + 1 < frame.width() && r + 1 < frame.height() {
                sum += u32::from(frame.sample(r + 1, c + 1));
                count += 1;
            }
            samples.push((sum / count) as u16);
        }
    }

    frame.derived(samples, width, height, false)
}

/// Mock decoder that generates synthetic frames for testing.
///
/// Frames are deterministic for a given configuration and independent
/// of the file's actual content, so tests can exercise pipelines with
/// plain fixture files.
#[derive(Debug, Clone)]
pub struct MockDecoder {
    /// Frame width to generate.
    width: usize,
    /// Frame height to generate.
    height: usize,
    /// Base sample value for every pixel.
    base: u16,
    /// Extra (row, col, value) samples overriding the base pattern.
    hot_pixels: Vec<(usize, usize, u16)>,
    /// Camera model string reported on generated frames.
    model: String,
}

impl MockDecoder {
    /// Creates a mock decoder producing uniform frames of the given size.
    pub fn new(width: usize, height: usize, base: u16) -> Self {
        Self {
            width,
            height,
            base,
            hot_pixels: Vec::new(),
            model: "MOCK SENSOR".to_string(),
        }
    }

    /// Overrides individual samples, e.g. to plant outliers.
    pub fn with_hot_pixels(mut self, hot_pixels: Vec<(usize, usize, u16)>) -> Self {
        self.hot_pixels = hot_pixels;
        self
    }

    /// Sets the camera model string reported on generated frames.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

impl RawDecoder for MockDecoder {
    fn decode(&self, path: &Path, preview: bool) -> Result<RawFrame, DecodeError> {
        let mut samples = vec![self.base; self.width * self.height];
        for &(row, col, value) in &self.hot_pixels {
            if row < self.height && col < self.width {
                samples[row * self.width + col] = value;
            }
        }
        let frame = RawFrame::new(samples, self.width, self.height, 16, path)
            .with_levels(vec![0; 4], vec![65535; 4])
            .with_camera_model(self.model.clone());
        if preview {
            return Ok(half_size(&frame));
        }
        Ok(frame)
    }
}
