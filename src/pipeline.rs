//! Per-frame analysis and rendering pipelines.
//!
//! The [`Analyzer`] wires decoder, metadata provider and cache into the
//! transform chain: decode, crop, statistics for analysis; decode,
//! crop, optional repair, scale for display. Each frame flows through
//! synchronously end to end.

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use crate::analysis::{self, NoiseStatistics, OutlierReport};
use crate::cache::{FrameCache, FrameKey, ThumbnailKey, Variant};
use crate::calibration::{self, Calibration, CalibrationProfile};
use crate::frame::{CropError, DecodeError, RawDecoder, RawFrame};
use crate::metadata::{MetadataError, MetadataProvider};
use crate::render::{self, Bounds, DisplayImage, ScaleMode};

/// Pipeline failures.
#[derive(Debug, Error)]
pub enum AnalyzeError {
    /// Raw decode failed.
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// Metadata read failed.
    #[error(transparent)]
    Metadata(#[from] MetadataError),
    /// A crop could not be applied.
    #[error(transparent)]
    Crop(#[from] CropError),
}

/// Result of analyzing one frame.
#[derive(Debug, Clone)]
pub struct FrameAnalysis {
    /// Calibration the analysis ran under.
    pub calibration: Calibration,
    /// Noise statistics of the cropped buffer.
    pub statistics: NoiseStatistics,
    /// Width of the analyzed (post-crop) buffer.
    pub width: usize,
    /// Height of the analyzed (post-crop) buffer.
    pub height: usize,
}

/// Display rendering options.
#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    /// Sample-to-display mapping.
    pub mode: ScaleMode,
    /// Render from the half-size preview decode instead of the full one.
    pub preview: bool,
    /// When set, detect outliers at this sigma and repair them before
    /// scaling.
    pub repair_sigma: Option<f64>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            mode: ScaleMode::Normalize,
            preview: false,
            repair_sigma: None,
        }
    }
}

/// Orchestrates decode, calibration, analysis and rendering for single
/// frames, with decoded frames and thumbnails cached in between.
pub struct Analyzer {
    decoder: Box<dyn RawDecoder>,
    metadata: Box<dyn MetadataProvider>,
    cache: FrameCache,
}

impl Analyzer {
    /// Creates an analyzer over the given collaborators.
    pub fn new(
        decoder: Box<dyn RawDecoder>,
        metadata: Box<dyn MetadataProvider>,
        cache: FrameCache,
    ) -> Self {
        Self {
            decoder,
            metadata,
            cache,
        }
    }

    /// Analyzes one frame: decode, resolve calibration, crop, compute
    /// statistics.
    pub fn analyze(
        &self,
        path: &Path,
        profile: Option<&CalibrationProfile>,
    ) -> Result<FrameAnalysis, AnalyzeError> {
        let frame = self.load_frame(path, false)?;
        let (calibration, cropped) = self.calibrate(path, &frame, profile)?;
        let statistics = NoiseStatistics::compute(&cropped, &calibration);

        tracing::info!(
            path = %path.display(),
            mean = statistics.mean,
            std = statistics.std,
            ev = ?statistics.ev,
            "Analyzed frame"
        );

        Ok(FrameAnalysis {
            calibration,
            statistics,
            width: cropped.width(),
            height: cropped.height(),
        })
    }

    /// Scans one frame for outliers at the given sigma, on the cropped
    /// buffer.
    pub fn outliers(
        &self,
        path: &Path,
        sigma: f64,
        profile: Option<&CalibrationProfile>,
    ) -> Result<OutlierReport, AnalyzeError> {
        let frame = self.load_frame(path, false)?;
        let (_, cropped) = self.calibrate(path, &frame, profile)?;
        Ok(analysis::detect(&cropped, sigma))
    }

    /// Renders one frame to an 8-bit display buffer:
    /// decode, crop, optional repair, scale.
    pub fn render(
        &self,
        path: &Path,
        options: RenderOptions,
        profile: Option<&CalibrationProfile>,
    ) -> Result<DisplayImage, AnalyzeError> {
        let frame = self.load_frame(path, options.preview)?;
        let (calibration, mut cropped) = self.calibrate(path, &frame, profile)?;

        if let Some(sigma) = options.repair_sigma {
            let report = analysis::detect(&cropped, sigma);
            cropped = analysis::repair(&cropped, &report.outliers);
        }

        // Linear mode stretches the calibrated sensor range when both
        // ends are known; the other modes derive their own.
        let bounds = match (options.mode, calibration.white_level) {
            (ScaleMode::Linear, Some(white)) => Some(Bounds {
                min: calibration.black_level,
                max: white,
            }),
            _ => None,
        };

        Ok(render::scale(&cropped, options.mode, bounds))
    }

    /// Renders (or serves from cache) a thumbnail fitted to a bounding
    /// box, from the preview decode.
    pub fn thumbnail(
        &self,
        path: &Path,
        max_width: usize,
        max_height: usize,
    ) -> Result<Arc<DisplayImage>, AnalyzeError> {
        let key = ThumbnailKey {
            path: path.to_path_buf(),
            max_width,
            max_height,
        };
        if let Some(cached) = self.cache.get_thumbnail(&key) {
            tracing::trace!(path = %path.display(), "Thumbnail cache hit");
            return Ok(cached);
        }

        let image = self.render(
            path,
            RenderOptions {
                mode: ScaleMode::Normalize,
                preview: true,
                repair_sigma: None,
            },
            None,
        )?;
        let thumb = Arc::new(render::thumbnail(&image, max_width, max_height));
        self.cache.put_thumbnail(key, Arc::clone(&thumb));
        Ok(thumb)
    }

    /// The shared frame/thumbnail cache.
    pub fn cache(&self) -> &FrameCache {
        &self.cache
    }

    fn load_frame(&self, path: &Path, preview: bool) -> Result<Arc<RawFrame>, AnalyzeError> {
        let key = FrameKey {
            path: path.to_path_buf(),
            variant: if preview {
                Variant::Preview
            } else {
                Variant::Full
            },
        };
        if let Some(cached) = self.cache.get_frame(&key) {
            tracing::trace!(path = %path.display(), preview, "Frame cache hit");
            return Ok(cached);
        }

        let frame = Arc::new(self.decoder.decode(path, preview)?);
        self.cache.put_frame(key, Arc::clone(&frame));
        Ok(frame)
    }

    fn calibrate(
        &self,
        path: &Path,
        frame: &RawFrame,
        profile: Option<&CalibrationProfile>,
    ) -> Result<(Calibration, RawFrame), AnalyzeError> {
        let metadata = self.metadata.read(path)?;
        let calibration = calibration::resolve(frame, &metadata, profile);
        let cropped = frame.crop(calibration.crop.as_ref())?;
        Ok((calibration, cropped))
    }
}
