//! Camera-specific rectangular cropping.
//!
//! Sensor borders often carry masked pixels and readout artifacts that
//! would skew noise statistics. Crops are inclusive on both ends and
//! applied at most once per decoded buffer.

use super::RawFrame;
use thiserror::Error;

/// Crop application errors.
#[derive(Debug, Clone, Error)]
pub enum CropError {
    /// The frame already had a crop applied; re-cropping a cropped
    /// buffer would silently double-apply.
    #[error("frame was already cropped")]
    AlreadyCropped,
}

/// An inclusive crop rectangle.
///
/// Both maxima are the last included index, so the resulting width is
/// `x_max - x_min + 1`. Open-ended table entries use `usize::MAX` on an
/// axis and rely on clamping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    /// First included column.
    pub x_min: usize,
    /// Last included column.
    pub x_max: usize,
    /// First included row.
    pub y_min: usize,
    /// Last included row.
    pub y_max: usize,
}

impl CropRect {
    /// Creates a rectangle from inclusive bounds.
    pub fn new(x_min: usize, x_max: usize, y_min: usize, y_max: usize) -> Self {
        Self {
            x_min,
            x_max,
            y_min,
            y_max,
        }
    }

    /// Cropped width in samples.
    pub fn width(&self) -> usize {
        self.x_max - self.x_min + 1
    }

    /// Cropped height in samples.
    pub fn height(&self) -> usize {
        self.y_max - self.y_min + 1
    }

    /// Clamps the rectangle to a frame of the given extents.
    ///
    /// Returns `None` when the clamped rectangle would have zero or
    /// negative area, in which case the crop is treated as absent.
    pub fn clamped(&self, width: usize, height: usize) -> Option<CropRect> {
        if width == 0 || height == 0 {
            return None;
        }
        let x_max = self.x_max.min(width - 1);
        let y_max = self.y_max.min(height - 1);
        if self.x_min > x_max || self.y_min > y_max {
            return None;
        }
        Some(CropRect {
            x_min: self.x_min,
            x_max,
            y_min: self.y_min,
            y_max,
        })
    }
}

impl RawFrame {
    /// Applies a crop rectangle, producing a new frame.
    ///
    /// An absent rectangle (or one rejected by clamping) is a no-op
    /// returning a copy of the input. A rectangle is only ever applied
    /// once per decoded buffer; cropping an already-cropped frame is an
    /// error rather than a silent double-apply.
    pub fn crop(&self, rect: Option<&CropRect>) -> Result<RawFrame, CropError> {
        let rect = match rect.and_then(|r| r.clamped(self.width(), self.height())) {
            Some(r) => r,
            None => return Ok(self.clone()),
        };
        if self.is_cropped() {
            return Err(CropError::AlreadyCropped);
        }

        let width = rect.width();
        let height = rect.height();
        let mut samples = Vec::with_capacity(width * height);
        for row in rect.y_min..=rect.y_max {
            let start = row * self.width() + rect.x_min;
            samples.extend_from_slice(&self.samples()[start..start + width]);
        }

        tracing::trace!(
            source = %self.source().display(),
            width,
            height,
            "Applied crop"
        );
        Ok(self.derived(samples, width, height, true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_4x4() -> RawFrame {
        let samples: Vec<u16> = (0..16).collect();
        RawFrame::new(samples, 4, 4, 16, "/tmp/a.dng")
    }

    #[test]
    fn test_inclusive_bounds() {
        let frame = frame_4x4();
        let rect = CropRect::new(1, 2, 1, 3);
        let cropped = frame.crop(Some(&rect)).unwrap();

        assert_eq!(cropped.width(), 2);
        assert_eq!(cropped.height(), 3);
        assert_eq!(cropped.samples(), &[5, 6, 9, 10, 13, 14]);
        assert!(cropped.is_cropped());
    }

    #[test]
    fn test_absent_rect_is_noop() {
        let frame = frame_4x4();
        let copy = frame.crop(None).unwrap();
        assert_eq!(copy.samples(), frame.samples());
        assert!(!copy.is_cropped());
    }

    #[test]
    fn test_out_of_bounds_clamped() {
        let frame = frame_4x4();
        let rect = CropRect::new(2, 100, 0, usize::MAX);
        let cropped = frame.crop(Some(&rect)).unwrap();
        assert_eq!(cropped.width(), 2);
        assert_eq!(cropped.height(), 4);
    }

    #[test]
    fn test_degenerate_rect_treated_as_absent() {
        let frame = frame_4x4();
        // x_min beyond the frame: zero-width after clamping
        let rect = CropRect::new(10, 20, 0, 3);
        let copy = frame.crop(Some(&rect)).unwrap();
        assert_eq!(copy.samples(), frame.samples());
        assert!(!copy.is_cropped());
    }

    #[test]
    fn test_recrop_original_is_identical() {
        let frame = frame_4x4();
        let rect = CropRect::new(0, 2, 1, 2);
        let a = frame.crop(Some(&rect)).unwrap();
        let b = frame.crop(Some(&rect)).unwrap();
        assert_eq!(a.samples(), b.samples());
    }

    #[test]
    fn test_double_crop_rejected() {
        let frame = frame_4x4();
        let rect = CropRect::new(0, 2, 0, 2);
        let cropped = frame.crop(Some(&rect)).unwrap();
        assert!(matches!(
            cropped.crop(Some(&rect)),
            Err(CropError::AlreadyCropped)
        ));
    }

    #[test]
    fn test_noop_on_cropped_frame_allowed() {
        let frame = frame_4x4();
        let rect = CropRect::new(0, 2, 0, 2);
        let cropped = frame.crop(Some(&rect)).unwrap();
        assert!(cropped.crop(None).is_ok());
    }
}
