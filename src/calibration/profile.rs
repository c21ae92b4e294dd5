//! Per-camera calibration profiles and the built-in crop table.

use crate::frame::CropRect;
use serde::{Deserialize, Serialize};

/// Persisted per-camera-model calibration overrides.
///
/// Every field is independently optional: a profile may carry only a
/// crop, only a bit-depth override, or any mix. Profiles are created on
/// first sight of a new camera identity and mutated only through an
/// explicit apply-calibration action; they are never deleted
/// automatically.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalibrationProfile {
    /// First included column of the crop override.
    pub x_min: Option<u32>,
    /// Last included column of the crop override.
    pub x_max: Option<u32>,
    /// First included row of the crop override.
    pub y_min: Option<u32>,
    /// Last included row of the crop override.
    pub y_max: Option<u32>,
    /// Actual sensor bit depth when it differs from the container's.
    pub bits_per_sample: Option<u8>,
    /// Black level override.
    pub black_level: Option<f64>,
    /// White level override.
    pub white_level: Option<f64>,
}

impl CalibrationProfile {
    /// Returns the crop override when all four bounds are present and
    /// valid for an uncropped frame of the given extents.
    ///
    /// Invalid bounds (reversed, out of range) are treated as "no
    /// override" rather than an error, so a stale profile can never
    /// break analysis of a frame it no longer fits.
    pub fn validated_crop(&self, width: usize, height: usize) -> Option<CropRect> {
        let (x_min, x_max, y_min, y_max) = (
            self.x_min? as usize,
            self.x_max? as usize,
            self.y_min? as usize,
            self.y_max? as usize,
        );
        if x_min >= x_max || x_max >= width || y_min >= y_max || y_max >= height {
            tracing::warn!(
                x_min,
                x_max,
                y_min,
                y_max,
                width,
                height,
                "Profile crop bounds invalid for frame, ignoring"
            );
            return None;
        }
        Some(CropRect::new(x_min, x_max, y_min, y_max))
    }

    /// Returns true when no field carries an override.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Built-in crop table keyed by exact camera model string.
///
/// These remove masked borders and readout artifacts observed on
/// specific bodies. Open axes use `usize::MAX` and rely on clamping at
/// crop time.
pub fn builtin_crop(model: &str) -> Option<CropRect> {
    match model {
        "LEICA Q (Typ 116)" => Some(CropRect::new(0, 6010, 0, usize::MAX)),
        "RICOH GR III" => Some(CropRect::new(56, 6087, 28, 4051)),
        "LEICA CL" => Some(CropRect::new(0, 6047, 0, usize::MAX)),
        "LEICA Q3" => Some(CropRect::new(0, 7411, 0, usize::MAX)),
        "LEICA SL2-S" => Some(CropRect::new(0, 5999, 0, 3999)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_profile_no_crop() {
        let profile = CalibrationProfile::default();
        assert!(profile.is_empty());
        assert_eq!(profile.validated_crop(6000, 4000), None);
    }

    #[test]
    fn test_partial_bounds_no_crop() {
        let profile = CalibrationProfile {
            x_min: Some(0),
            x_max: Some(100),
            ..Default::default()
        };
        assert_eq!(profile.validated_crop(6000, 4000), None);
    }

    #[test]
    fn test_valid_bounds_yield_rect() {
        let profile = CalibrationProfile {
            x_min: Some(56),
            x_max: Some(6087),
            y_min: Some(28),
            y_max: Some(4051),
            ..Default::default()
        };
        let rect = profile.validated_crop(6100, 4060).unwrap();
        assert_eq!(rect, CropRect::new(56, 6087, 28, 4051));
    }

    #[test]
    fn test_reversed_bounds_rejected() {
        let profile = CalibrationProfile {
            x_min: Some(100),
            x_max: Some(50),
            y_min: Some(0),
            y_max: Some(10),
            ..Default::default()
        };
        assert_eq!(profile.validated_crop(6000, 4000), None);
    }

    #[test]
    fn test_out_of_range_bounds_rejected() {
        let profile = CalibrationProfile {
            x_min: Some(0),
            x_max: Some(7000),
            y_min: Some(0),
            y_max: Some(100),
            ..Default::default()
        };
        assert_eq!(profile.validated_crop(6000, 4000), None);
    }

    #[test]
    fn test_builtin_table_exact_match() {
        assert!(builtin_crop("RICOH GR III").is_some());
        assert!(builtin_crop("RICOH GR III ").is_none());
        assert!(builtin_crop("UNKNOWN CAMERA").is_none());
    }
}
