//! Calibration resolution: black level, white level, and crop.
//!
//! Each field resolves through an ordered chain of sources, first
//! success wins. Malformed values fall through to the next source
//! instead of raising; a fully exhausted white-level chain surfaces as
//! an absent value, which downstream turns into "EV unavailable".

use super::{builtin_crop, CalibrationProfile};
use crate::frame::{CropRect, RawFrame};
use crate::metadata::Metadata;

/// Resolved calibration constants for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Calibration {
    /// Sensor dark-noise floor.
    pub black_level: f64,
    /// Sensor saturation ceiling; `None` when no source could provide one.
    pub white_level: Option<f64>,
    /// Camera-specific crop to apply before statistics.
    pub crop: Option<CropRect>,
}

/// Resolves calibration for a frame from its embedded levels, metadata,
/// and an optional stored per-camera profile.
///
/// Fallback order per field:
/// - black: profile override, embedded first-channel level,
///   `EXIF.BlackLevel`, `MakerNotes.BlackLevel`, then 0.
/// - white: profile override, embedded first-channel level,
///   `EXIF.WhiteLevel`, `SubIFD.WhiteLevel`, `2^BitsPerSample - 1`,
///   then absent.
/// - crop: validated profile bounds, built-in table by exact model
///   string, then none.
///
/// Pure function over its inputs; performs no I/O.
pub fn resolve(
    frame: &RawFrame,
    metadata: &Metadata,
    profile: Option<&CalibrationProfile>,
) -> Calibration {
    let black_level = profile
        .and_then(|p| p.black_level)
        .or_else(|| frame.embedded_black_level())
        .or_else(|| metadata.number(&["EXIF.BlackLevel", "MakerNotes.BlackLevel"]))
        .unwrap_or(0.0);

    let white_level = profile
        .and_then(|p| p.white_level)
        .or_else(|| frame.embedded_white_level())
        .or_else(|| metadata.number(&["EXIF.WhiteLevel", "SubIFD.WhiteLevel"]))
        .or_else(|| {
            bits_per_sample(metadata, profile).map(|bits| 2f64.powi(i32::from(bits)) - 1.0)
        })
        .filter(|w| w.is_finite());

    let crop = profile
        .and_then(|p| p.validated_crop(frame.width(), frame.height()))
        .or_else(|| camera_model(frame, metadata).and_then(builtin_crop));

    if white_level.is_none() {
        tracing::warn!(
            source = %frame.source().display(),
            "No white level from any source, EV will be unavailable"
        );
    }

    Calibration {
        black_level,
        white_level,
        crop,
    }
}

/// Sensor bit depth: profile override, then metadata.
///
/// The decoded container's depth is deliberately not a source; a
/// 16-bit container routinely holds a 12- or 14-bit sensor, and a wrong
/// white level is worse than an absent one.
fn bits_per_sample(metadata: &Metadata, profile: Option<&CalibrationProfile>) -> Option<u8> {
    profile.and_then(|p| p.bits_per_sample).or_else(|| {
        metadata
            .number(&["EXIF.BitsPerSample", "SubIFD.BitsPerSample"])
            .map(|bits| bits as u8)
    })
}

/// Camera model string for crop-table lookup: metadata first, then the
/// decoder-reported model.
fn camera_model<'a>(frame: &'a RawFrame, metadata: &'a Metadata) -> Option<&'a str> {
    metadata
        .text(&["EXIF.UniqueCameraModel", "EXIF.Model"])
        .or_else(|| frame.camera_model())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_frame() -> RawFrame {
        RawFrame::new(vec![100u16; 16], 4, 4, 16, "/tmp/a.dng")
    }

    fn frame_with_levels() -> RawFrame {
        bare_frame().with_levels(vec![64; 4], vec![16383; 4])
    }

    #[test]
    fn test_embedded_levels_preferred() {
        let cal = resolve(&frame_with_levels(), &Metadata::new(), None);
        assert_eq!(cal.black_level, 64.0);
        assert_eq!(cal.white_level, Some(16383.0));
    }

    #[test]
    fn test_metadata_fallback() {
        let mut meta = Metadata::new();
        meta.insert("EXIF.BlackLevel", "512 512 512 512");
        meta.insert("EXIF.WhiteLevel", 15871.0);

        let cal = resolve(&bare_frame(), &meta, None);
        assert_eq!(cal.black_level, 512.0);
        assert_eq!(cal.white_level, Some(15871.0));
    }

    #[test]
    fn test_malformed_black_falls_through_to_zero() {
        let mut meta = Metadata::new();
        meta.insert("EXIF.BlackLevel", "n/a");

        let cal = resolve(&bare_frame(), &meta, None);
        assert_eq!(cal.black_level, 0.0);
    }

    #[test]
    fn test_white_from_bits_per_sample() {
        let mut meta = Metadata::new();
        meta.insert("EXIF.BitsPerSample", 14.0);

        let cal = resolve(&bare_frame(), &meta, None);
        assert_eq!(cal.white_level, Some(16383.0));
    }

    #[test]
    fn test_exhausted_white_chain_is_absent() {
        // Bare frame, no metadata: no source for a white level
        let cal = resolve(&bare_frame(), &Metadata::new(), None);
        assert_eq!(cal.white_level, None);
        assert_eq!(cal.black_level, 0.0);
    }

    #[test]
    fn test_profile_overrides_win() {
        let profile = CalibrationProfile {
            black_level: Some(32.0),
            white_level: Some(4095.0),
            ..Default::default()
        };
        let cal = resolve(&frame_with_levels(), &Metadata::new(), Some(&profile));
        assert_eq!(cal.black_level, 32.0);
        assert_eq!(cal.white_level, Some(4095.0));
    }

    #[test]
    fn test_builtin_crop_by_model() {
        let frame = RawFrame::new(vec![0u16; 6100 * 4060], 6100, 4060, 16, "/tmp/a.dng")
            .with_camera_model("RICOH GR III");
        let cal = resolve(&frame, &Metadata::new(), None);
        assert_eq!(cal.crop, Some(CropRect::new(56, 6087, 28, 4051)));
    }

    #[test]
    fn test_invalid_profile_crop_falls_back_to_table() {
        let frame = RawFrame::new(vec![0u16; 6100 * 4060], 6100, 4060, 16, "/tmp/a.dng")
            .with_camera_model("RICOH GR III");
        let profile = CalibrationProfile {
            x_min: Some(500),
            x_max: Some(100), // reversed: invalid
            y_min: Some(0),
            y_max: Some(100),
            ..Default::default()
        };
        let cal = resolve(&frame, &Metadata::new(), Some(&profile));
        assert_eq!(cal.crop, Some(CropRect::new(56, 6087, 28, 4051)));
    }
}
