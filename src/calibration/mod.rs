//! Calibration constants: per-camera profiles and resolution chains.

mod profile;
mod resolve;

pub use profile::{builtin_crop, CalibrationProfile};
pub use resolve::{resolve, Calibration};
