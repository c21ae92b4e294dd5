//! Display rendering: 8-bit scaling and thumbnail generation.

mod scale;
mod thumbnail;

pub use scale::{scale, Bounds, DisplayImage, ScaleMode};
pub use thumbnail::thumbnail;
