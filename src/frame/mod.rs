//! Raw frame handling: sensor buffers, cropping, and decoding.
//!
//! A frame is one channel of undemosaiced sensor samples. Transforms
//! never mutate in place; crop and repair produce new frames so no
//! pipeline stage can observe another's half-finished state.

mod crop;
mod decode;
mod raw;

pub use crop::{CropError, CropRect};
pub use decode::{DecodeError, MockDecoder, RawDecoder, RawloaderDecoder};
pub use raw::RawFrame;
