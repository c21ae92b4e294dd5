//! Raw Noise Characterization Library
//!
//! Analyzes raw camera sensor files to characterize noise behavior:
//! per-frame noise statistics, an exposure-value dynamic-range metric,
//! leaky pixel detection and repair, display scaling, and a persisted
//! catalog of analysis results keyed by file content.
//!
//! # Architecture
//!
//! Each frame flows through an explicit transform chain:
//!
//! ```text
//! decode → crop → statistics → (detect/repair) → scale → display
//!    ↓                 ↓
//!  cache            catalog (ingestion)
//! ```
//!
//! Transforms are pure functions returning new owned buffers; no stage
//! mutates a buffer another stage still holds.
//!
//! # Example
//!
//! ```no_run
//! use raw_noise::{
//!     cache::FrameCache,
//!     frame::RawloaderDecoder,
//!     metadata::StaticMetadata,
//!     pipeline::{Analyzer, RenderOptions},
//!     render::ScaleMode,
//! };
//! use std::path::Path;
//!
//! let analyzer = Analyzer::new(
//!     Box::new(RawloaderDecoder::new()),
//!     Box::new(StaticMetadata::new()),
//!     FrameCache::with_frame_capacity(10).unwrap(),
//! );
//!
//! let path = Path::new("frame.dng");
//! let analysis = analyzer.analyze(path, None).unwrap();
//! println!(
//!     "mean {:.1}, std {:.1}, ev {:?}",
//!     analysis.statistics.mean, analysis.statistics.std, analysis.statistics.ev
//! );
//!
//! let image = analyzer
//!     .render(
//!         path,
//!         RenderOptions {
//!             mode: ScaleMode::Log,
//!             repair_sigma: Some(6.0),
//!             ..Default::default()
//!         },
//!         None,
//!     )
//!     .unwrap();
//! assert_eq!(image.pixels().len(), image.width() * image.height());
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod analysis;
pub mod cache;
pub mod calibration;
pub mod catalog;
pub mod config;
pub mod frame;
pub mod ingest;
pub mod metadata;
pub mod pipeline;
pub mod render;

// Re-export commonly used types at crate root
pub use analysis::{NoiseStatistics, Outlier, OutlierReport};
pub use cache::{CacheStats, FrameCache};
pub use calibration::{Calibration, CalibrationProfile};
pub use catalog::{Catalog, FrameIdentity};
pub use config::FileConfig;
pub use frame::{CropRect, RawDecoder, RawFrame};
pub use pipeline::{Analyzer, FrameAnalysis, RenderOptions};
pub use render::{DisplayImage, ScaleMode};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
