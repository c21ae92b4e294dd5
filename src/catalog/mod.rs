//! Persisted frame catalog: content hashing and the SQLite store.

mod db;
mod hash;

pub use db::{
    AnalysisRecord, CameraIdentity, Catalog, CatalogError, CatalogStats, ExposureContext,
    ImageRecord,
};
pub use hash::{hash_file, FrameIdentity, HashError};
