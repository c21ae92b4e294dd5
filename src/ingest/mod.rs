//! Hash-driven ingestion of raw file directories into the catalog.

mod scan;

pub use scan::{
    IngestStatus, ScanError, ScanOutcome, ScanProgress, ScanSummary, Scanner,
};
