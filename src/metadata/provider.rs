//! Metadata provider seam.
//!
//! Reading camera/exposure fields from a file is an external concern
//! (exiftool, embedded EXIF parsers, sidecars). The core only consumes
//! the resulting flat key/value map.

use super::Metadata;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from a metadata provider.
#[derive(Debug, Clone, Error)]
pub enum MetadataError {
    /// The provider could not read the file's metadata.
    #[error("failed to read metadata for {path}: {reason}")]
    ReadFailed {
        /// The file whose metadata could not be read.
        path: PathBuf,
        /// Provider-reported reason.
        reason: String,
    },
}

/// Trait for metadata providers.
pub trait MetadataProvider {
    /// Reads the flat metadata map for the given file.
    fn read(&self, path: &Path) -> Result<Metadata, MetadataError>;
}

/// In-memory provider serving pre-registered metadata.
///
/// Paths without a registered entry resolve to an empty map, which
/// makes every calibration field fall through to its next source. The
/// CLI uses an empty instance when no external metadata tool is wired
/// in; tests register fixtures per path.
#[derive(Debug, Clone, Default)]
pub struct StaticMetadata {
    entries: HashMap<PathBuf, Metadata>,
}

impl StaticMetadata {
    /// Creates a provider with no registered entries.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers metadata for a path.
    pub fn register(&mut self, path: impl Into<PathBuf>, metadata: Metadata) {
        self.entries.insert(path.into(), metadata);
    }
}

impl MetadataProvider for StaticMetadata {
    fn read(&self, path: &Path) -> Result<Metadata, MetadataError> {
        Ok(self.entries.get(path).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unregistered_path_is_empty() {
        let provider = StaticMetadata::new();
        let meta = provider.read(Path::new("/tmp/x.dng")).unwrap();
        assert!(meta.is_empty());
    }

    #[test]
    fn test_registered_path_served() {
        let mut provider = StaticMetadata::new();
        let mut meta = Metadata::new();
        meta.insert("EXIF.ISO", 400.0);
        provider.register("/tmp/x.dng", meta);

        let read = provider.read(Path::new("/tmp/x.dng")).unwrap();
        assert_eq!(read.number(&["EXIF.ISO"]), Some(400.0));
    }
}
