//! Directory scanning and hash-driven ingestion.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use walkdir::WalkDir;

use crate::analysis::NoiseStatistics;
use crate::calibration;
use crate::catalog::{
    hash_file, AnalysisRecord, CameraIdentity, Catalog, CatalogError, ExposureContext,
    FrameIdentity, HashError, ImageRecord,
};
use crate::frame::{CropError, DecodeError, RawDecoder};
use crate::metadata::{Metadata, MetadataError, MetadataProvider};

/// Ingestion failures.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Content hashing failed.
    #[error(transparent)]
    Hash(#[from] HashError),
    /// Catalog read or write failed.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    /// Raw decode failed.
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// Metadata read failed.
    #[error(transparent)]
    Metadata(#[from] MetadataError),
    /// A crop could not be applied.
    #[error(transparent)]
    Crop(#[from] CropError),
    /// The file's size could not be read.
    #[error("failed to stat {path}: {source}")]
    Stat {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// What ingestion should do with a file, decided by content hash.
#[derive(Debug)]
pub enum IngestStatus {
    /// Identical content is already cataloged.
    Skip,
    /// Nothing in the catalog matches this content.
    New(FrameIdentity),
    /// A record exists for this path but with different content;
    /// replace it in place rather than inserting.
    Changed {
        /// The fresh content identity.
        identity: FrameIdentity,
        /// The stale record to replace.
        image: ImageRecord,
    },
}

/// What happened to one file during a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    /// New record inserted and analyzed.
    Added,
    /// Existing record replaced and re-analyzed.
    Changed,
    /// Content already known, untouched.
    Skipped,
    /// This file failed; the scan continued.
    Failed,
}

/// Per-file progress report passed to the scan callback.
#[derive(Debug)]
pub struct ScanProgress<'a> {
    /// File just processed.
    pub path: &'a Path,
    /// What happened to it.
    pub outcome: ScanOutcome,
    /// Files processed so far, this one included.
    pub processed: usize,
}

/// Tally of a completed (or cancelled) scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// New files ingested.
    pub added: usize,
    /// Files replaced in place.
    pub changed: usize,
    /// Files already known.
    pub skipped: usize,
    /// Files that failed.
    pub errors: usize,
    /// True when a cancellation flag stopped the scan early.
    pub cancelled: bool,
}

/// Walks directories of raw files and keeps the catalog in sync.
///
/// Each file is fully committed before the next is touched, so a
/// cancelled or crashed scan leaves a consistent catalog containing
/// exactly the files processed so far.
pub struct Scanner<'a> {
    catalog: &'a Catalog,
    decoder: &'a dyn RawDecoder,
    metadata: &'a dyn MetadataProvider,
    extensions: Vec<String>,
}

impl<'a> Scanner<'a> {
    /// Creates a scanner recognizing the given file extensions
    /// (lowercase, without dots).
    pub fn new(
        catalog: &'a Catalog,
        decoder: &'a dyn RawDecoder,
        metadata: &'a dyn MetadataProvider,
        extensions: Vec<String>,
    ) -> Self {
        Self {
            catalog,
            decoder,
            metadata,
            extensions,
        }
    }

    /// Decides what ingestion should do with a file.
    ///
    /// Hash-first: the content identity is computed before any catalog
    /// lookup, so renamed copies of known files are recognized as
    /// duplicates and skipped.
    pub fn should_process(&self, path: &Path) -> Result<IngestStatus, ScanError> {
        let identity = hash_file(path)?;

        if self.catalog.image_by_hash(&identity)?.is_some() {
            return Ok(IngestStatus::Skip);
        }
        if let Some(image) = self.catalog.image_by_path(path)? {
            return Ok(IngestStatus::Changed { identity, image });
        }
        Ok(IngestStatus::New(identity))
    }

    /// Recursively scans a directory, ingesting every recognized raw
    /// file.
    ///
    /// Per-file failures are logged, reported to the callback and
    /// tallied without stopping the scan. The cancellation flag is
    /// checked between files only; setting it returns the partial
    /// tally with `cancelled` set.
    pub fn scan(
        &self,
        root: &Path,
        cancel: Option<&AtomicBool>,
        mut progress: impl FnMut(ScanProgress<'_>),
    ) -> ScanSummary {
        let mut summary = ScanSummary::default();
        let mut processed = 0usize;

        tracing::info!(root = %root.display(), "Starting ingestion scan");

        for entry in WalkDir::new(root).follow_links(false) {
            if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                tracing::info!(processed, "Scan cancelled");
                summary.cancelled = true;
                break;
            }

            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!(error = %err, "Unreadable directory entry");
                    summary.errors += 1;
                    continue;
                }
            };
            if !entry.file_type().is_file() || !self.recognizes(entry.path()) {
                continue;
            }

            let outcome = match self.ingest_file(entry.path()) {
                Ok(outcome) => outcome,
                Err(err) => {
                    tracing::error!(
                        path = %entry.path().display(),
                        error = %err,
                        "Ingestion failed for file"
                    );
                    ScanOutcome::Failed
                }
            };
            match outcome {
                ScanOutcome::Added => summary.added += 1,
                ScanOutcome::Changed => summary.changed += 1,
                ScanOutcome::Skipped => summary.skipped += 1,
                ScanOutcome::Failed => summary.errors += 1,
            }
            processed += 1;
            progress(ScanProgress {
                path: entry.path(),
                outcome,
                processed,
            });
        }

        tracing::info!(
            added = summary.added,
            changed = summary.changed,
            skipped = summary.skipped,
            errors = summary.errors,
            cancelled = summary.cancelled,
            "Scan finished"
        );
        summary
    }

    /// Removes catalog entries whose file no longer exists at the
    /// recorded path, returning how many were dropped.
    ///
    /// A maintenance operation, never performed implicitly by `scan`.
    pub fn reconcile_missing(&self) -> Result<usize, ScanError> {
        let mut removed = 0;
        for image in self.catalog.all_images()? {
            if !image.path.exists() {
                tracing::info!(path = %image.path.display(), "Removing missing file from catalog");
                self.catalog.remove_image(image.id)?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn recognizes(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .is_some_and(|ext| self.extensions.iter().any(|known| known == &ext))
    }

    fn ingest_file(&self, path: &Path) -> Result<ScanOutcome, ScanError> {
        let (identity, existing) = match self.should_process(path)? {
            IngestStatus::Skip => {
                tracing::debug!(path = %path.display(), "Content already cataloged, skipping");
                return Ok(ScanOutcome::Skipped);
            }
            IngestStatus::New(identity) => (identity, None),
            IngestStatus::Changed { identity, image } => (identity, Some(image)),
        };

        let frame = self.decoder.decode(path, false)?;
        let metadata = self.metadata.read(path)?;

        let camera_id = camera_identity(&metadata, frame.camera_model())
            .map(|camera| self.catalog.get_or_create_camera(&camera))
            .transpose()?;
        let profile = match camera_id {
            Some(id) => self.catalog.profile(id)?,
            None => None,
        };

        let calibration = calibration::resolve(&frame, &metadata, profile.as_ref());
        let cropped = frame.crop(calibration.crop.as_ref())?;
        let stats = NoiseStatistics::compute(&cropped, &calibration);
        let exposure = exposure_context(&metadata);

        let file_size = std::fs::metadata(path)
            .map_err(|source| ScanError::Stat {
                path: path.to_path_buf(),
                source,
            })?
            .len() as i64;

        let (image_id, outcome) = match existing {
            Some(image) => {
                self.catalog.update_image(
                    image.id,
                    &identity,
                    file_size,
                    frame.width(),
                    frame.height(),
                    camera_id,
                    exposure,
                )?;
                (image.id, ScanOutcome::Changed)
            }
            None => {
                let id = self.catalog.insert_image(
                    path,
                    &identity,
                    file_size,
                    frame.width(),
                    frame.height(),
                    camera_id,
                    exposure,
                )?;
                (id, ScanOutcome::Added)
            }
        };
        self.catalog
            .upsert_analysis(image_id, &AnalysisRecord::new(&stats, &calibration))?;

        tracing::debug!(
            path = %path.display(),
            identity = %identity,
            ev = ?stats.ev,
            ?outcome,
            "Ingested frame"
        );
        Ok(outcome)
    }
}

/// Shooting conditions from metadata, kept with the catalog record for
/// downstream grouping.
fn exposure_context(metadata: &Metadata) -> ExposureContext {
    ExposureContext {
        iso: metadata.number(&["EXIF.ISO"]).map(|iso| iso as i64),
        exposure_time: metadata.number(&["EXIF.ExposureTime"]),
    }
}

/// Camera identity from metadata, falling back to the decoder-reported
/// model. Returns `None` when no model can be named at all.
fn camera_identity(metadata: &Metadata, decoded_model: Option<&str>) -> Option<CameraIdentity> {
    let model = metadata
        .text(&["EXIF.UniqueCameraModel", "EXIF.Model"])
        .or(decoded_model)?;
    Some(CameraIdentity {
        make: metadata.text(&["EXIF.Make"]).unwrap_or_default().to_owned(),
        model: model.to_owned(),
        serial: metadata
            .text(&["EXIF.SerialNumber", "MakerNotes.SerialNumber"])
            .map(str::to_owned),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{MockDecoder, RawFrame};
    use crate::metadata::StaticMetadata;
    use std::fs;
    use std::sync::atomic::AtomicUsize;
    use tempfile::TempDir;

    /// Decoder double that rejects one file by name and delegates the
    /// rest to a [`MockDecoder`].
    struct RejectingDecoder {
        inner: MockDecoder,
        reject: &'static str,
    }

    impl RawDecoder for RejectingDecoder {
        fn decode(&self, path: &Path, preview: bool) -> Result<RawFrame, DecodeError> {
            if path.file_name().and_then(|n| n.to_str()) == Some(self.reject) {
                return Err(DecodeError::Failed {
                    path: path.to_path_buf(),
                    reason: "corrupt header".into(),
                });
            }
            self.inner.decode(path, preview)
        }
    }

    fn write_raw(dir: &TempDir, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn scanner_parts() -> (Catalog, MockDecoder, StaticMetadata) {
        (
            Catalog::open_in_memory().unwrap(),
            MockDecoder::new(8, 8, 100).with_model("LEICA Q3"),
            StaticMetadata::new(),
        )
    }

    fn extensions() -> Vec<String> {
        vec!["dng".into(), "erf".into()]
    }

    #[test]
    fn test_scan_adds_new_files() {
        let dir = TempDir::new().unwrap();
        write_raw(&dir, "a.dng", b"frame a");
        write_raw(&dir, "b.erf", b"frame b");
        write_raw(&dir, "notes.txt", b"not a frame");

        let (catalog, decoder, metadata) = scanner_parts();
        let scanner = Scanner::new(&catalog, &decoder, &metadata, extensions());
        let summary = scanner.scan(dir.path(), None, |_| {});

        assert_eq!(summary.added, 2);
        assert_eq!(summary.skipped, 0);
        assert_eq!(summary.errors, 0);
        assert!(!summary.cancelled);
        assert_eq!(catalog.stats().unwrap().images, 2);
        assert_eq!(catalog.stats().unwrap().analyzed, 2);
    }

    #[test]
    fn test_undecodable_file_does_not_abort_scan() {
        let dir = TempDir::new().unwrap();
        write_raw(&dir, "a.dng", b"frame a");
        write_raw(&dir, "bad.dng", b"corrupt");
        write_raw(&dir, "c.dng", b"frame c");

        let catalog = Catalog::open_in_memory().unwrap();
        let decoder = RejectingDecoder {
            inner: MockDecoder::new(8, 8, 100).with_model("LEICA Q3"),
            reject: "bad.dng",
        };
        let metadata = StaticMetadata::new();
        let scanner = Scanner::new(&catalog, &decoder, &metadata, extensions());

        let mut failed = Vec::new();
        let summary = scanner.scan(dir.path(), None, |progress| {
            if progress.outcome == ScanOutcome::Failed {
                failed.push(progress.path.to_path_buf());
            }
        });

        assert_eq!(summary.added, 2);
        assert_eq!(summary.errors, 1);
        assert!(!summary.cancelled);
        assert_eq!(failed, vec![dir.path().join("bad.dng")]);
        // The good files are fully committed despite the failure
        assert_eq!(catalog.stats().unwrap().images, 2);
        assert_eq!(catalog.stats().unwrap().analyzed, 2);
    }

    #[test]
    fn test_rescan_skips_known_content() {
        let dir = TempDir::new().unwrap();
        write_raw(&dir, "a.dng", b"frame a");

        let (catalog, decoder, metadata) = scanner_parts();
        let scanner = Scanner::new(&catalog, &decoder, &metadata, extensions());
        scanner.scan(dir.path(), None, |_| {});
        let summary = scanner.scan(dir.path(), None, |_| {});

        assert_eq!(summary.added, 0);
        assert_eq!(summary.skipped, 1);
        assert_eq!(catalog.stats().unwrap().images, 1);
    }

    #[test]
    fn test_renamed_copy_is_skipped() {
        let dir = TempDir::new().unwrap();
        write_raw(&dir, "a.dng", b"frame a");

        let (catalog, decoder, metadata) = scanner_parts();
        let scanner = Scanner::new(&catalog, &decoder, &metadata, extensions());
        scanner.scan(dir.path(), None, |_| {});

        write_raw(&dir, "copy-of-a.dng", b"frame a");
        let summary = scanner.scan(dir.path(), None, |_| {});

        assert_eq!(summary.added, 0);
        assert_eq!(summary.skipped, 2);
        assert_eq!(catalog.stats().unwrap().images, 1);
    }

    #[test]
    fn test_changed_content_replaces_in_place() {
        let dir = TempDir::new().unwrap();
        let path = write_raw(&dir, "a.dng", b"version one");

        let (catalog, decoder, metadata) = scanner_parts();
        let scanner = Scanner::new(&catalog, &decoder, &metadata, extensions());
        scanner.scan(dir.path(), None, |_| {});
        let before = catalog.image_by_path(&path).unwrap().unwrap();

        fs::write(&path, b"version two").unwrap();
        let summary = scanner.scan(dir.path(), None, |_| {});

        assert_eq!(summary.changed, 1);
        assert_eq!(summary.added, 0);
        let after = catalog.image_by_path(&path).unwrap().unwrap();
        assert_eq!(after.id, before.id);
        assert_ne!(after.identity, before.identity);
        assert_eq!(catalog.stats().unwrap().images, 1);
    }

    #[test]
    fn test_should_process_states() {
        let dir = TempDir::new().unwrap();
        let path = write_raw(&dir, "a.dng", b"frame a");

        let (catalog, decoder, metadata) = scanner_parts();
        let scanner = Scanner::new(&catalog, &decoder, &metadata, extensions());

        assert!(matches!(
            scanner.should_process(&path).unwrap(),
            IngestStatus::New(_)
        ));
        scanner.scan(dir.path(), None, |_| {});
        assert!(matches!(
            scanner.should_process(&path).unwrap(),
            IngestStatus::Skip
        ));

        fs::write(&path, b"different").unwrap();
        assert!(matches!(
            scanner.should_process(&path).unwrap(),
            IngestStatus::Changed { .. }
        ));
    }

    #[test]
    fn test_cancellation_between_files() {
        let dir = TempDir::new().unwrap();
        for i in 0..5 {
            write_raw(&dir, &format!("{i}.dng"), format!("frame {i}").as_bytes());
        }

        let (catalog, decoder, metadata) = scanner_parts();
        let scanner = Scanner::new(&catalog, &decoder, &metadata, extensions());

        let cancel = AtomicBool::new(false);
        let seen = AtomicUsize::new(0);
        let summary = scanner.scan(dir.path(), Some(&cancel), |_| {
            if seen.fetch_add(1, Ordering::SeqCst) + 1 == 2 {
                cancel.store(true, Ordering::SeqCst);
            }
        });

        assert!(summary.cancelled);
        assert_eq!(summary.added, 2);
        // Every processed file is fully committed
        assert_eq!(catalog.stats().unwrap().images, 2);
        assert_eq!(catalog.stats().unwrap().analyzed, 2);
    }

    #[test]
    fn test_camera_registered_and_analysis_persisted() {
        let dir = TempDir::new().unwrap();
        let path = write_raw(&dir, "a.dng", b"frame a");

        let (catalog, decoder, metadata) = scanner_parts();
        let scanner = Scanner::new(&catalog, &decoder, &metadata, extensions());
        scanner.scan(dir.path(), None, |_| {});

        assert_eq!(catalog.stats().unwrap().cameras, 1);
        let image = catalog.image_by_path(&path).unwrap().unwrap();
        let analysis = catalog.analysis(image.id).unwrap().unwrap();
        // MockDecoder frames are constant-valued: std 0, so EV absent
        assert_eq!(analysis.noise_mean, 100.0);
        assert_eq!(analysis.noise_std, 0.0);
        assert_eq!(analysis.ev, None);
        // Calibration actually used comes from the embedded levels
        assert_eq!(analysis.black_level, 0.0);
        assert_eq!(analysis.white_level, Some(65535.0));
    }

    #[test]
    fn test_exposure_context_from_metadata() {
        let dir = TempDir::new().unwrap();
        let path = write_raw(&dir, "a.dng", b"frame a");

        let (catalog, decoder, mut metadata) = scanner_parts();
        let mut meta = crate::metadata::Metadata::new();
        meta.insert("EXIF.ISO", 1600.0);
        meta.insert("EXIF.ExposureTime", 0.008);
        metadata.register(&path, meta);

        let scanner = Scanner::new(&catalog, &decoder, &metadata, extensions());
        scanner.scan(dir.path(), None, |_| {});

        let image = catalog.image_by_path(&path).unwrap().unwrap();
        assert_eq!(image.iso, Some(1600));
        assert_eq!(image.exposure_time, Some(0.008));
    }

    #[test]
    fn test_reconcile_missing_files() {
        let dir = TempDir::new().unwrap();
        let keep = write_raw(&dir, "keep.dng", b"keep");
        let gone = write_raw(&dir, "gone.dng", b"gone");

        let (catalog, decoder, metadata) = scanner_parts();
        let scanner = Scanner::new(&catalog, &decoder, &metadata, extensions());
        scanner.scan(dir.path(), None, |_| {});
        assert_eq!(catalog.stats().unwrap().images, 2);

        fs::remove_file(&gone).unwrap();
        let removed = scanner.reconcile_missing().unwrap();

        assert_eq!(removed, 1);
        assert_eq!(catalog.stats().unwrap().images, 1);
        assert!(catalog.image_by_path(&keep).unwrap().is_some());
        assert!(catalog.image_by_path(&gone).unwrap().is_none());
    }

    #[test]
    fn test_extension_matching_case_insensitive() {
        let dir = TempDir::new().unwrap();
        write_raw(&dir, "a.DNG", b"frame a");

        let (catalog, decoder, metadata) = scanner_parts();
        let scanner = Scanner::new(&catalog, &decoder, &metadata, extensions());
        let summary = scanner.scan(dir.path(), None, |_| {});

        assert_eq!(summary.added, 1);
    }
}
