//! SQLite-backed catalog of frames, cameras and analysis results.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use thiserror::Error;

use super::FrameIdentity;
use crate::analysis::NoiseStatistics;
use crate::calibration::{Calibration, CalibrationProfile};

/// Catalog failures.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Underlying SQLite error.
    #[error("catalog error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A stored timestamp could not be parsed back.
    #[error("malformed timestamp in catalog: {0}")]
    Timestamp(String),
}

/// A camera body, identified by the (make, model, serial) triplet.
///
/// Serial is optional; two bodies of the same model without serials
/// collapse into one identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraIdentity {
    /// Manufacturer string as reported by the file.
    pub make: String,
    /// Model string as reported by the file.
    pub model: String,
    /// Body serial number when the file carries one.
    pub serial: Option<String>,
}

/// A cataloged frame file.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRecord {
    /// Row id.
    pub id: i64,
    /// Absolute path the file was ingested from.
    pub path: PathBuf,
    /// Content identity at ingestion time.
    pub identity: FrameIdentity,
    /// File size in bytes.
    pub file_size: i64,
    /// Post-decode width in samples.
    pub width: i64,
    /// Post-decode height in samples.
    pub height: i64,
    /// Owning camera row, when the file identified one.
    pub camera_id: Option<i64>,
    /// ISO setting from metadata, when present.
    pub iso: Option<i64>,
    /// Exposure time in seconds from metadata, when present.
    pub exposure_time: Option<f64>,
    /// When analysis results were last written.
    pub analyzed_at: Option<DateTime<Utc>>,
}

/// Exposure context captured from metadata at ingestion time.
///
/// Kept alongside the noise results so downstream plotting can group
/// frames by shooting conditions.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ExposureContext {
    /// ISO setting.
    pub iso: Option<i64>,
    /// Exposure time in seconds.
    pub exposure_time: Option<f64>,
}

/// Persisted per-frame analysis results.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRecord {
    /// Exposure value, absent when the white level was unknown.
    pub ev: Option<f64>,
    /// Noise mean.
    pub noise_mean: f64,
    /// Noise standard deviation.
    pub noise_std: f64,
    /// Black level the analysis actually used.
    pub black_level: f64,
    /// White level the analysis actually used, when one resolved.
    pub white_level: Option<f64>,
}

impl AnalysisRecord {
    /// Builds a record from computed statistics and the calibration
    /// they ran under.
    pub fn new(stats: &NoiseStatistics, calibration: &Calibration) -> Self {
        Self {
            ev: stats.ev,
            noise_mean: stats.mean,
            noise_std: stats.std,
            black_level: calibration.black_level,
            white_level: calibration.white_level,
        }
    }
}

/// Row counts for status reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogStats {
    /// Total cataloged frames.
    pub images: i64,
    /// Distinct camera identities.
    pub cameras: i64,
    /// Frames with analysis results.
    pub analyzed: i64,
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS images (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    file_path TEXT UNIQUE NOT NULL,
    file_hash TEXT UNIQUE NOT NULL,
    file_size INTEGER NOT NULL,
    width INTEGER NOT NULL,
    height INTEGER NOT NULL,
    camera_id INTEGER,
    iso INTEGER,
    exposure_time REAL,
    analyzed_at TEXT,

    FOREIGN KEY (camera_id) REFERENCES cameras(id)
);

CREATE TABLE IF NOT EXISTS cameras (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    make TEXT NOT NULL,
    model TEXT NOT NULL,
    serial TEXT,

    UNIQUE(make, model, serial)
);

CREATE TABLE IF NOT EXISTS analysis_results (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    image_id INTEGER UNIQUE NOT NULL,
    ev REAL,
    noise_mean REAL NOT NULL,
    noise_std REAL NOT NULL,
    black_level REAL NOT NULL,
    white_level REAL,

    FOREIGN KEY (image_id) REFERENCES images(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS camera_attributes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    camera_id INTEGER UNIQUE NOT NULL,
    x_min INTEGER,
    x_max INTEGER,
    y_min INTEGER,
    y_max INTEGER,
    bits_per_sample INTEGER,
    black_level REAL,
    white_level REAL,

    FOREIGN KEY (camera_id) REFERENCES cameras(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_images_hash ON images(file_hash);
CREATE INDEX IF NOT EXISTS idx_images_camera ON images(camera_id);
CREATE INDEX IF NOT EXISTS idx_analysis_ev ON analysis_results(ev);
";

/// The persisted frame catalog.
///
/// One connection, no internal pooling; callers needing concurrent
/// access open their own catalog handle. Foreign keys are enforced so
/// deleting an image cascades into its analysis row.
#[derive(Debug)]
pub struct Catalog {
    conn: Connection,
}

impl Catalog {
    /// Opens (creating if needed) a catalog at the given path.
    pub fn open(path: &Path) -> Result<Self, CatalogError> {
        let conn = Connection::open(path)?;
        Self::initialize(conn)
    }

    /// Opens a private in-memory catalog.
    pub fn open_in_memory() -> Result<Self, CatalogError> {
        Self::initialize(Connection::open_in_memory()?)
    }

    fn initialize(conn: Connection) -> Result<Self, CatalogError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        tracing::debug!("Catalog schema ready");
        Ok(Self { conn })
    }

    /// Finds or creates the camera row for an identity, returning its id.
    pub fn get_or_create_camera(&self, camera: &CameraIdentity) -> Result<i64, CatalogError> {
        let existing: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM cameras
                 WHERE make = ?1 AND model = ?2
                   AND (serial = ?3 OR (serial IS NULL AND ?3 IS NULL))",
                params![camera.make, camera.model, camera.serial],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(id) = existing {
            return Ok(id);
        }

        self.conn.execute(
            "INSERT INTO cameras (make, model, serial) VALUES (?1, ?2, ?3)",
            params![camera.make, camera.model, camera.serial],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::info!(make = %camera.make, model = %camera.model, id, "Registered camera");
        Ok(id)
    }

    /// Inserts a new frame record, returning its id.
    #[allow(clippy::too_many_arguments)]
    pub fn insert_image(
        &self,
        path: &Path,
        identity: &FrameIdentity,
        file_size: i64,
        width: usize,
        height: usize,
        camera_id: Option<i64>,
        exposure: ExposureContext,
    ) -> Result<i64, CatalogError> {
        self.conn.execute(
            "INSERT INTO images
                 (file_path, file_hash, file_size, width, height, camera_id,
                  iso, exposure_time, analyzed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                path.to_string_lossy(),
                identity.as_str(),
                file_size,
                width as i64,
                height as i64,
                camera_id,
                exposure.iso,
                exposure.exposure_time,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Replaces an existing record in place when a file's content
    /// changed under a known path.
    #[allow(clippy::too_many_arguments)]
    pub fn update_image(
        &self,
        id: i64,
        identity: &FrameIdentity,
        file_size: i64,
        width: usize,
        height: usize,
        camera_id: Option<i64>,
        exposure: ExposureContext,
    ) -> Result<(), CatalogError> {
        self.conn.execute(
            "UPDATE images
             SET file_hash = ?2, file_size = ?3, width = ?4, height = ?5,
                 camera_id = ?6, iso = ?7, exposure_time = ?8, analyzed_at = ?9
             WHERE id = ?1",
            params![
                id,
                identity.as_str(),
                file_size,
                width as i64,
                height as i64,
                camera_id,
                exposure.iso,
                exposure.exposure_time,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Looks up a frame by content identity.
    pub fn image_by_hash(
        &self,
        identity: &FrameIdentity,
    ) -> Result<Option<ImageRecord>, CatalogError> {
        self.conn
            .query_row(
                "SELECT id, file_path, file_hash, file_size, width, height, camera_id,
                        iso, exposure_time, analyzed_at
                 FROM images WHERE file_hash = ?1",
                params![identity.as_str()],
                image_from_row,
            )
            .optional()?
            .transpose()
    }

    /// Looks up a frame by its ingestion path.
    pub fn image_by_path(&self, path: &Path) -> Result<Option<ImageRecord>, CatalogError> {
        self.conn
            .query_row(
                "SELECT id, file_path, file_hash, file_size, width, height, camera_id,
                        iso, exposure_time, analyzed_at
                 FROM images WHERE file_path = ?1",
                params![path.to_string_lossy()],
                image_from_row,
            )
            .optional()?
            .transpose()
    }

    /// Every cataloged frame, ordered by path.
    pub fn all_images(&self) -> Result<Vec<ImageRecord>, CatalogError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, file_path, file_hash, file_size, width, height, camera_id,
                    iso, exposure_time, analyzed_at
             FROM images ORDER BY file_path",
        )?;
        let rows = stmt.query_map([], image_from_row)?;
        let mut images = Vec::new();
        for row in rows {
            images.push(row??);
        }
        Ok(images)
    }

    /// Deletes a frame and (by cascade) its analysis results.
    pub fn remove_image(&self, id: i64) -> Result<(), CatalogError> {
        self.conn
            .execute("DELETE FROM images WHERE id = ?1", params![id])?;
        Ok(())
    }

    /// Writes analysis results for a frame, replacing any previous row,
    /// and stamps the frame's analysis time.
    pub fn upsert_analysis(&self, image_id: i64, record: &AnalysisRecord) -> Result<(), CatalogError> {
        self.conn.execute(
            "INSERT INTO analysis_results
                 (image_id, ev, noise_mean, noise_std, black_level, white_level)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(image_id) DO UPDATE
             SET ev = excluded.ev,
                 noise_mean = excluded.noise_mean,
                 noise_std = excluded.noise_std,
                 black_level = excluded.black_level,
                 white_level = excluded.white_level",
            params![
                image_id,
                record.ev,
                record.noise_mean,
                record.noise_std,
                record.black_level,
                record.white_level
            ],
        )?;
        self.conn.execute(
            "UPDATE images SET analyzed_at = ?2 WHERE id = ?1",
            params![image_id, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Reads back a frame's analysis results.
    pub fn analysis(&self, image_id: i64) -> Result<Option<AnalysisRecord>, CatalogError> {
        Ok(self
            .conn
            .query_row(
                "SELECT ev, noise_mean, noise_std, black_level, white_level
                 FROM analysis_results WHERE image_id = ?1",
                params![image_id],
                |row| {
                    Ok(AnalysisRecord {
                        ev: row.get(0)?,
                        noise_mean: row.get(1)?,
                        noise_std: row.get(2)?,
                        black_level: row.get(3)?,
                        white_level: row.get(4)?,
                    })
                },
            )
            .optional()?)
    }

    /// Reads a camera's stored calibration profile, when one exists.
    pub fn profile(&self, camera_id: i64) -> Result<Option<CalibrationProfile>, CatalogError> {
        Ok(self
            .conn
            .query_row(
                "SELECT x_min, x_max, y_min, y_max, bits_per_sample, black_level, white_level
                 FROM camera_attributes WHERE camera_id = ?1",
                params![camera_id],
                |row| {
                    Ok(CalibrationProfile {
                        x_min: row.get(0)?,
                        x_max: row.get(1)?,
                        y_min: row.get(2)?,
                        y_max: row.get(3)?,
                        bits_per_sample: row.get(4)?,
                        black_level: row.get(5)?,
                        white_level: row.get(6)?,
                    })
                },
            )
            .optional()?)
    }

    /// Creates or replaces a camera's calibration profile.
    pub fn update_profile(
        &self,
        camera_id: i64,
        profile: &CalibrationProfile,
    ) -> Result<(), CatalogError> {
        self.conn.execute(
            "INSERT INTO camera_attributes
                 (camera_id, x_min, x_max, y_min, y_max, bits_per_sample, black_level, white_level)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(camera_id) DO UPDATE
             SET x_min = excluded.x_min,
                 x_max = excluded.x_max,
                 y_min = excluded.y_min,
                 y_max = excluded.y_max,
                 bits_per_sample = excluded.bits_per_sample,
                 black_level = excluded.black_level,
                 white_level = excluded.white_level",
            params![
                camera_id,
                profile.x_min,
                profile.x_max,
                profile.y_min,
                profile.y_max,
                profile.bits_per_sample,
                profile.black_level,
                profile.white_level,
            ],
        )?;
        tracing::info!(camera_id, "Updated calibration profile");
        Ok(())
    }

    /// Row counts for status reporting.
    pub fn stats(&self) -> Result<CatalogStats, CatalogError> {
        let count = |sql: &str| -> Result<i64, rusqlite::Error> {
            self.conn.query_row(sql, [], |row| row.get(0))
        };
        Ok(CatalogStats {
            images: count("SELECT COUNT(*) FROM images")?,
            cameras: count("SELECT COUNT(*) FROM cameras")?,
            analyzed: count("SELECT COUNT(*) FROM analysis_results")?,
        })
    }
}

fn image_from_row(row: &Row<'_>) -> Result<Result<ImageRecord, CatalogError>, rusqlite::Error> {
    let path: String = row.get(1)?;
    let hash: String = row.get(2)?;
    let analyzed_at: Option<String> = row.get(9)?;

    let analyzed_at = match analyzed_at {
        Some(raw) => match DateTime::parse_from_rfc3339(&raw) {
            Ok(ts) => Some(ts.with_timezone(&Utc)),
            Err(_) => return Ok(Err(CatalogError::Timestamp(raw))),
        },
        None => None,
    };

    Ok(Ok(ImageRecord {
        id: row.get(0)?,
        path: PathBuf::from(path),
        identity: FrameIdentity::from_hex(hash),
        file_size: row.get(3)?,
        width: row.get(4)?,
        height: row.get(5)?,
        camera_id: row.get(6)?,
        iso: row.get(7)?,
        exposure_time: row.get(8)?,
        analyzed_at,
    }))
}
