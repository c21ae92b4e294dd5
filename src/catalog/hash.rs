//! Content hashing for catalog identity.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use thiserror::Error;

/// Hashing failures.
#[derive(Debug, Error)]
pub enum HashError {
    /// The file could not be opened or read.
    #[error("failed to hash {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// SHA-256 content identity of a frame file, lowercase hex.
///
/// Identical file content always yields the same identity, regardless
/// of path, modification time or filesystem.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FrameIdentity(String);

impl FrameIdentity {
    /// Wraps an already-computed hex digest, e.g. one read back from
    /// the catalog.
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    /// The hex digest string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FrameIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hashes a file's content in streaming 64 KiB chunks.
pub fn hash_file(path: &Path) -> Result<FrameIdentity, HashError> {
    let io_err = |source| HashError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut file = File::open(path).map_err(io_err)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 64 * 1024];
    loop {
        let read = file.read(&mut buffer).map_err(io_err)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    use fmt::Write;
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(64);
    for byte in digest {
        // Writing to a String cannot fail
        let _ = write!(hex, "{byte:02x}");
    }
    Ok(FrameIdentity(hex))
}
