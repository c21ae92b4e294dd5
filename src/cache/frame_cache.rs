//! Shared cache for decoded frames and rendered thumbnails.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use super::lru::{CacheError, LruCache};
use crate::frame::RawFrame;
use crate::render::DisplayImage;

/// Which decode of a file a cached frame represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    /// Full-resolution decode.
    Full,
    /// Half-size fast preview decode.
    Preview,
}

/// Cache key for decoded frames.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FrameKey {
    /// Source file path.
    pub path: PathBuf,
    /// Full or preview decode.
    pub variant: Variant,
}

/// Cache key for thumbnails; carries the bounding box they were
/// rendered into.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ThumbnailKey {
    /// Source file path.
    pub path: PathBuf,
    /// Bounding-box width the thumbnail was fitted to.
    pub max_width: usize,
    /// Bounding-box height the thumbnail was fitted to.
    pub max_height: usize,
}

/// Occupancy snapshot of both pools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Live entries in the frame pool.
    pub frames: usize,
    /// Frame pool capacity.
    pub frame_capacity: usize,
    /// Live entries in the thumbnail pool.
    pub thumbnails: usize,
    /// Thumbnail pool capacity.
    pub thumbnail_capacity: usize,
}

/// Two independently sized LRU pools, one for decoded frames and one
/// for thumbnails, safe to share across threads.
///
/// Values are handed out as `Arc` clones so a cached frame stays alive
/// for a caller even after eviction. Each pool is guarded by its own
/// mutex; eviction happens synchronously inside `put`, never on a
/// background thread.
#[derive(Debug)]
pub struct FrameCache {
    frames: Mutex<LruCache<FrameKey, Arc<RawFrame>>>,
    thumbnails: Mutex<LruCache<ThumbnailKey, Arc<DisplayImage>>>,
}

impl FrameCache {
    /// Creates a cache with the given pool capacities.
    ///
    /// Both must be at least 1. A thumbnail pool of roughly twice the
    /// frame pool works well, thumbnails being far cheaper to hold.
    pub fn new(frame_capacity: usize, thumbnail_capacity: usize) -> Result<Self, CacheError> {
        Ok(Self {
            frames: Mutex::new(LruCache::new(frame_capacity)?),
            thumbnails: Mutex::new(LruCache::new(thumbnail_capacity)?),
        })
    }

    /// Creates a cache with a thumbnail pool twice the frame pool.
    pub fn with_frame_capacity(frame_capacity: usize) -> Result<Self, CacheError> {
        Self::new(frame_capacity, frame_capacity * 2)
    }

    /// Looks up a decoded frame.
    pub fn get_frame(&self, key: &FrameKey) -> Option<Arc<RawFrame>> {
        lock(&self.frames).get(key).cloned()
    }

    /// Stores a decoded frame, evicting the least-recently-used entry
    /// when the pool is full.
    pub fn put_frame(&self, key: FrameKey, frame: Arc<RawFrame>) {
        lock(&self.frames).put(key, frame);
    }

    /// Looks up a rendered thumbnail.
    pub fn get_thumbnail(&self, key: &ThumbnailKey) -> Option<Arc<DisplayImage>> {
        lock(&self.thumbnails).get(key).cloned()
    }

    /// Stores a rendered thumbnail.
    pub fn put_thumbnail(&self, key: ThumbnailKey, image: Arc<DisplayImage>) {
        lock(&self.thumbnails).put(key, image);
    }

    /// Current occupancy of both pools.
    pub fn stats(&self) -> CacheStats {
        let frames = lock(&self.frames);
        let thumbnails = lock(&self.thumbnails);
        CacheStats {
            frames: frames.len(),
            frame_capacity: frames.capacity(),
            thumbnails: thumbnails.len(),
            thumbnail_capacity: thumbnails.capacity(),
        }
    }

    /// Drops every entry in both pools.
    pub fn clear(&self) {
        lock(&self.frames).clear();
        lock(&self.thumbnails).clear();
        tracing::debug!("Frame cache cleared");
    }
}

// A panic mid-get/put cannot leave the LRU bookkeeping half-updated in
// a way that corrupts later operations, so a poisoned lock is safe to
// keep using.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
