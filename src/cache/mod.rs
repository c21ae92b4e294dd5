//! LRU caching of decoded frames and thumbnails.

mod frame_cache;
mod lru;

pub use frame_cache::{CacheStats, FrameCache, FrameKey, ThumbnailKey, Variant};
pub use lru::{CacheError, LruCache};
