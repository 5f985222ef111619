//! Stock tracking for file-backed asset pools
//!
//! "Stock" is the number of distributable files in a storage location. The
//! cache keeps those counts cheap to read; the picker selects one file for
//! distribution.

mod cache;
mod picker;

pub use cache::{count_assets, StockCache, StockCacheConfig};
pub use picker::pick_random_asset;
