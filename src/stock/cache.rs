//! Stock cache with whole-map rebuild and lazy fallback
//!
//! The cache maps storage locations to counts of distributable files. A
//! scheduled cycle rebuilds the entire map and publishes it atomically by
//! swapping the `Arc` handle, so readers racing a rebuild see either the
//! fully-old or the fully-new map, never a mix. Entries not yet populated by
//! the scheduler are filled by a synchronous cache-aside read; that lazy path
//! is the only one that blocks the caller on filesystem I/O.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Stock cache configuration
#[derive(Debug, Clone)]
pub struct StockCacheConfig {
    /// File extension (without dot) that marks a distributable asset
    pub asset_extension: String,
}

impl Default for StockCacheConfig {
    fn default() -> Self {
        Self {
            asset_extension: "txt".to_string(),
        }
    }
}

/// Read-through cache of per-location stock counts
pub struct StockCache {
    config: StockCacheConfig,
    /// Current generation of counts; replaced wholesale each rebuild
    entries: RwLock<Arc<DashMap<PathBuf, u64>>>,
}

impl StockCache {
    pub fn new(config: StockCacheConfig) -> Self {
        Self {
            config,
            entries: RwLock::new(Arc::new(DashMap::new())),
        }
    }

    /// Get the stock count for a location.
    ///
    /// On a miss the count is computed on the blocking pool (the caller
    /// still awaits the result) and stored into the current generation. A
    /// missing directory is zero stock, never an error.
    pub async fn get(&self, location: &Path) -> u64 {
        let current = self.current().await;

        if let Some(count) = current.get(location) {
            return *count;
        }

        let counted = location.to_path_buf();
        let extension = self.config.asset_extension.clone();
        let count = match tokio::task::spawn_blocking(move || count_assets(&counted, &extension))
            .await
        {
            Ok(count) => count,
            Err(e) => {
                warn!("Stock count task failed for {}: {}", location.display(), e);
                return 0;
            }
        };
        debug!("Stock cache miss for {}: counted {}", location.display(), count);

        // If a rebuild swapped the map between lookup and insert, this lands
        // in a generation about to be dropped; the next get recounts.
        current.insert(location.to_path_buf(), count);
        count
    }

    /// Rebuild the whole map in one pass and publish it atomically.
    ///
    /// Locations are processed in the order given; a location already counted
    /// earlier in the same rebuild is skipped, so when a default/global
    /// location shares a path with a community one, the first occurrence wins.
    /// Directory walks run on the blocking pool, not the executor threads.
    pub async fn refresh_all(&self, locations: &[PathBuf]) {
        let walked = locations.to_vec();
        let extension = self.config.asset_extension.clone();

        let rebuilt = match tokio::task::spawn_blocking(move || {
            let map: DashMap<PathBuf, u64> = DashMap::new();
            for location in walked {
                if map.contains_key(&location) {
                    continue;
                }
                let count = count_assets(&location, &extension);
                map.insert(location, count);
            }
            Arc::new(map)
        })
        .await
        {
            Ok(map) => map,
            Err(e) => {
                // Keep the previous generation; the next cycle retries
                warn!("Stock rebuild task failed: {}", e);
                return;
            }
        };

        let mut entries = self.entries.write().await;
        *entries = rebuilt;
        debug!("Stock cache rebuilt: {} locations", locations.len());
    }

    /// Drop one entry so the next read recounts from disk
    pub async fn invalidate(&self, location: &Path) {
        let current = self.current().await;
        current.remove(location);
    }

    /// Number of cached locations in the current generation
    pub async fn len(&self) -> usize {
        self.current().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.current().await.is_empty()
    }

    /// Whether a location is present in the current generation (without
    /// triggering the lazy fallback)
    pub async fn contains(&self, location: &Path) -> bool {
        self.current().await.contains_key(location)
    }

    async fn current(&self) -> Arc<DashMap<PathBuf, u64>> {
        Arc::clone(&*self.entries.read().await)
    }
}

/// Count distributable files in a directory.
///
/// A missing or unreadable directory reads as zero stock; whether that
/// warrants creating the directory is the monitor's call, not the cache's.
pub fn count_assets(directory: &Path, extension: &str) -> u64 {
    let entries = match std::fs::read_dir(directory) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return 0,
        Err(e) => {
            warn!("Failed to read {}: {}", directory.display(), e);
            return 0;
        }
    };

    entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter(|entry| {
            entry
                .path()
                .extension()
                .map(|ext| ext.eq_ignore_ascii_case(extension))
                .unwrap_or(false)
        })
        .count() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_assets(dir: &Path, count: usize) {
        for i in 0..count {
            std::fs::write(dir.join(format!("asset-{}.txt", i)), "credentials").unwrap();
        }
    }

    fn cache() -> StockCache {
        StockCache::new(StockCacheConfig::default())
    }

    #[test]
    fn test_count_assets_filters_extension() {
        let tmp = TempDir::new().unwrap();
        write_assets(tmp.path(), 3);
        std::fs::write(tmp.path().join("notes.md"), "ignore me").unwrap();
        std::fs::create_dir(tmp.path().join("sub.txt")).unwrap();

        assert_eq!(count_assets(tmp.path(), "txt"), 3);
    }

    #[test]
    fn test_count_assets_missing_directory_is_zero() {
        assert_eq!(count_assets(Path::new("/does/not/exist"), "txt"), 0);
    }

    #[tokio::test]
    async fn test_get_missing_location_returns_zero() {
        let cache = cache();
        assert_eq!(cache.get(Path::new("/does/not/exist")).await, 0);
    }

    #[tokio::test]
    async fn test_get_lazy_miss_populates_cache() {
        let tmp = TempDir::new().unwrap();
        write_assets(tmp.path(), 2);

        let cache = cache();
        assert!(!cache.contains(tmp.path()).await);
        assert_eq!(cache.get(tmp.path()).await, 2);
        assert!(cache.contains(tmp.path()).await);

        // Cached value is served even after the disk changes
        write_assets(tmp.path(), 5);
        assert_eq!(cache.get(tmp.path()).await, 2);
    }

    #[tokio::test]
    async fn test_refresh_all_replaces_whole_map() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        write_assets(a.path(), 1);
        write_assets(b.path(), 4);

        let cache = cache();
        // Stale entry from an earlier generation
        cache.get(a.path()).await;
        write_assets(a.path(), 3);

        cache
            .refresh_all(&[a.path().to_path_buf(), b.path().to_path_buf()])
            .await;

        // Every value comes from this rebuild, not a prior one
        assert_eq!(cache.get(a.path()).await, 3);
        assert_eq!(cache.get(b.path()).await, 4);
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test]
    async fn test_refresh_all_first_writer_wins_within_cycle() {
        let tmp = TempDir::new().unwrap();
        write_assets(tmp.path(), 2);

        let cache = cache();
        let dup = tmp.path().to_path_buf();
        cache.refresh_all(&[dup.clone(), dup.clone()]).await;

        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.get(tmp.path()).await, 2);
    }

    #[tokio::test]
    async fn test_concurrent_lazy_misses_complete() {
        let dirs: Vec<TempDir> = (0..8).map(|_| TempDir::new().unwrap()).collect();
        for (i, dir) in dirs.iter().enumerate() {
            write_assets(dir.path(), i);
        }

        let cache = std::sync::Arc::new(cache());
        let mut handles = Vec::new();
        for dir in &dirs {
            let cache = std::sync::Arc::clone(&cache);
            let path = dir.path().to_path_buf();
            handles.push(tokio::spawn(async move { cache.get(&path).await }));
        }

        // Every miss resolves off the executor thread and lands in the map
        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.await.unwrap(), i as u64);
        }
        assert_eq!(cache.len().await, 8);
    }

    #[tokio::test]
    async fn test_invalidate_forces_recount() {
        let tmp = TempDir::new().unwrap();
        write_assets(tmp.path(), 1);

        let cache = cache();
        assert_eq!(cache.get(tmp.path()).await, 1);

        write_assets(tmp.path(), 4);
        cache.invalidate(tmp.path()).await;
        assert_eq!(cache.get(tmp.path()).await, 4);
    }
}
