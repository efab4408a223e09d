//! Two-tier image cache: a bounded LRU in memory over a directory on disk.
//!
//! Safe to share between threads; every tier is behind the cache's own
//! lock and the counters are atomics.

pub mod icons;
pub mod wallpaper;

use anyhow::{Context, Result};
use jwalk::WalkDir;
use log::{debug, warn};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tempfile::NamedTempFile;

/// Encoded image bytes as stored on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedImage {
    pub bytes: Arc<[u8]>,
}

impl CachedImage {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    pub fn cost(&self) -> u64 {
        self.bytes.len() as u64
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Limits {
    pub max_entries: usize,
    pub max_bytes: u64,
}

/// How keys map to files in the disk tier.
#[derive(Debug, Clone, Copy)]
pub enum DiskNaming {
    /// Hex SHA-256 of the key.
    Hashed,
    /// Every key shares one file.
    Fixed(&'static str),
}

#[derive(Default)]
struct MemoryTier {
    entries: HashMap<String, CachedImage>,
    // Front is least recently used.
    order: VecDeque<String>,
    total_bytes: u64,
}

impl MemoryTier {
    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            if let Some(k) = self.order.remove(pos) {
                self.order.push_back(k);
            }
        }
    }

    fn insert(&mut self, key: String, image: CachedImage, limits: Limits) {
        if let Some(old) = self.entries.remove(&key) {
            self.total_bytes -= old.cost();
            self.order.retain(|k| *k != key);
        }
        self.total_bytes += image.cost();
        self.order.push_back(key.clone());
        self.entries.insert(key, image);

        while self.entries.len() > limits.max_entries || self.total_bytes > limits.max_bytes {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            if let Some(evicted) = self.entries.remove(&oldest) {
                self.total_bytes -= evicted.cost();
                debug!("Evicted {oldest} from memory cache");
            }
        }
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
        self.total_bytes = 0;
    }
}

pub struct ImageCache {
    memory: Mutex<MemoryTier>,
    limits: Limits,
    disk_dir: Option<PathBuf>,
    naming: DiskNaming,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ImageCache {
    pub fn new(limits: Limits, disk_dir: Option<PathBuf>, naming: DiskNaming) -> Self {
        Self {
            memory: Mutex::new(MemoryTier::default()),
            limits,
            disk_dir,
            naming,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn memory(&self) -> MutexGuard<'_, MemoryTier> {
        self.memory.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, key: &str) -> Option<CachedImage> {
        {
            let mut memory = self.memory();
            if let Some(image) = memory.entries.get(key).cloned() {
                memory.touch(key);
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(image);
            }
        }

        if let Some(image) = self.read_disk(key) {
            self.memory().insert(key.to_string(), image.clone(), self.limits);
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Some(image);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Memory tier only. Does not touch the disk, the LRU order or the
    /// counters, so it is cheap enough for a render loop.
    pub fn peek(&self, key: &str) -> Option<CachedImage> {
        self.memory().entries.get(key).cloned()
    }

    pub fn put(&self, key: &str, image: CachedImage) {
        if let Err(err) = self.write_disk(key, &image) {
            warn!("Failed to write image cache entry for {key}: {err:#}");
        }
        self.memory().insert(key.to_string(), image, self.limits);
    }

    pub fn clear(&self) {
        self.memory().clear();
        let Some(dir) = &self.disk_dir else {
            return;
        };
        if let Err(err) = fs::remove_dir_all(dir)
            && err.kind() != std::io::ErrorKind::NotFound
        {
            warn!("Failed to clear image cache at {}: {err}", dir.display());
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    pub fn memory_usage(&self) -> (usize, u64) {
        let memory = self.memory();
        (memory.entries.len(), memory.total_bytes)
    }

    /// Bytes held by the disk tier.
    pub fn disk_usage(&self) -> u64 {
        let Some(dir) = &self.disk_dir else {
            return 0;
        };
        WalkDir::new(dir)
            .parallelism(jwalk::Parallelism::Serial)
            .into_iter()
            .flatten()
            .filter_map(|entry| entry.metadata().ok())
            .filter(std::fs::Metadata::is_file)
            .map(|metadata| metadata.len())
            .sum()
    }

    fn disk_path(&self, key: &str) -> Option<PathBuf> {
        let dir = self.disk_dir.as_ref()?;
        let file_name = match self.naming {
            DiskNaming::Hashed => hashed_name(key),
            DiskNaming::Fixed(name) => name.to_string(),
        };
        Some(dir.join(file_name))
    }

    fn read_disk(&self, key: &str) -> Option<CachedImage> {
        let path = self.disk_path(key)?;
        fs::read(path).ok().map(CachedImage::new)
    }

    fn write_disk(&self, key: &str, image: &CachedImage) -> Result<()> {
        let Some(path) = self.disk_path(key) else {
            return Ok(());
        };
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
        let mut tmp = NamedTempFile::new_in(dir).context("Failed to create temp file")?;
        tmp.write_all(&image.bytes).context("Failed to write image")?;
        tmp.persist(&path)
            .with_context(|| format!("Failed to persist {}", path.display()))?;
        Ok(())
    }
}

fn hashed_name(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use tempfile::tempdir;

    fn image(len: usize, fill: u8) -> CachedImage {
        CachedImage::new(vec![fill; len])
    }

    fn limits(max_entries: usize, max_bytes: u64) -> Limits {
        Limits {
            max_entries,
            max_bytes,
        }
    }

    #[test]
    fn memory_hit_and_miss_are_counted() {
        let cache = ImageCache::new(limits(4, 1024), None, DiskNaming::Hashed);
        assert!(cache.get("a").is_none());
        cache.put("a", image(10, 1));
        assert_eq!(cache.get("a"), Some(image(10, 1)));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn evicts_least_recently_used_by_count() {
        let cache = ImageCache::new(limits(2, 1024), None, DiskNaming::Hashed);
        cache.put("a", image(1, 1));
        cache.put("b", image(1, 2));
        assert!(cache.get("a").is_some()); // "b" is now oldest
        cache.put("c", image(1, 3));

        assert!(cache.get("b").is_none());
        assert!(cache.get("a").is_some());
        assert!(cache.get("c").is_some());
        assert_eq!(cache.memory_usage(), (2, 2));
    }

    #[test]
    fn evicts_by_total_cost() {
        let cache = ImageCache::new(limits(10, 100), None, DiskNaming::Hashed);
        cache.put("a", image(60, 1));
        cache.put("b", image(60, 2));

        assert!(cache.get("a").is_none());
        assert_eq!(cache.memory_usage(), (1, 60));
    }

    #[test]
    fn replacing_a_key_updates_cost() {
        let cache = ImageCache::new(limits(10, 100), None, DiskNaming::Hashed);
        cache.put("a", image(60, 1));
        cache.put("a", image(30, 2));
        assert_eq!(cache.memory_usage(), (1, 30));
        assert_eq!(cache.get("a"), Some(image(30, 2)));
    }

    #[test]
    fn disk_hit_promotes_into_memory() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let disk = dir.path().join("icons");
        let first = ImageCache::new(limits(4, 1024), Some(disk.clone()), DiskNaming::Hashed);
        first.put("/Applications/Safari.app", image(16, 7));

        let second = ImageCache::new(limits(4, 1024), Some(disk), DiskNaming::Hashed);
        assert_eq!(second.memory_usage(), (0, 0));
        assert_eq!(second.get("/Applications/Safari.app"), Some(image(16, 7)));
        assert_eq!(second.memory_usage(), (1, 16));
        assert_eq!(second.stats().hits, 1);
        assert_eq!(second.disk_usage(), 16);
        Ok(())
    }

    #[test]
    fn peek_reads_memory_without_counting() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let disk = dir.path().join("icons");
        let first = ImageCache::new(limits(4, 1024), Some(disk.clone()), DiskNaming::Hashed);
        assert!(first.peek("a").is_none());
        first.put("a", image(8, 1));
        assert_eq!(first.peek("a"), Some(image(8, 1)));
        assert_eq!(first.stats(), CacheStats::default());

        // Only on disk for this instance: peek must not load it.
        let second = ImageCache::new(limits(4, 1024), Some(disk), DiskNaming::Hashed);
        assert!(second.peek("a").is_none());
        assert_eq!(second.memory_usage(), (0, 0));
        assert_eq!(second.stats(), CacheStats::default());
        Ok(())
    }

    #[test]
    fn clear_empties_both_tiers() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let disk = dir.path().join("icons");
        let cache = ImageCache::new(limits(4, 1024), Some(disk.clone()), DiskNaming::Hashed);
        cache.put("a", image(8, 1));
        cache.clear();

        assert!(cache.get("a").is_none());
        assert!(!disk.exists());
        assert_eq!(cache.disk_usage(), 0);
        Ok(())
    }

    #[test]
    fn fixed_naming_uses_one_file() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let cache = ImageCache::new(
            limits(4, 1024),
            Some(dir.path().to_path_buf()),
            DiskNaming::Fixed("wallpaper_cache.png"),
        );
        cache.put("fp-1", image(4, 1));
        cache.put("fp-2", image(4, 2));

        assert!(dir.path().join("wallpaper_cache.png").exists());
        assert_eq!(fs::read_dir(dir.path())?.count(), 1);
        Ok(())
    }

    #[test]
    fn concurrent_get_and_put() {
        let cache = Arc::new(ImageCache::new(limits(16, 1 << 20), None, DiskNaming::Hashed));
        let handles: Vec<_> = (0..8u8)
            .map(|i| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    let key = format!("icon-{i}");
                    for _ in 0..50 {
                        if cache.get(&key).is_none() {
                            cache.put(&key, image(32, i));
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let stats = cache.stats();
        assert_eq!(stats.hits + stats.misses, 400);
        assert_eq!(stats.misses, 8);
        assert_eq!(cache.memory_usage(), (8, 256));
    }
}
