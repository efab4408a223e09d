//! Application icons, keyed by bundle path.

use crate::bundle::plist_value;
use crate::constants::{
    BUNDLE_RESOURCES, ICON_CACHE_DIR, ICON_MEMORY_BYTES, ICON_MEMORY_ENTRIES, INFO_PLIST,
};
use crate::image_cache::{CacheStats, CachedImage, DiskNaming, ImageCache, Limits};
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

const ICNS_EXTENSION: &str = "icns";

pub struct IconCache {
    images: ImageCache,
}

impl IconCache {
    /// Icons persist under `<cache_dir>/icons`.
    pub fn new(cache_dir: &Path) -> Self {
        Self::with_limits(
            Some(cache_dir.join(ICON_CACHE_DIR)),
            Limits {
                max_entries: ICON_MEMORY_ENTRIES,
                max_bytes: ICON_MEMORY_BYTES,
            },
        )
    }

    pub fn with_limits(disk_dir: Option<PathBuf>, limits: Limits) -> Self {
        Self {
            images: ImageCache::new(limits, disk_dir, DiskNaming::Hashed),
        }
    }

    /// Cached icon for the bundle at `app_path`, loading it from the
    /// bundle's resources on a miss. `None` when the bundle has no icon.
    pub fn icon(&self, app_path: &Path) -> Option<CachedImage> {
        let key = app_path.to_string_lossy();
        if let Some(image) = self.images.get(&key) {
            return Some(image);
        }

        let icon_path = find_icon_file(app_path)?;
        let bytes = match fs::read(&icon_path) {
            Ok(bytes) if !bytes.is_empty() => bytes,
            Ok(_) => return None,
            Err(err) => {
                debug!("Failed to read icon {}: {err}", icon_path.display());
                return None;
            }
        };
        let image = CachedImage::new(bytes);
        self.images.put(&key, image.clone());
        Some(image)
    }

    /// Icon already held in memory. Never reads the bundle or the disk tier.
    pub fn cached(&self, app_path: &Path) -> Option<CachedImage> {
        self.images.peek(&app_path.to_string_lossy())
    }

    pub fn stats(&self) -> CacheStats {
        self.images.stats()
    }

    pub fn memory_usage(&self) -> (usize, u64) {
        self.images.memory_usage()
    }

    pub fn disk_usage(&self) -> u64 {
        self.images.disk_usage()
    }

    pub fn clear(&self) {
        self.images.clear();
    }
}

/// `CFBundleIconFile` from Info.plist, or the first `.icns` in Resources.
fn find_icon_file(app_path: &Path) -> Option<PathBuf> {
    let resources = app_path.join(BUNDLE_RESOURCES);

    if let Ok(content) = fs::read_to_string(app_path.join(INFO_PLIST))
        && let Some(name) = plist_value(&content, "CFBundleIconFile")
    {
        let mut candidate = resources.join(name.trim());
        if candidate.extension().is_none() {
            candidate.set_extension(ICNS_EXTENSION);
        }
        if candidate.is_file() {
            return Some(candidate);
        }
    }

    let mut icns: Vec<PathBuf> = fs::read_dir(&resources)
        .ok()?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(ICNS_EXTENSION))
        })
        .collect();
    icns.sort();
    icns.into_iter().next()
}
