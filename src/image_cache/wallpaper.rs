//! Scaled-down copy of the configured background image.

use crate::constants::{
    WALLPAPER_CACHE_DIR, WALLPAPER_CACHE_FILE, WALLPAPER_FINGERPRINT_KEY, WALLPAPER_MAX_HEIGHT,
    WALLPAPER_MAX_WIDTH, WALLPAPER_MEMORY_BYTES, WALLPAPER_MEMORY_ENTRIES,
};
use crate::image_cache::{CachedImage, DiskNaming, ImageCache, Limits};
use crate::store::Store;
use anyhow::{Context, Result};
use image::ImageFormat;
use image::imageops::FilterType;
use log::{info, warn};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::UNIX_EPOCH;

pub struct WallpaperCache {
    images: ImageCache,
    store: Arc<dyn Store>,
}

impl WallpaperCache {
    pub fn new(cache_dir: &Path, store: Arc<dyn Store>) -> Self {
        Self::with_disk_dir(Some(cache_dir.join(WALLPAPER_CACHE_DIR)), store)
    }

    pub fn with_disk_dir(disk_dir: Option<PathBuf>, store: Arc<dyn Store>) -> Self {
        Self {
            images: ImageCache::new(
                Limits {
                    max_entries: WALLPAPER_MEMORY_ENTRIES,
                    max_bytes: WALLPAPER_MEMORY_BYTES,
                },
                disk_dir,
                DiskNaming::Fixed(WALLPAPER_CACHE_FILE),
            ),
            store,
        }
    }

    /// Compares the source's fingerprint with the one last seen.
    ///
    /// The first call only records the fingerprint and returns `false`.
    /// After that, a changed fingerprint returns `true` once and becomes
    /// the new baseline.
    pub fn should_update_cache(&self, source: &Path) -> bool {
        let current = fingerprint(source);
        let stored = self
            .store
            .get(WALLPAPER_FINGERPRINT_KEY)
            .and_then(|bytes| String::from_utf8(bytes).ok());

        if stored.as_deref() == Some(current.as_str()) {
            return false;
        }
        if let Err(err) = self.store.set(WALLPAPER_FINGERPRINT_KEY, current.as_bytes()) {
            warn!("Failed to store wallpaper fingerprint: {err:#}");
        }
        stored.is_some()
    }

    /// PNG bytes for `source`, scaled to fit the maximum wallpaper size.
    pub fn load(&self, source: &Path) -> Result<CachedImage> {
        if self.should_update_cache(source) {
            info!("Wallpaper changed, clearing cached copy");
            self.images.clear();
        }

        let key = fingerprint(source);
        if let Some(image) = self.images.get(&key) {
            return Ok(image);
        }

        let image = CachedImage::new(render(source)?);
        self.images.put(&key, image.clone());
        Ok(image)
    }
}

/// Modification time and size, or the file name when metadata is missing.
pub fn fingerprint(source: &Path) -> String {
    let modified = source
        .metadata()
        .ok()
        .and_then(|meta| Some((meta.modified().ok()?, meta.len())));

    match modified {
        Some((mtime, len)) => {
            let since_epoch = mtime.duration_since(UNIX_EPOCH).unwrap_or_default();
            format!(
                "{}.{:09}:{len}",
                since_epoch.as_secs(),
                since_epoch.subsec_nanos()
            )
        }
        None => format!(
            "name:{}",
            source
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_default()
        ),
    }
}

fn render(source: &Path) -> Result<Vec<u8>> {
    let mut decoded =
        image::open(source).with_context(|| format!("Failed to decode {}", source.display()))?;
    if decoded.width() > WALLPAPER_MAX_WIDTH || decoded.height() > WALLPAPER_MAX_HEIGHT {
        decoded = decoded.resize(WALLPAPER_MAX_WIDTH, WALLPAPER_MAX_HEIGHT, FilterType::Triangle);
    }

    let mut bytes = Vec::new();
    decoded
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .context("Failed to encode wallpaper")?;
    Ok(bytes)
}
