//! Persisted inventory snapshot with a one hour lifetime.

use crate::constants::{
    CACHE_EXPIRATION, INVENTORY_KEY, INVENTORY_STORED_AT_KEY, LEGACY_INVENTORY_KEY,
    LEGACY_STORED_AT_KEY,
};
use crate::model::{ApplicationItem, Category, InventoryEntry, sort_entries};
use crate::store::Store;
use log::{debug, info, warn};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub type Clock = Box<dyn Fn() -> SystemTime + Send + Sync>;

/// Record layout written by earlier releases: a flat list of apps.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyAppRecord {
    name: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    bundle_identifier: String,
    #[serde(default)]
    path: Option<String>,
}

impl From<LegacyAppRecord> for ApplicationItem {
    fn from(record: LegacyAppRecord) -> Self {
        let category = Category::from_label(&record.category).unwrap_or_default();
        let mut item = Self::new(
            record.name,
            category,
            record.bundle_identifier,
            PathBuf::new(),
        );
        item.path = record.path.map(PathBuf::from);
        item
    }
}

pub struct InventoryCache {
    store: Arc<dyn Store>,
    expiration: Duration,
    clock: Clock,
}

impl InventoryCache {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            expiration: CACHE_EXPIRATION,
            clock: Box::new(SystemTime::now),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// The cached tree if present, decodable and younger than the expiry.
    pub fn load(&self) -> Option<Vec<InventoryEntry>> {
        self.load_current().or_else(|| self.load_legacy())
    }

    /// Failures are logged; the in-memory inventory stays authoritative.
    pub fn store(&self, entries: &[InventoryEntry]) {
        let payload = match serde_json::to_vec(entries) {
            Ok(payload) => payload,
            Err(err) => {
                warn!("Failed to serialize inventory: {err}");
                return;
            }
        };
        let stored_at = millis_since_epoch((self.clock)());

        if let Err(err) = self.store.set(INVENTORY_KEY, &payload) {
            warn!("Failed to persist inventory: {err:#}");
            return;
        }
        if let Err(err) = self.store.set(INVENTORY_STORED_AT_KEY, stored_at.to_string().as_bytes()) {
            warn!("Failed to persist inventory timestamp: {err:#}");
        }
        debug!("Stored {} inventory entries", entries.len());
    }

    pub fn invalidate(&self) {
        info!("Invalidating inventory cache");
        self.discard_current();
        self.discard_legacy();
    }

    fn load_current(&self) -> Option<Vec<InventoryEntry>> {
        let payload = self.store.get(INVENTORY_KEY)?;
        let entries = match serde_json::from_slice::<Vec<InventoryEntry>>(&payload) {
            Ok(entries) => entries,
            Err(err) => {
                warn!("Discarding corrupt inventory cache: {err}");
                self.discard_current();
                return None;
            }
        };

        let stored_at = self
            .store
            .get(INVENTORY_STORED_AT_KEY)
            .and_then(|raw| String::from_utf8(raw).ok())
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .and_then(|millis| UNIX_EPOCH.checked_add(Duration::from_millis(millis)));

        if self.is_fresh(stored_at) {
            debug!("Inventory cache hit: {} entries", entries.len());
            Some(entries)
        } else {
            debug!("Inventory cache expired");
            None
        }
    }

    /// Best effort; any problem here is a plain miss.
    fn load_legacy(&self) -> Option<Vec<InventoryEntry>> {
        let payload = self.store.get(LEGACY_INVENTORY_KEY)?;
        let records = match serde_json::from_slice::<Vec<LegacyAppRecord>>(&payload) {
            Ok(records) => records,
            Err(err) => {
                warn!("Discarding unreadable legacy inventory cache: {err}");
                self.discard_legacy();
                return None;
            }
        };

        let stored_at = match self.store.get(LEGACY_STORED_AT_KEY) {
            None => None,
            Some(raw) => {
                let Some(stored_at) = legacy_timestamp(&raw) else {
                    warn!("Discarding legacy inventory cache with unreadable timestamp");
                    self.discard_legacy();
                    return None;
                };
                Some(stored_at)
            }
        };

        if !self.is_fresh(stored_at) {
            return None;
        }

        let mut entries: Vec<InventoryEntry> = records
            .into_iter()
            .map(|record| InventoryEntry::App(record.into()))
            .collect();
        sort_entries(&mut entries);
        info!("Upconverted {} entries from legacy cache", entries.len());
        Some(entries)
    }

    fn is_fresh(&self, stored_at: Option<SystemTime>) -> bool {
        let Some(stored_at) = stored_at else {
            return false;
        };
        // A timestamp in the future counts as age zero.
        let age = (self.clock)()
            .duration_since(stored_at)
            .unwrap_or(Duration::ZERO);
        age < self.expiration
    }

    fn discard_current(&self) {
        self.store.remove(INVENTORY_KEY);
        self.store.remove(INVENTORY_STORED_AT_KEY);
    }

    fn discard_legacy(&self) {
        self.store.remove(LEGACY_INVENTORY_KEY);
        self.store.remove(LEGACY_STORED_AT_KEY);
    }
}

/// Fractional seconds since the epoch. `None` for anything a `SystemTime`
/// cannot hold.
fn legacy_timestamp(raw: &[u8]) -> Option<SystemTime> {
    let secs = std::str::from_utf8(raw).ok()?.trim().parse::<f64>().ok()?;
    let since_epoch = Duration::try_from_secs_f64(secs).ok()?;
    UNIX_EPOCH.checked_add(since_epoch)
}

fn millis_since_epoch(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}
