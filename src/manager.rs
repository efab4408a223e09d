//! Owns the published inventory and runs scans on a background thread.
//!
//! At most one scan runs at a time. A plain refresh that arrives during a
//! scan is folded into that scan's result; a forced refresh waits for it
//! to finish and then scans again.

use crate::cache::InventoryCache;
use crate::launcher::Launcher;
use crate::model::{ApplicationItem, InventoryEntry};
use crate::scanner::Scanner;
use anyhow::{Result, anyhow};
use log::{debug, error, info, warn};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InventoryEvent {
    Inventory(Arc<Vec<InventoryEntry>>),
    Loading(bool),
}

#[derive(Default)]
struct Published {
    inventory: Arc<Vec<InventoryEntry>>,
    loading: bool,
}

#[derive(Default)]
struct Flight {
    in_flight: bool,
    rerun: bool,
}

struct Shared {
    scanner: Arc<dyn Scanner>,
    cache: InventoryCache,
    launcher: Arc<dyn Launcher>,
    published: Mutex<Published>,
    flight: Mutex<Flight>,
    idle: Condvar,
    subscribers: Mutex<Vec<Sender<InventoryEvent>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Shared {
    fn notify(&self, event: &InventoryEvent) {
        lock(&self.subscribers).retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn publish(&self, entries: Vec<InventoryEntry>) {
        let inventory = Arc::new(entries);
        lock(&self.published).inventory = Arc::clone(&inventory);
        self.notify(&InventoryEvent::Inventory(inventory));
    }

    fn set_loading(&self, loading: bool) {
        {
            let mut published = lock(&self.published);
            if published.loading == loading {
                return;
            }
            published.loading = loading;
        }
        self.notify(&InventoryEvent::Loading(loading));
    }

    /// Starts a scan unless one is running. Lock order is flight, then
    /// published, then subscribers.
    fn request_scan(self: &Arc<Self>, show_loading: bool, force: bool) {
        let mut flight = lock(&self.flight);
        if show_loading {
            self.set_loading(true);
        }
        if flight.in_flight {
            if force {
                debug!("Scan in flight, queueing a rescan");
                flight.rerun = true;
            } else {
                debug!("Scan in flight, joining it");
            }
            return;
        }
        flight.in_flight = true;
        drop(flight);

        let shared = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name("inventory-scan".to_string())
            .spawn(move || shared.run_scans());
        if let Err(err) = spawned {
            error!("Failed to start scan thread: {err}");
            let mut flight = lock(&self.flight);
            flight.in_flight = false;
            flight.rerun = false;
            self.set_loading(false);
            self.idle.notify_all();
        }
    }

    fn run_scans(&self) {
        loop {
            let entries = self.scanner.scan();
            info!("Scanned {} inventory entries", entries.len());
            self.cache.store(&entries);
            self.publish(entries);

            let mut flight = lock(&self.flight);
            if flight.rerun {
                flight.rerun = false;
                continue;
            }
            flight.in_flight = false;
            self.set_loading(false);
            self.idle.notify_all();
            return;
        }
    }
}

pub struct InventoryManager {
    shared: Arc<Shared>,
}

impl InventoryManager {
    pub fn new(
        scanner: Arc<dyn Scanner>,
        cache: InventoryCache,
        launcher: Arc<dyn Launcher>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                scanner,
                cache,
                launcher,
                published: Mutex::new(Published::default()),
                flight: Mutex::new(Flight::default()),
                idle: Condvar::new(),
                subscribers: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Publishes the cached inventory if it is still fresh, otherwise
    /// shows the loading state and scans.
    pub fn start(&self) {
        if let Some(entries) = self.shared.cache.load() {
            info!("Loaded {} entries from cache", entries.len());
            self.shared.publish(entries);
            return;
        }
        self.shared.request_scan(true, false);
    }

    pub fn current_inventory(&self) -> Arc<Vec<InventoryEntry>> {
        Arc::clone(&lock(&self.shared.published).inventory)
    }

    pub fn is_loading(&self) -> bool {
        lock(&self.shared.published).loading
    }

    /// Receives every published inventory and loading change from now on.
    pub fn subscribe(&self) -> Receiver<InventoryEvent> {
        let (tx, rx) = mpsc::channel();
        lock(&self.shared.subscribers).push(tx);
        rx
    }

    /// Rescans in the background. The loading flag is only raised when
    /// there is nothing to show yet.
    pub fn refresh(&self) {
        let cold = self.current_inventory().is_empty();
        self.shared.request_scan(cold, false);
    }

    /// Drops the persisted inventory and rescans with the loading flag up.
    pub fn force_refresh(&self) {
        info!("Forcing inventory refresh");
        self.shared.cache.invalidate();
        self.shared.request_scan(true, true);
    }

    pub fn launch(&self, item: &ApplicationItem) -> Result<()> {
        let path = item
            .path
            .as_deref()
            .ok_or_else(|| anyhow!("{} has no bundle path", item.name))?;
        info!("Launching {}", path.display());
        self.shared.launcher.open(path).inspect_err(|err| {
            warn!("Failed to launch {}: {err:#}", item.name);
        })
    }

    /// Blocks until no scan is running.
    pub fn wait_idle(&self) {
        let mut flight = lock(&self.shared.flight);
        while flight.in_flight {
            flight = self
                .shared
                .idle
                .wait(flight)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::INVENTORY_KEY;
    use crate::model::Category;
    use crate::store::{MemoryStore, Store};
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Returns a fixed inventory, optionally blocking until released, and
    /// records how many scans overlap.
    #[derive(Default)]
    struct FakeScanner {
        entries: Mutex<Vec<InventoryEntry>>,
        gate: Mutex<bool>,
        gate_changed: Condvar,
        gated: bool,
        calls: AtomicUsize,
        active: AtomicUsize,
        max_active: AtomicUsize,
    }

    impl FakeScanner {
        fn new(entries: Vec<InventoryEntry>) -> Self {
            Self {
                entries: Mutex::new(entries),
                ..Self::default()
            }
        }

        fn gated(entries: Vec<InventoryEntry>) -> Self {
            Self {
                gated: true,
                ..Self::new(entries)
            }
        }

        fn release(&self) {
            *lock(&self.gate) = true;
            self.gate_changed.notify_all();
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Scanner for FakeScanner {
        fn scan(&self) -> Vec<InventoryEntry> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);

            if self.gated {
                let mut open = lock(&self.gate);
                while !*open {
                    open = self.gate_changed.wait(open).unwrap();
                }
            } else {
                thread::sleep(Duration::from_millis(20));
            }

            self.active.fetch_sub(1, Ordering::SeqCst);
            lock(&self.entries).clone()
        }
    }

    #[derive(Default)]
    struct RecordingLauncher {
        opened: Mutex<Vec<PathBuf>>,
    }

    impl Launcher for RecordingLauncher {
        fn open(&self, path: &Path) -> Result<()> {
            lock(&self.opened).push(path.to_path_buf());
            Ok(())
        }
    }

    fn app(name: &str) -> InventoryEntry {
        InventoryEntry::App(ApplicationItem::new(
            name.to_string(),
            Category::Utilities,
            String::new(),
            PathBuf::from(format!("/Applications/{name}.app")),
        ))
    }

    fn manager_with(
        scanner: &Arc<FakeScanner>,
        store: &Arc<MemoryStore>,
    ) -> (InventoryManager, Arc<RecordingLauncher>) {
        let launcher = Arc::new(RecordingLauncher::default());
        let manager = InventoryManager::new(
            Arc::clone(scanner) as Arc<dyn Scanner>,
            InventoryCache::new(Arc::clone(store) as Arc<dyn Store>),
            Arc::clone(&launcher) as Arc<dyn Launcher>,
        );
        (manager, launcher)
    }

    #[test]
    fn cache_hit_publishes_without_scanning() {
        let store = Arc::new(MemoryStore::default());
        InventoryCache::new(store.clone()).store(&[app("Safari")]);
        let scanner = Arc::new(FakeScanner::new(vec![app("Other")]));
        let (manager, _) = manager_with(&scanner, &store);

        manager.start();
        assert_eq!(manager.current_inventory()[0].name(), "Safari");
        assert!(!manager.is_loading());
        assert_eq!(scanner.calls(), 0);
    }

    #[test]
    fn cache_miss_scans_with_loading_flag() {
        let store = Arc::new(MemoryStore::default());
        let scanner = Arc::new(FakeScanner::gated(vec![app("Safari")]));
        let (manager, _) = manager_with(&scanner, &store);

        manager.start();
        assert!(manager.is_loading());
        assert!(manager.current_inventory().is_empty());

        scanner.release();
        manager.wait_idle();
        assert!(!manager.is_loading());
        assert_eq!(manager.current_inventory().len(), 1);
        assert!(store.get(INVENTORY_KEY).is_some());
    }

    #[test]
    fn refresh_with_inventory_keeps_loading_flag_down() {
        let store = Arc::new(MemoryStore::default());
        InventoryCache::new(store.clone()).store(&[app("Old")]);
        let scanner = Arc::new(FakeScanner::new(vec![app("New")]));
        let (manager, _) = manager_with(&scanner, &store);
        manager.start();

        let events = manager.subscribe();
        manager.refresh();
        manager.wait_idle();

        let received: Vec<_> = events.try_iter().collect();
        assert_eq!(received.len(), 1);
        assert!(matches!(&received[0], InventoryEvent::Inventory(inv) if inv[0].name() == "New"));
    }

    #[test]
    fn cold_refresh_reports_loading_around_the_scan() {
        let store = Arc::new(MemoryStore::default());
        let scanner = Arc::new(FakeScanner::new(vec![app("Mail")]));
        let (manager, _) = manager_with(&scanner, &store);

        let events = manager.subscribe();
        manager.refresh();
        manager.wait_idle();

        let received: Vec<_> = events.try_iter().collect();
        assert_eq!(received.len(), 3);
        assert_eq!(received[0], InventoryEvent::Loading(true));
        assert!(matches!(&received[1], InventoryEvent::Inventory(inv) if inv.len() == 1));
        assert_eq!(received[2], InventoryEvent::Loading(false));
    }

    #[test]
    fn overlapping_refreshes_share_one_scan() {
        let store = Arc::new(MemoryStore::default());
        let scanner = Arc::new(FakeScanner::gated(vec![app("Notes")]));
        let (manager, _) = manager_with(&scanner, &store);

        manager.refresh();
        manager.refresh();
        manager.refresh();
        scanner.release();
        manager.wait_idle();

        assert_eq!(scanner.calls(), 1);
        assert_eq!(scanner.max_active.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn repeated_refresh_is_idempotent() {
        let store = Arc::new(MemoryStore::default());
        let scanner = Arc::new(FakeScanner::new(vec![app("Notes"), app("Maps")]));
        let (manager, _) = manager_with(&scanner, &store);

        manager.refresh();
        manager.wait_idle();
        let first = manager.current_inventory();
        manager.refresh();
        manager.wait_idle();

        assert_eq!(*first, *manager.current_inventory());
        assert_eq!(scanner.max_active.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn concurrent_callers_never_race_scans() {
        let store = Arc::new(MemoryStore::default());
        let scanner = Arc::new(FakeScanner::new(vec![app("Notes")]));
        let (manager, _) = manager_with(&scanner, &store);
        let manager = Arc::new(manager);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let manager = Arc::clone(&manager);
                thread::spawn(move || {
                    for _ in 0..5 {
                        if i % 2 == 0 {
                            manager.refresh();
                        } else {
                            manager.force_refresh();
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        manager.wait_idle();

        assert_eq!(scanner.max_active.load(Ordering::SeqCst), 1);
        assert!(!manager.is_loading());
        assert_eq!(manager.current_inventory().len(), 1);
    }

    #[test]
    fn force_refresh_invalidates_and_rescans() {
        let store = Arc::new(MemoryStore::default());
        InventoryCache::new(store.clone()).store(&[app("Old")]);
        let scanner = Arc::new(FakeScanner::gated(vec![app("New")]));
        let (manager, _) = manager_with(&scanner, &store);
        manager.start();

        manager.force_refresh();
        assert!(store.get(INVENTORY_KEY).is_none());
        assert!(manager.is_loading());
        // Stale entries stay visible until the scan lands.
        assert_eq!(manager.current_inventory()[0].name(), "Old");

        scanner.release();
        manager.wait_idle();
        assert!(!manager.is_loading());
        assert_eq!(manager.current_inventory()[0].name(), "New");
    }

    #[test]
    fn force_refresh_during_scan_runs_again_afterwards() {
        let store = Arc::new(MemoryStore::default());
        let scanner = Arc::new(FakeScanner::gated(vec![app("A")]));
        let (manager, _) = manager_with(&scanner, &store);

        manager.refresh();
        manager.force_refresh();
        scanner.release();
        manager.wait_idle();

        assert_eq!(scanner.calls(), 2);
        assert_eq!(scanner.max_active.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn launch_hands_path_to_launcher() -> Result<()> {
        let store = Arc::new(MemoryStore::default());
        let scanner = Arc::new(FakeScanner::new(Vec::new()));
        let (manager, launcher) = manager_with(&scanner, &store);

        let InventoryEntry::App(item) = app("Safari") else {
            unreachable!();
        };
        manager.launch(&item)?;
        assert_eq!(*lock(&launcher.opened), [PathBuf::from("/Applications/Safari.app")]);

        let mut pathless = item.clone();
        pathless.path = None;
        assert!(manager.launch(&pathless).is_err());
        assert_eq!(lock(&launcher.opened).len(), 1);
        Ok(())
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let store = Arc::new(MemoryStore::default());
        let scanner = Arc::new(FakeScanner::new(vec![app("A")]));
        let (manager, _) = manager_with(&scanner, &store);

        drop(manager.subscribe());
        let live = manager.subscribe();
        manager.refresh();
        manager.wait_idle();

        assert_eq!(lock(&manager.shared.subscribers).len(), 1);
        assert!(live.try_iter().count() > 0);
    }
}
