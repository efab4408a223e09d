use crate::filter::{CategoryFilter, filter_entries, page, page_count};
use crate::image_cache::icons::IconCache;
use crate::manager::{InventoryEvent, InventoryManager};
use crate::model::{FolderItem, InventoryEntry};
use log::debug;
use ratatui::widgets::ListState;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Receiver;
use std::thread;

pub enum AppState {
    Browsing,
    Searching,
    Message(String),
}

pub struct App {
    pub manager: Arc<InventoryManager>,
    pub icons: Arc<IconCache>,
    /// Icon disk tier size, measured after each warm-up pass.
    pub icon_disk_bytes: Arc<AtomicU64>,
    pub events: Receiver<InventoryEvent>,
    pub inventory: Arc<Vec<InventoryEntry>>,
    pub loading: bool,
    pub state: AppState,
    pub list_state: ListState,
    pub query: String,
    pub filter: CategoryFilter,
    pub open_folder: Option<FolderItem>,
    pub page: usize,
    pub columns: usize,
}

impl App {
    pub fn new(manager: Arc<InventoryManager>, icons: Arc<IconCache>, columns: usize) -> Self {
        let events = manager.subscribe();
        let inventory = manager.current_inventory();
        let loading = manager.is_loading();
        let mut app = Self {
            manager,
            icons,
            icon_disk_bytes: Arc::new(AtomicU64::new(0)),
            events,
            inventory,
            loading,
            state: AppState::Browsing,
            list_state: ListState::default(),
            query: String::new(),
            filter: CategoryFilter::All,
            open_folder: None,
            page: 0,
            columns,
        };
        app.warm_icons();
        app.reset_selection();
        app
    }

    /// Everything matching the current search and category tab.
    pub fn filtered(&self) -> Vec<InventoryEntry> {
        filter_entries(&self.inventory, &self.query, self.filter)
    }

    /// Entries on screen: the open folder's apps, or the current page.
    pub fn visible(&self) -> Vec<InventoryEntry> {
        if let Some(folder) = &self.open_folder {
            return folder.apps.iter().cloned().map(InventoryEntry::App).collect();
        }
        page(&self.filtered(), self.page, self.columns).to_vec()
    }

    pub fn page_count(&self) -> usize {
        page_count(self.filtered().len(), self.columns)
    }

    pub fn selected(&self) -> Option<InventoryEntry> {
        let index = self.list_state.selected()?;
        self.visible().into_iter().nth(index)
    }

    pub fn counts(&self) -> (usize, usize) {
        self.inventory
            .iter()
            .fold((0, 0), |(apps, folders), entry| {
                let folder = usize::from(matches!(entry, InventoryEntry::Folder(_)));
                (apps + entry.app_count(), folders + folder)
            })
    }

    /// Drains published snapshots from the manager.
    pub fn check_inventory_updates(&mut self) {
        let mut changed = false;
        while let Ok(event) = self.events.try_recv() {
            match event {
                InventoryEvent::Inventory(inventory) => {
                    self.inventory = inventory;
                    changed = true;
                }
                InventoryEvent::Loading(loading) => self.loading = loading,
            }
        }
        if changed {
            self.open_folder = None;
            self.page = self.page.min(self.page_count() - 1);
            self.reset_selection();
            self.warm_icons();
        }
    }

    fn reset_selection(&mut self) {
        let selected = if self.visible().is_empty() { None } else { Some(0) };
        self.list_state.select(selected);
    }

    fn warm_icons(&self) {
        let icons = Arc::clone(&self.icons);
        let inventory = Arc::clone(&self.inventory);
        let disk_bytes = Arc::clone(&self.icon_disk_bytes);
        thread::spawn(move || {
            let mut loaded = 0usize;
            for entry in inventory.iter() {
                let apps = match entry {
                    InventoryEntry::App(app) => std::slice::from_ref(app),
                    InventoryEntry::Folder(folder) => folder.apps.as_slice(),
                };
                for path in apps.iter().filter_map(|app| app.path.as_deref()) {
                    if icons.icon(path).is_some() {
                        loaded += 1;
                    }
                }
            }
            debug!("Warmed {loaded} icons");
            disk_bytes.store(icons.disk_usage(), Ordering::Relaxed);
        });
    }

    pub fn next(&mut self) {
        let len = self.visible().len();
        if len == 0 {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.list_state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.visible().len();
        if len == 0 {
            return;
        }
        let i = match self.list_state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.list_state.select(Some(i));
    }

    pub fn next_page(&mut self) {
        if self.open_folder.is_none() && self.page + 1 < self.page_count() {
            self.page += 1;
            self.reset_selection();
        }
    }

    pub fn previous_page(&mut self) {
        if self.open_folder.is_none() && self.page > 0 {
            self.page -= 1;
            self.reset_selection();
        }
    }

    pub fn cycle_filter(&mut self) {
        self.filter = self.filter.next();
        self.open_folder = None;
        self.page = 0;
        self.reset_selection();
    }

    pub fn push_query(&mut self, c: char) {
        self.query.push(c);
        self.page = 0;
        self.reset_selection();
    }

    pub fn pop_query(&mut self) {
        self.query.pop();
        self.page = 0;
        self.reset_selection();
    }

    /// Opens a folder or launches an application.
    pub fn activate(&mut self) {
        match self.selected() {
            Some(InventoryEntry::Folder(folder)) => {
                self.open_folder = Some(folder);
                self.reset_selection();
            }
            Some(InventoryEntry::App(app)) => {
                if let Err(err) = self.manager.launch(&app) {
                    self.state = AppState::Message(format!("Could not open {}: {err}", app.name));
                }
            }
            None => {}
        }
    }

    pub fn leave_folder(&mut self) {
        if self.open_folder.take().is_some() {
            self.reset_selection();
        }
    }

    pub fn refresh(&self) {
        self.manager.refresh();
    }

    /// Also drops cached icons, which are reloaded once the scan lands.
    pub fn force_refresh(&mut self) {
        self.loading = true;
        self.icons.clear();
        self.manager.force_refresh();
    }
}
