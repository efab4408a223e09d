pub mod utils;

use crate::bundle::{is_bundle_name, read_bundle};
use crate::categorizer::categorize_folder;
use crate::config::HiddenList;
use crate::constants::{APPLICATIONS, SYSTEM_APPLICATIONS, USER_APPLICATIONS_DIR, USERS_DIR};
use crate::model::{ApplicationItem, FolderItem, InventoryEntry, compare_names, sort_entries};
use crate::scanner::utils::{file_name_string, list_visible_entries};
use log::{debug, info};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// Produces a full inventory snapshot. Implementations never fail; I/O
/// problems only shrink the result.
pub trait Scanner: Send + Sync {
    fn scan(&self) -> Vec<InventoryEntry>;
}

pub struct FilesystemScanner {
    pub roots: Vec<PathBuf>,
    pub hidden: HiddenList,
}

impl FilesystemScanner {
    pub fn new(roots: Vec<PathBuf>, hidden: HiddenList) -> Self {
        Self { roots, hidden }
    }

    pub fn scan_with_progress(&self, progress_cb: Option<&(dyn Fn() + Sync)>) -> Vec<InventoryEntry> {
        info!("Scanning {} application roots", self.roots.len());
        let entries = scan_roots(&self.roots, &self.hidden, progress_cb);
        info!("Scan complete: {} entries", entries.len());
        entries
    }
}

impl Scanner for FilesystemScanner {
    fn scan(&self) -> Vec<InventoryEntry> {
        self.scan_with_progress(None)
    }
}

/// System applications, shared applications, then the user's own
/// `~/Applications` when it exists, followed by any configured extras.
pub fn default_roots(extra: &[PathBuf]) -> Vec<PathBuf> {
    let mut roots = vec![
        PathBuf::from(SYSTEM_APPLICATIONS),
        PathBuf::from(APPLICATIONS),
    ];

    if let Some(user_apps) = user_home().map(|home| home.join(USER_APPLICATIONS_DIR))
        && user_apps.is_dir()
    {
        roots.push(user_apps);
    }

    roots.extend(extra.iter().cloned());
    roots
}

fn user_home() -> Option<PathBuf> {
    if let Ok(sudo_user) = std::env::var("SUDO_USER") {
        return Some(PathBuf::from(USERS_DIR).join(sudo_user));
    }
    dirs::home_dir()
}

/// Scans each root two levels deep and returns the entries sorted by name.
pub fn scan_roots(
    roots: &[PathBuf],
    hidden: &HiddenList,
    progress_cb: Option<&(dyn Fn() + Sync)>,
) -> Vec<InventoryEntry> {
    let mut entries: Vec<InventoryEntry> = roots
        .iter()
        .flat_map(|root| scan_root(root, hidden, progress_cb))
        .collect();
    sort_entries(&mut entries);
    entries
}

fn scan_root(
    root: &Path,
    hidden: &HiddenList,
    progress_cb: Option<&(dyn Fn() + Sync)>,
) -> Vec<InventoryEntry> {
    debug!("Scanning root {}", root.display());

    list_visible_entries(root)
        .par_iter()
        .filter(|path| !hidden.is_hidden(path))
        .filter_map(|path| {
            if is_bundle_name(&file_name_string(path)) {
                read_app(path, progress_cb).map(InventoryEntry::App)
            } else if path.is_dir() {
                scan_folder(path, hidden, progress_cb).map(InventoryEntry::Folder)
            } else {
                None
            }
        })
        .collect()
}

/// Second level: only bundles directly inside `dir` count, nothing deeper.
fn scan_folder(
    dir: &Path,
    hidden: &HiddenList,
    progress_cb: Option<&(dyn Fn() + Sync)>,
) -> Option<FolderItem> {
    let mut apps: Vec<ApplicationItem> = list_visible_entries(dir)
        .par_iter()
        .filter(|path| is_bundle_name(&file_name_string(path)))
        .filter(|path| !hidden.is_hidden(path))
        .filter_map(|path| read_app(path, progress_cb))
        .collect();

    if apps.is_empty() {
        return None;
    }

    apps.sort_by(|a, b| compare_names(&a.name, &b.name));
    let name = file_name_string(dir);
    let category = categorize_folder(&name, &apps);

    Some(FolderItem {
        name,
        category,
        apps,
        folder_path: dir.to_path_buf(),
    })
}

fn read_app(path: &Path, progress_cb: Option<&(dyn Fn() + Sync)>) -> Option<ApplicationItem> {
    if let Some(cb) = progress_cb {
        cb();
    }
    let item = read_bundle(path);
    if item.is_none() {
        debug!("Skipping unreadable bundle {}", path.display());
    }
    item
}
