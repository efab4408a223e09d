use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    System,
    Development,
    Productivity,
    Entertainment,
    #[default]
    Utilities,
}

impl Category {
    /// Display order used by the category tabs.
    pub const ALL: [Self; 5] = [
        Self::Utilities,
        Self::Productivity,
        Self::Entertainment,
        Self::Development,
        Self::System,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::System => "System",
            Self::Development => "Development",
            Self::Productivity => "Productivity",
            Self::Entertainment => "Entertainment",
            Self::Utilities => "Utilities",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(label.trim()))
    }
}

/// An installed application bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationItem {
    pub id: String,
    pub name: String,
    pub category: Category,
    pub identifier: String,
    pub path: Option<PathBuf>,
}

impl ApplicationItem {
    pub fn new(name: String, category: Category, identifier: String, path: PathBuf) -> Self {
        Self {
            id: next_item_id(),
            name,
            category,
            identifier,
            path: Some(path),
        }
    }
}

/// Applications found one level inside a subdirectory of a scan root.
/// Never constructed with an empty `apps` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderItem {
    pub name: String,
    pub category: Category,
    pub apps: Vec<ApplicationItem>,
    pub folder_path: PathBuf,
}

/// One top-level slot in the grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum InventoryEntry {
    App(ApplicationItem),
    Folder(FolderItem),
}

impl InventoryEntry {
    pub fn name(&self) -> &str {
        match self {
            Self::App(app) => &app.name,
            Self::Folder(folder) => &folder.name,
        }
    }

    pub fn category(&self) -> Category {
        match self {
            Self::App(app) => app.category,
            Self::Folder(folder) => folder.category,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::App(app) => app.path.as_deref(),
            Self::Folder(folder) => Some(&folder.folder_path),
        }
    }

    /// Number of applications represented by this slot.
    pub fn app_count(&self) -> usize {
        match self {
            Self::App(_) => 1,
            Self::Folder(folder) => folder.apps.len(),
        }
    }
}

pub fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

pub fn sort_entries(entries: &mut [InventoryEntry]) {
    entries.sort_by(|a, b| compare_names(a.name(), b.name()));
}

// Process-unique, not stable across scans.
fn next_item_id() -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let seq = COUNTER.fetch_add(1, AtomicOrdering::Relaxed);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("{nanos:x}-{seq:x}")
}
