//! Search, category tabs and paging over a published inventory.

use crate::constants::ROWS_PER_PAGE;
use crate::model::{Category, InventoryEntry};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

impl CategoryFilter {
    pub fn matches(self, category: Category) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => wanted == category,
        }
    }

    /// `All`, then each category in turn, then back to `All`.
    pub fn next(self) -> Self {
        match self {
            Self::All => Self::Only(Category::ALL[0]),
            Self::Only(current) => Category::ALL
                .iter()
                .position(|c| *c == current)
                .and_then(|i| Category::ALL.get(i + 1))
                .map_or(Self::All, |c| Self::Only(*c)),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::All => "All",
            Self::Only(category) => category.label(),
        }
    }
}

fn name_matches(name: &str, needle: &str) -> bool {
    needle.is_empty() || name.to_lowercase().contains(needle)
}

/// Entries visible for `query` and `filter`, in inventory order.
///
/// A folder is kept when its own category passes the filter and either its
/// name or one of its apps matches. With a non-empty query a folder matched
/// through its apps keeps only those apps.
pub fn filter_entries(
    entries: &[InventoryEntry],
    query: &str,
    filter: CategoryFilter,
) -> Vec<InventoryEntry> {
    let needle = query.trim().to_lowercase();

    entries
        .iter()
        .filter(|entry| filter.matches(entry.category()))
        .filter_map(|entry| match entry {
            InventoryEntry::App(app) => {
                name_matches(&app.name, &needle).then(|| entry.clone())
            }
            InventoryEntry::Folder(folder) => {
                if name_matches(&folder.name, &needle) {
                    return Some(entry.clone());
                }
                let apps: Vec<_> = folder
                    .apps
                    .iter()
                    .filter(|app| name_matches(&app.name, &needle))
                    .cloned()
                    .collect();
                if apps.is_empty() {
                    return None;
                }
                let mut narrowed = folder.clone();
                narrowed.apps = apps;
                Some(InventoryEntry::Folder(narrowed))
            }
        })
        .collect()
}

pub fn page_size(columns: usize) -> usize {
    columns.max(1) * ROWS_PER_PAGE
}

/// Always at least one page, even when empty.
pub fn page_count(len: usize, columns: usize) -> usize {
    len.div_ceil(page_size(columns)).max(1)
}

pub fn page(entries: &[InventoryEntry], index: usize, columns: usize) -> &[InventoryEntry] {
    let size = page_size(columns);
    let start = index.saturating_mul(size).min(entries.len());
    let end = start.saturating_add(size).min(entries.len());
    &entries[start..end]
}
