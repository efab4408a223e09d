use log::warn;
use std::fs;
use std::path::{Path, PathBuf};

/// Names starting with `.` or `~` never take part in a scan.
pub fn is_hidden_name(name: &str) -> bool {
    name.starts_with('.') || name.starts_with('~')
}

/// Lists the visible entries directly inside `dir`.
/// An unlistable directory contributes nothing.
pub fn list_visible_entries(dir: &Path) -> Vec<PathBuf> {
    let read_dir = match fs::read_dir(dir) {
        Ok(read_dir) => read_dir,
        Err(err) => {
            warn!("Cannot list {}: {err}", dir.display());
            return vec![];
        }
    };

    let mut entries: Vec<PathBuf> = read_dir
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!("Cannot read entry in {}: {err}", dir.display());
                None
            }
        })
        .filter(|entry| !is_hidden_name(&entry.file_name().to_string_lossy()))
        .map(|entry| entry.path())
        .collect();

    entries.sort();
    entries
}

pub fn file_name_string(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default()
}
