//! Small key-value store: one file per key inside a directory.

use anyhow::{Context, Result};
use log::warn;
#[cfg(test)]
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
#[cfg(test)]
use std::sync::Mutex;
use tempfile::NamedTempFile;

pub trait Store: Send + Sync {
    fn get(&self, key: &str) -> Option<Vec<u8>>;
    fn set(&self, key: &str, value: &[u8]) -> Result<()>;
    fn remove(&self, key: &str);
}

pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn key_path(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '_' { c } else { '-' })
            .collect();
        self.dir.join(file_name)
    }
}

impl Store for FileStore {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        fs::read(self.key_path(key)).ok()
    }

    /// Writes to a temp file in the same directory and renames it over the
    /// old value, so readers never observe a partial record.
    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create store dir {}", self.dir.display()))?;
        let mut tmp = NamedTempFile::new_in(&self.dir).context("Failed to create temp file")?;
        tmp.write_all(value).context("Failed to write temp file")?;
        tmp.as_file().sync_all().context("Failed to sync temp file")?;
        tmp.persist(self.key_path(key))
            .with_context(|| format!("Failed to persist key {key}"))?;
        Ok(())
    }

    fn remove(&self, key: &str) {
        let path = self.key_path(key);
        if let Err(err) = fs::remove_file(&path)
            && err.kind() != std::io::ErrorKind::NotFound
        {
            warn!("Failed to remove {}: {err}", path.display());
        }
    }
}

/// In-process store for unit tests.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, Vec<u8>>>,
}

#[cfg(test)]
impl Store for MemoryStore {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        let values = self.values.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        values.get(key).cloned()
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        let mut values = self.values.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        values.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) {
        let mut values = self.values.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        values.remove(key);
    }
}
