use crate::constants::{APP_DIR_NAME, DEFAULT_COLUMNS, SETTINGS_FILE};
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Path prefixes the user chose to keep out of the inventory.
#[derive(Debug, Clone, Default)]
pub struct HiddenList {
    rules: Vec<String>,
}

impl HiddenList {
    pub fn new(rules: Vec<String>) -> Self {
        Self { rules }
    }

    /// The path itself or anything inside it. Compares whole components,
    /// so `/Applications/Games` does not hide `/Applications/GamesPro.app`.
    pub fn is_hidden(&self, path: &Path) -> bool {
        self.rules
            .iter()
            .any(|rule| path.starts_with(Path::new(rule)))
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub wallpaper: Option<PathBuf>,
    pub columns: usize,
    pub hidden: HiddenList,
    pub extra_roots: Vec<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            wallpaper: None,
            columns: DEFAULT_COLUMNS,
            hidden: HiddenList::default(),
            extra_roots: Vec::new(),
        }
    }
}

impl Settings {
    /// Loads `settings.txt` from the user config directory.
    /// Returns defaults if the file doesn't exist or errors.
    pub fn load() -> Self {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR_NAME).join(SETTINGS_FILE))
            .filter(|path| path.exists())
            .map_or_else(Self::default, |path| Self::load_from(&path))
    }

    pub fn load_from(path: &Path) -> Self {
        let mut settings = Self::default();
        let Ok(file) = fs::File::open(path) else {
            return settings;
        };

        let mut hidden = Vec::new();
        for line in BufReader::new(file).lines().map_while(Result::ok) {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let Some((key, value)) = trimmed.split_once('=') else {
                continue;
            };
            let value = value.trim();
            if value.is_empty() {
                continue;
            }

            match key.trim() {
                "wallpaper" => settings.wallpaper = Some(expand_home(value)),
                "columns" => {
                    if let Ok(columns) = value.parse::<usize>()
                        && columns > 0
                    {
                        settings.columns = columns;
                    }
                }
                "hide" => hidden.push(expand_home(value).to_string_lossy().to_string()),
                "root" => settings.extra_roots.push(expand_home(value)),
                _ => {}
            }
        }

        settings.hidden = HiddenList::new(hidden);
        settings
    }
}

fn expand_home(value: &str) -> PathBuf {
    if let Some(rest) = value.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(value)
}

/// `~/Library/Caches/launchdeck` on macOS.
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir().map_or_else(
        || {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".cache").join(APP_DIR_NAME)
        },
        |dir| dir.join(APP_DIR_NAME),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::tempdir;

    #[test]
    fn test_is_hidden() {
        let hidden = HiddenList::new(vec![
            "/Applications/Games".to_string(),
            "/Applications/Chess.app".to_string(),
        ]);

        assert!(hidden.is_hidden(Path::new("/Applications/Games")));
        assert!(hidden.is_hidden(Path::new("/Applications/Games/Doom.app")));
        assert!(hidden.is_hidden(Path::new("/Applications/Chess.app")));

        assert!(!hidden.is_hidden(Path::new("/Applications/Safari.app")));
        assert!(!hidden.is_hidden(Path::new("/System/Applications/Chess.app")));
        assert!(!hidden.is_hidden(Path::new("/Applications/GamesPro.app")));
        assert!(!hidden.is_hidden(Path::new("/Applications/Chess.app.bak")));
    }

    #[test]
    fn parses_settings_file() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join(SETTINGS_FILE);
        fs::write(
            &path,
            "# launchdeck settings\n\
             wallpaper = /Library/Desktop Pictures/Sonoma.heic\n\
             columns = 6\n\
             hide = /Applications/Games\n\
             hide = /Applications/Chess.app\n\
             root = /opt/Applications\n\
             unknown = ignored\n\
             broken line\n",
        )?;

        let settings = Settings::load_from(&path);
        assert_eq!(
            settings.wallpaper,
            Some(PathBuf::from("/Library/Desktop Pictures/Sonoma.heic"))
        );
        assert_eq!(settings.columns, 6);
        assert!(settings.hidden.is_hidden(Path::new("/Applications/Games/Doom.app")));
        assert_eq!(settings.extra_roots, [PathBuf::from("/opt/Applications")]);
        Ok(())
    }

    #[test]
    fn invalid_columns_keep_default() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join(SETTINGS_FILE);
        fs::write(&path, "columns = 0\n")?;
        assert_eq!(Settings::load_from(&path).columns, DEFAULT_COLUMNS);

        fs::write(&path, "columns = many\n")?;
        assert_eq!(Settings::load_from(&path).columns, DEFAULT_COLUMNS);
        Ok(())
    }

    #[test]
    fn missing_file_gives_defaults() {
        let settings = Settings::load_from(Path::new("/path/to/nowhere/settings.txt"));
        assert!(settings.wallpaper.is_none());
        assert_eq!(settings.columns, DEFAULT_COLUMNS);
        assert!(settings.extra_roots.is_empty());
    }
}
