mod bundle;
mod cache;
mod categorizer;
mod config;
mod constants;
mod filter;
mod image_cache;
mod launcher;
mod logging;
mod manager;
mod model;
mod scanner;
mod store;
mod ui;

use anyhow::{Result, bail};
use cache::InventoryCache;
use clap::Parser;
use config::{Settings, default_cache_dir};
use constants::STORE_DIR;
use crossterm::{
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use filter::{CategoryFilter, filter_entries};
use humansize::{BINARY, format_size};
use image_cache::icons::IconCache;
use image_cache::wallpaper::WallpaperCache;
use indicatif::{ProgressBar, ProgressStyle};
use launcher::SystemOpener;
use log::{info, warn};
use manager::InventoryManager;
use model::{Category, InventoryEntry};
use ratatui::prelude::*;
use scanner::{FilesystemScanner, Scanner, default_roots};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use store::FileStore;
use ui::app::App;

#[derive(Parser)]
#[command(version, about, long_about = None, disable_version_flag = true)]
struct Cli {
    /// Print version information
    #[arg(short = 'v', long = "version", action = clap::ArgAction::Version)]
    version: Option<bool>,

    /// Print the inventory and exit
    #[arg(long)]
    list: bool,

    /// Drop the cached inventory and rescan
    #[arg(long)]
    force: bool,

    /// Only list entries in this category (with --list)
    #[arg(long)]
    category: Option<String>,

    /// Only list entries matching this text (with --list)
    #[arg(long)]
    search: Option<String>,

    /// Wallpaper image to cache, overrides settings
    #[arg(long)]
    wallpaper: Option<PathBuf>,

    /// Directory for the inventory store, image caches and log
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Debug logging
    #[arg(long)]
    verbose: bool,
}

/// Ticks a spinner for every bundle read during `--list` scans.
struct SpinnerScanner {
    inner: FilesystemScanner,
    spinner: ProgressBar,
}

impl Scanner for SpinnerScanner {
    fn scan(&self) -> Vec<InventoryEntry> {
        let tick = || self.spinner.inc(1);
        self.inner.scan_with_progress(Some(&tick))
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let cache_dir = cli.cache_dir.clone().unwrap_or_else(default_cache_dir);
    if let Some(path) = logging::init(&cache_dir, cli.verbose, cli.list) {
        info!("Logging to {}", path.display());
    }

    let settings = Settings::load();
    let store = Arc::new(FileStore::new(cache_dir.join(STORE_DIR)));
    let scanner = FilesystemScanner::new(
        default_roots(&settings.extra_roots),
        settings.hidden.clone(),
    );
    let wallpaper = cli.wallpaper.clone().or_else(|| settings.wallpaper.clone());
    let wallpapers = WallpaperCache::new(&cache_dir, store.clone());

    if cli.list {
        return run_list(&cli, scanner, store, wallpaper.as_deref(), &wallpapers);
    }

    if let Some(source) = wallpaper {
        thread::spawn(move || match wallpapers.load(&source) {
            Ok(image) => info!("Wallpaper ready ({} bytes)", image.cost()),
            Err(err) => warn!("Wallpaper unavailable: {err:#}"),
        });
    }

    let manager = Arc::new(InventoryManager::new(
        Arc::new(scanner),
        InventoryCache::new(store),
        Arc::new(SystemOpener::default()),
    ));
    if cli.force {
        manager.force_refresh();
    } else {
        manager.start();
    }
    let icons = Arc::new(IconCache::new(&cache_dir));

    enable_raw_mode()?;
    let mut stderr = io::stderr();
    execute!(stderr, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stderr);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(manager, icons, settings.columns);
    let res = ui::run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{err:?}");
    }

    Ok(())
}

fn run_list(
    cli: &Cli,
    scanner: FilesystemScanner,
    store: Arc<FileStore>,
    wallpaper: Option<&std::path::Path>,
    wallpapers: &WallpaperCache,
) -> Result<()> {
    let filter = match &cli.category {
        Some(label) => match Category::from_label(label) {
            Some(category) => CategoryFilter::Only(category),
            None => bail!("Unknown category: {label}"),
        },
        None => CategoryFilter::All,
    };

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
            .template("{spinner} Scanning applications... {pos} bundles [{elapsed}]")?,
    );
    spinner.enable_steady_tick(Duration::from_millis(100));

    let manager = InventoryManager::new(
        Arc::new(SpinnerScanner {
            inner: scanner,
            spinner: spinner.clone(),
        }),
        InventoryCache::new(store),
        Arc::new(SystemOpener::default()),
    );
    if cli.force {
        manager.force_refresh();
    } else {
        manager.start();
    }
    manager.wait_idle();
    spinner.finish_and_clear();

    let inventory = manager.current_inventory();
    let entries = filter_entries(&inventory, cli.search.as_deref().unwrap_or(""), filter);
    for entry in &entries {
        match entry {
            InventoryEntry::App(app) => println!("{}  [{}]", app.name, app.category.label()),
            InventoryEntry::Folder(folder) => {
                println!("{}/  [{}]", folder.name, folder.category.label());
                for app in &folder.apps {
                    println!("    {}  [{}]", app.name, app.category.label());
                }
            }
        }
    }

    if let Some(source) = wallpaper {
        match wallpapers.load(source) {
            Ok(image) => println!(
                "wallpaper: {} ({})",
                source.display(),
                format_size(image.cost(), BINARY)
            ),
            Err(err) => eprintln!("wallpaper: {err:#}"),
        }
    }

    Ok(())
}
