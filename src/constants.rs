use std::time::Duration;

pub const SYSTEM_APPLICATIONS: &str = "/System/Applications";
pub const APPLICATIONS: &str = "/Applications";
pub const USER_APPLICATIONS_DIR: &str = "Applications";
pub const USERS_DIR: &str = "/Users";

pub const BUNDLE_SUFFIX: &str = ".app";
pub const INFO_PLIST: &str = "Contents/Info.plist";
pub const BUNDLE_RESOURCES: &str = "Contents/Resources";
pub const LOCALIZED_STRINGS: &str = "InfoPlist.strings";
pub const PREFERRED_LPROJ: [&str; 3] = ["en.lproj", "English.lproj", "Base.lproj"];

pub const APP_DIR_NAME: &str = "launchdeck";
pub const SETTINGS_FILE: &str = "settings.txt";
pub const LOG_FILE: &str = "launchdeck.log";
pub const STORE_DIR: &str = "store";

pub const INVENTORY_KEY: &str = "inventory.v2";
pub const INVENTORY_STORED_AT_KEY: &str = "inventory.v2.stored_at";
pub const LEGACY_INVENTORY_KEY: &str = "CachedInstalledApps";
pub const LEGACY_STORED_AT_KEY: &str = "CacheExpirationDate";
pub const WALLPAPER_FINGERPRINT_KEY: &str = "wallpaper.fingerprint.v1";

pub const CACHE_EXPIRATION: Duration = Duration::from_secs(3600);

pub const ICON_CACHE_DIR: &str = "icons";
pub const ICON_MEMORY_ENTRIES: usize = 256;
pub const ICON_MEMORY_BYTES: u64 = 64 * 1024 * 1024;

pub const WALLPAPER_CACHE_DIR: &str = "wallpaper";
pub const WALLPAPER_CACHE_FILE: &str = "wallpaper_cache.png";
pub const WALLPAPER_MEMORY_ENTRIES: usize = 2;
pub const WALLPAPER_MEMORY_BYTES: u64 = 64 * 1024 * 1024;
pub const WALLPAPER_MAX_WIDTH: u32 = 1920;
pub const WALLPAPER_MAX_HEIGHT: u32 = 1080;

pub const DEFAULT_COLUMNS: usize = 8;
pub const ROWS_PER_PAGE: usize = 6;

#[cfg(target_os = "macos")]
pub const OPENER: &str = "/usr/bin/open";
#[cfg(not(target_os = "macos"))]
pub const OPENER: &str = "xdg-open";
