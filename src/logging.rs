use crate::constants::LOG_FILE;
use env_logger::{Builder, Env, Target};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

/// Sends log output to `<cache_dir>/launchdeck.log`.
///
/// The terminal UI owns the screen, so stderr is only used as a fallback
/// when `allow_stderr` is set. Otherwise logging stays off if the file
/// cannot be opened.
pub fn init(cache_dir: &Path, verbose: bool, allow_stderr: bool) -> Option<PathBuf> {
    let default_level = if verbose { "debug" } else { "info" };
    let mut builder = Builder::from_env(Env::default().default_filter_or(default_level));

    let path = cache_dir.join(LOG_FILE);
    let file = fs::create_dir_all(cache_dir)
        .and_then(|()| OpenOptions::new().create(true).append(true).open(&path));

    match file {
        Ok(file) => {
            builder.target(Target::Pipe(Box::new(file)));
            builder.try_init().ok().map(|()| path)
        }
        Err(_) if allow_stderr => {
            builder.target(Target::Stderr);
            let _ = builder.try_init();
            None
        }
        Err(_) => None,
    }
}
