use crate::constants::OPENER;
use anyhow::{Context, Result};
use log::{debug, warn};
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;

pub trait Launcher: Send + Sync {
    /// Asks the OS to start `path` and returns without waiting for it.
    fn open(&self, path: &Path) -> Result<()>;
}

/// Hands paths to the platform opener (`open` on macOS).
pub struct SystemOpener {
    program: String,
}

impl SystemOpener {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for SystemOpener {
    fn default() -> Self {
        Self::new(OPENER)
    }
}

impl Launcher for SystemOpener {
    fn open(&self, path: &Path) -> Result<()> {
        let mut child = Command::new(&self.program)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("Failed to start {} {}", self.program, path.display()))?;

        let path = path.to_path_buf();
        thread::spawn(move || match child.wait() {
            Ok(status) if status.success() => debug!("Opened {}", path.display()),
            Ok(status) => warn!("Opener exited with {status} for {}", path.display()),
            Err(err) => warn!("Failed to wait for opener of {}: {err}", path.display()),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_opener_is_an_error() {
        let opener = SystemOpener::new("/path/to/no/such/opener_12345");
        let err = opener.open(Path::new("/Applications/Safari.app")).unwrap_err();
        assert!(err.to_string().contains("Failed to start"));
    }

    #[cfg(unix)]
    #[test]
    fn returns_without_waiting_for_the_child() {
        let opener = SystemOpener::new("true");
        assert!(opener.open(Path::new("/tmp")).is_ok());
    }
}
