//! Revealing directories in the host file manager.

use std::path::Path;
use std::process::Command;

use tracing::info;

/// Hands a directory to the user's file manager.
pub trait DirectoryOpener: Send + Sync {
    fn open(&self, dir: &Path) -> Result<(), String>;
}

/// Launches `open` (macOS), `explorer` (Windows) or `xdg-open` (elsewhere).
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemOpener;

impl DirectoryOpener for SystemOpener {
    fn open(&self, dir: &Path) -> Result<(), String> {
        let program = if cfg!(target_os = "macos") {
            "open"
        } else if cfg!(target_os = "windows") {
            "explorer"
        } else {
            "xdg-open"
        };
        info!("Opening {} with {}", dir.display(), program);
        // Detached: the file manager outlives this call.
        Command::new(program)
            .arg(dir)
            .spawn()
            .map(|_| ())
            .map_err(|e| format!("Failed to launch {}: {}", program, e))
    }
}
