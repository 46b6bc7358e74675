//! Application settings.
//!
//! Settings are read from disk on every call through [`SettingsSource`]: the
//! server port can change while the app runs, and every URL this crate writes
//! or recognizes depends on it.

pub mod schema;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

pub use schema::AppConfig;

use crate::services::platform;

/// Supplies the live application settings.
pub trait SettingsSource: Send + Sync {
    fn current(&self) -> AppConfig;
}

/// Settings backed by a JSON file, re-read on each call.
#[derive(Debug, Clone)]
pub struct FileSettings {
    path: PathBuf,
}

impl FileSettings {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `config.json` in the platform config directory.
    pub fn default_location() -> Self {
        Self::new(config_file_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsSource for FileSettings {
    fn current(&self) -> AppConfig {
        load_config(&self.path)
    }
}

/// Fixed settings, for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticSettings(pub AppConfig);

impl StaticSettings {
    pub fn with_port(port: u16) -> Self {
        let mut cfg = AppConfig::default();
        cfg.server.port_number = port;
        Self(cfg)
    }
}

impl SettingsSource for StaticSettings {
    fn current(&self) -> AppConfig {
        self.0.clone()
    }
}

/// Default location of the settings file.
pub fn config_file_path() -> PathBuf {
    platform::get_config_dir().join("config.json")
}

/// Load settings, falling back to defaults when the file is missing or bad.
pub fn load_config(path: &Path) -> AppConfig {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            debug!("No settings at {} ({}), using defaults", path.display(), e);
            return AppConfig::default();
        }
    };
    match serde_json::from_str(&raw) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("Ignoring corrupt settings file {}: {}", path.display(), e);
            AppConfig::default()
        }
    }
}

/// Persist settings via a temp file and rename.
pub fn save_config(path: &Path, cfg: &AppConfig) -> Result<(), String> {
    let parent = path.parent().ok_or("Invalid settings path")?;
    fs::create_dir_all(parent).map_err(|e| format!("Failed to create settings directory: {}", e))?;

    let json = serde_json::to_string_pretty(cfg).map_err(|e| format!("Serialize error: {}", e))?;
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, json).map_err(|e| format!("Write error: {}", e))?;
    fs::rename(&tmp_path, path).map_err(|e| format!("Rename error: {}", e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config(&dir.path().join("config.json"));
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn test_corrupt_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{{{").unwrap();
        assert_eq!(load_config(&path), AppConfig::default());
    }

    #[test]
    fn test_file_settings_are_never_cached() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let settings = FileSettings::new(&path);

        let mut cfg = AppConfig::default();
        cfg.server.port_number = 8001;
        save_config(&path, &cfg).unwrap();
        assert_eq!(settings.current().server.port_number, 8001);

        cfg.server.port_number = 8002;
        save_config(&path, &cfg).unwrap();
        assert_eq!(settings.current().server.port_number, 8002);
    }

    #[test]
    fn test_static_settings_port() {
        assert_eq!(StaticSettings::with_port(9000).current().server.port_number, 9000);
    }
}
