//! Client configuration management.
//!
//! One [`ClientDetector`] per supported AI client application knows where that
//! client keeps its MCP config and what an entry for this server looks like.
//! The shared operations (backup, merge, verify, listing) are provided methods
//! on the trait, so a detector only describes paths and entry shape.
//!
//! The client's config file is the only source of truth: nothing here caches
//! file content between calls.

pub mod claude_code;
pub mod claude_desktop;
pub mod codex;
pub mod config_file;
pub mod cursor;
pub mod detection;
pub mod error;
pub mod manager;
pub mod server_url;
pub mod types;
pub mod vscode;
pub mod windsurf;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

pub use config_file::{ConfigDocument, ConfigFormat};
pub use detection::HostLayout;
pub use error::ClientError;
pub use manager::ClientManager;
pub use types::{ClientDescriptor, ConfiguredServerEntry, DetectionResult, SetupRequest, SetupResult, StepLog};

/// Configuration-management contract for one client application.
///
/// Implementations are `Send + Sync` so the manager can probe them from
/// blocking worker threads.
pub trait ClientDetector: Send + Sync {
    fn descriptor(&self) -> &ClientDescriptor;

    /// Host directories this detector resolves paths against.
    fn layout(&self) -> &HostLayout;

    /// The client's config file, or `None` when the client's config
    /// directory does not exist.
    fn config_path(&self) -> Option<PathBuf>;

    /// Probe the host. Never fails for "not installed".
    fn detect(&self) -> DetectionResult;

    /// The entry registered for `url`.
    fn server_entry(&self, url: &str) -> Value;

    /// Whether the client must be restarted to pick up config changes.
    fn needs_restart(&self) -> bool;

    fn format(&self) -> ConfigFormat {
        ConfigFormat::Json
    }

    /// Top-level key holding the alias -> server mapping.
    fn servers_key(&self) -> &'static str {
        "mcpServers"
    }

    fn backup_dir(&self) -> Option<PathBuf> {
        if let Some(dir) = &self.layout().backup_dir {
            return Some(dir.clone());
        }
        self.config_path()?.parent().map(Path::to_path_buf)
    }

    /// Parse the config file. `Ok(None)` when it does not exist.
    fn read_config(&self) -> Result<Option<ConfigDocument>, ClientError> {
        match self.config_path() {
            Some(path) => config_file::read_document(&path, self.format()),
            None => Ok(None),
        }
    }

    /// Write a whole document back. Callers mutate a loaded document so
    /// unrelated keys survive.
    fn write_config(&self, doc: &ConfigDocument) -> Result<(), ClientError> {
        let path = self
            .config_path()
            .ok_or_else(|| ClientError::NoConfigPath(self.descriptor().id.clone()))?;
        config_file::write_document(&path, doc)
    }

    /// Copy the current config aside. `Ok(None)` when there is nothing to copy.
    fn backup_config(&self) -> Result<Option<PathBuf>, ClientError> {
        let (Some(path), Some(dir)) = (self.config_path(), self.backup_dir()) else {
            return Ok(None);
        };
        config_file::backup_file(&path, &dir)
    }

    /// Backups of the config file, newest first.
    fn list_backups(&self) -> Vec<PathBuf> {
        match (self.config_path(), self.backup_dir()) {
            (Some(path), Some(dir)) => config_file::list_backups(&path, &dir),
            _ => Vec::new(),
        }
    }

    /// Register `request.alias` in the client's config.
    ///
    /// Backs up an existing file before touching it and re-reads the result
    /// to verify. Re-running with the same request converges on the same
    /// content.
    fn setup(&self, request: &SetupRequest) -> SetupResult {
        let desc = self.descriptor();
        let mut log = StepLog::new(&desc.id);
        let mut result = SetupResult {
            id: desc.id.clone(),
            needs_restart: Some(self.needs_restart()),
            ..Default::default()
        };

        if let Err(e) = server_url::validate_request(request) {
            return fail(result, log, e);
        }
        let url = match server_url::target_url(request) {
            Ok(url) => url,
            Err(e) => return fail(result, log, e),
        };
        log.step(format!("Registering '{}' -> {} in {}", request.alias, url, desc.display_name));

        let Some(path) = self.config_path() else {
            return fail(result, log, ClientError::NoConfigPath(desc.display_name.clone()));
        };
        log.path_step("Config file", &path);
        result.config_path = Some(path.clone());

        if let Some(parent) = path.parent().filter(|p| !p.exists()) {
            if let Err(e) = std::fs::create_dir_all(parent) {
                let err = ClientError::WriteFailed {
                    path: parent.to_path_buf(),
                    message: format!("create directory: {}", e),
                };
                return fail(result, log, err);
            }
            log.path_step("Created directory", parent);
        }

        match self.backup_config() {
            Ok(Some(backup)) => {
                log.path_step("Backed up existing config to", &backup);
                result.backup_path = Some(backup);
            }
            Ok(None) => log.step("No existing config to back up"),
            Err(e) => {
                log.step("Aborting before any write");
                return fail(result, log, e);
            }
        }

        let mut doc = match self.read_config() {
            Ok(Some(doc)) => {
                log.step("Loaded existing config");
                doc
            }
            Ok(None) => {
                log.step("Starting from an empty config");
                ConfigDocument::empty(self.format())
            }
            Err(e) => {
                log.step("Existing config left untouched");
                return fail(result, log, e);
            }
        };

        let key = self.servers_key();
        match doc.upsert(key, &request.alias, self.server_entry(&url)) {
            Ok(true) => log.warn(format!("`{}` was not a mapping and has been replaced", key)),
            Ok(false) => {}
            Err(message) => return fail(result, log, ClientError::WriteFailed { path, message }),
        }
        log.step(format!("Merged '{}' into `{}`", request.alias, key));

        if let Err(e) = self.write_config(&doc) {
            if let Some(backup) = &result.backup_path {
                log.path_step("Original content is preserved in", backup);
            }
            return fail(result, log, e);
        }
        log.step("Wrote config");

        if !self.verify(&request.alias, &url) {
            let err = ClientError::VerifyFailed {
                alias: request.alias.clone(),
                url,
            };
            return fail(result, log, err);
        }
        log.step("Verified entry");

        result.success = true;
        result.message = if self.needs_restart() {
            format!("{} is configured. Restart {} to load '{}'.", desc.display_name, desc.display_name, request.alias)
        } else {
            format!("{} is configured with '{}'.", desc.display_name, request.alias)
        };
        result.logs = log.into_lines();
        result
    }

    /// Unregister `alias`, with the same backup rules as [`setup`](Self::setup).
    fn remove_server(&self, alias: &str) -> SetupResult {
        let desc = self.descriptor();
        let mut log = StepLog::new(&desc.id);
        let mut result = SetupResult {
            id: desc.id.clone(),
            needs_restart: Some(self.needs_restart()),
            ..Default::default()
        };

        let Some(path) = self.config_path() else {
            return fail(result, log, ClientError::NoConfigPath(desc.display_name.clone()));
        };
        result.config_path = Some(path.clone());

        let mut doc = match self.read_config() {
            Ok(Some(doc)) => doc,
            Ok(None) => return nothing_to_remove(result, log, alias),
            Err(e) => return fail(result, log, e),
        };
        if doc.entry(self.servers_key(), alias).is_none() {
            return nothing_to_remove(result, log, alias);
        }

        match self.backup_config() {
            Ok(Some(backup)) => {
                log.path_step("Backed up existing config to", &backup);
                result.backup_path = Some(backup);
            }
            Ok(None) => {}
            Err(e) => {
                log.step("Aborting before any write");
                return fail(result, log, e);
            }
        }

        doc.remove(self.servers_key(), alias);
        if let Err(e) = self.write_config(&doc) {
            return fail(result, log, e);
        }
        log.step(format!("Removed '{}'", alias));

        match self.read_config() {
            Ok(Some(doc)) if doc.entry(self.servers_key(), alias).is_some() => {
                let err = ClientError::VerifyFailed {
                    alias: alias.to_string(),
                    url: "<removed>".into(),
                };
                return fail(result, log, err);
            }
            Err(e) => return fail(result, log, e),
            _ => {}
        }

        result.success = true;
        result.message = format!("Removed '{}' from {}.", alias, desc.display_name);
        result.logs = log.into_lines();
        result
    }

    /// Whether `alias` currently resolves to `url` on disk.
    fn verify(&self, alias: &str, url: &str) -> bool {
        match self.read_config() {
            Ok(Some(doc)) => doc
                .entry(self.servers_key(), alias)
                .and_then(|entry| config_file::entry_url(&entry))
                .is_some_and(|found| server_url::same_url(&found, url)),
            Ok(None) => false,
            Err(e) => {
                warn!(client = %self.descriptor().id, "verify: {}", e);
                false
            }
        }
    }

    /// Whether `alias` points at this server on `port`. Read-only.
    fn is_configured(&self, alias: &str, port: u16) -> bool {
        match self.read_config() {
            Ok(Some(doc)) => doc
                .entry(self.servers_key(), alias)
                .and_then(|entry| config_file::entry_url(&entry))
                .is_some_and(|url| server_url::is_local_server_url(&url, port)),
            Ok(None) => false,
            Err(e) => {
                warn!(client = %self.descriptor().id, "is_configured: {}", e);
                false
            }
        }
    }

    /// Every entry pointing at this server on `port`, in file order. Read-only.
    fn configured_servers(&self, port: u16) -> Vec<ConfiguredServerEntry> {
        let doc = match self.read_config() {
            Ok(Some(doc)) => doc,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!(client = %self.descriptor().id, "configured_servers: {}", e);
                return Vec::new();
            }
        };
        doc.entries(self.servers_key())
            .into_iter()
            .filter_map(|(alias, entry)| {
                let url = config_file::entry_url(&entry)?;
                server_url::is_local_server_url(&url, port).then_some(ConfiguredServerEntry { alias, url })
            })
            .collect()
    }
}

fn fail(mut result: SetupResult, mut log: StepLog, err: ClientError) -> SetupResult {
    log.warn(err.to_string());
    result.success = false;
    result.message = format!("Setup failed: {}", err);
    result.error = Some(err.to_string());
    result.logs = log.into_lines();
    result
}

fn nothing_to_remove(mut result: SetupResult, mut log: StepLog, alias: &str) -> SetupResult {
    log.step(format!("'{}' is not registered; nothing to remove", alias));
    result.success = true;
    result.message = format!("'{}' was not registered.", alias);
    result.logs = log.into_lines();
    result
}

/// `root/relative` when `root` exists as a directory.
pub(crate) fn config_under(root: &Path, relative: &str) -> Option<PathBuf> {
    root.is_dir().then(|| root.join(relative))
}

/// Every supported client, resolved against `layout`.
pub fn default_detectors(layout: &HostLayout) -> Vec<Arc<dyn ClientDetector>> {
    vec![
        Arc::new(claude_desktop::ClaudeDesktop::new(layout.clone())),
        Arc::new(claude_code::ClaudeCode::new(layout.clone())),
        Arc::new(cursor::Cursor::new(layout.clone())),
        Arc::new(vscode::VsCode::new(layout.clone())),
        Arc::new(windsurf::Windsurf::new(layout.clone())),
        Arc::new(codex::Codex::new(layout.clone())),
    ]
}
