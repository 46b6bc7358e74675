//! Client config documents on disk.
//!
//! Documents are edited in place: only the span of the entry being added or
//! removed changes, so comments, indentation and keys this crate does not own
//! survive byte for byte. Backups are byte copies written next to the
//! original with a sortable timestamp suffix.

use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use jsonc_parser::cst::{CstInputValue, CstRootNode};
use jsonc_parser::ParseOptions;
use serde_json::{Map, Value};
use toml_edit::DocumentMut;
use tracing::{debug, info};

use super::error::ClientError;

/// Collision suffixes past this many are treated as a failure.
const MAX_BACKUP_SUFFIX: u32 = 999;

/// On-disk syntax of a client's config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// JSON, read as JSONC (comments and trailing commas tolerated).
    Json,
    Toml,
}

/// A JSON or JSONC document: the source text plus its parsed value.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonDocument {
    text: String,
    value: Value,
}

impl JsonDocument {
    fn empty() -> Self {
        Self {
            text: String::new(),
            value: Value::Object(Map::new()),
        }
    }

    fn parse(text: &str) -> Result<Self, String> {
        if text.trim().is_empty() {
            return Ok(Self::empty());
        }
        let value = jsonc_parser::parse_to_serde_value(text, &ParseOptions::default())
            .map_err(|e| e.to_string())?
            .unwrap_or(Value::Null);
        if !value.is_object() {
            return Err("top level is not a JSON object".into());
        }
        Ok(Self {
            text: text.to_string(),
            value,
        })
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    fn upsert(&mut self, container: &str, alias: &str, entry: Value) -> Result<bool, String> {
        let replaced = self.value.get(container).is_some_and(|v| !v.is_object());

        let text = if self.text.trim().is_empty() {
            // Nothing to preserve: write the canonical layout.
            let mut servers = Map::new();
            servers.insert(alias.to_string(), entry);
            let mut root = Map::new();
            root.insert(container.to_string(), Value::Object(servers));
            let mut text = serde_json::to_string_pretty(&Value::Object(root)).map_err(|e| e.to_string())?;
            text.push('\n');
            text
        } else {
            let root = CstRootNode::parse(&self.text, &ParseOptions::default()).map_err(|e| e.to_string())?;
            let servers = root.object_value_or_set().object_value_or_set(container);
            match servers.get(alias) {
                Some(prop) => prop.set_value(cst_input(&entry)),
                None => {
                    servers.append(alias, cst_input(&entry));
                }
            }
            root.to_string()
        };

        *self = Self::parse(&text)?;
        Ok(replaced)
    }

    fn remove(&mut self, container: &str, alias: &str) -> bool {
        let present = self
            .value
            .get(container)
            .and_then(Value::as_object)
            .is_some_and(|servers| servers.contains_key(alias));
        if !present {
            return false;
        }
        let Ok(root) = CstRootNode::parse(&self.text, &ParseOptions::default()) else {
            return false;
        };
        let Some(prop) = root
            .object_value()
            .and_then(|obj| obj.object_value(container))
            .and_then(|servers| servers.get(alias))
        else {
            return false;
        };
        prop.remove();
        match Self::parse(&root.to_string()) {
            Ok(doc) => {
                *self = doc;
                true
            }
            Err(_) => false,
        }
    }
}

fn cst_input(value: &Value) -> CstInputValue {
    match value {
        Value::Null => CstInputValue::Null,
        Value::Bool(b) => CstInputValue::Bool(*b),
        Value::Number(n) => CstInputValue::Number(n.to_string()),
        Value::String(s) => CstInputValue::String(s.clone()),
        Value::Array(items) => CstInputValue::Array(items.iter().map(cst_input).collect()),
        Value::Object(map) => CstInputValue::Object(map.iter().map(|(k, v)| (k.clone(), cst_input(v))).collect()),
    }
}

fn toml_value(value: &Value) -> Result<toml_edit::Value, String> {
    Ok(match value {
        Value::Null => return Err("TOML cannot represent null".into()),
        Value::Bool(b) => (*b).into(),
        Value::Number(n) => match n.as_i64() {
            Some(i) => i.into(),
            None => n.as_f64().ok_or_else(|| format!("unsupported number {}", n))?.into(),
        },
        Value::String(s) => s.as_str().into(),
        Value::Array(items) => {
            let mut array = toml_edit::Array::new();
            for item in items {
                array.push(toml_value(item)?);
            }
            toml_edit::Value::Array(array)
        }
        Value::Object(map) => {
            let mut table = toml_edit::InlineTable::new();
            for (k, v) in map {
                table.insert(k.as_str(), toml_value(v)?);
            }
            toml_edit::Value::InlineTable(table)
        }
    })
}

/// A server entry as a `[container.alias]` table.
fn toml_entry_table(entry: &Value, leading_blank_line: bool) -> Result<toml_edit::Item, String> {
    let fields = entry.as_object().ok_or("server entry is not an object")?;
    let mut table = toml_edit::Table::new();
    for (k, v) in fields {
        table.insert(k.as_str(), toml_edit::Item::Value(toml_value(v)?));
    }
    if leading_blank_line {
        table.decor_mut().set_prefix("\n");
    }
    Ok(toml_edit::Item::Table(table))
}

/// A parsed client config, held whole so unrelated content is preserved.
#[derive(Debug, Clone)]
pub enum ConfigDocument {
    Json(JsonDocument),
    Toml(DocumentMut),
}

impl ConfigDocument {
    pub fn empty(format: ConfigFormat) -> Self {
        match format {
            ConfigFormat::Json => ConfigDocument::Json(JsonDocument::empty()),
            ConfigFormat::Toml => ConfigDocument::Toml(DocumentMut::new()),
        }
    }

    /// Parse `text`. Blank text is an empty document.
    pub fn parse(format: ConfigFormat, text: &str, path: &Path) -> Result<Self, ClientError> {
        let parse_err = |message: String| ClientError::ConfigParse {
            path: path.to_path_buf(),
            message,
        };
        match format {
            ConfigFormat::Json => JsonDocument::parse(text).map(ConfigDocument::Json).map_err(parse_err),
            ConfigFormat::Toml => text
                .parse::<DocumentMut>()
                .map(ConfigDocument::Toml)
                .map_err(|e| parse_err(e.to_string())),
        }
    }

    pub fn render(&self) -> String {
        match self {
            ConfigDocument::Json(doc) => doc.text.clone(),
            ConfigDocument::Toml(doc) => doc.to_string(),
        }
    }

    /// All `(alias, entry)` pairs under `container`, in file order. Entries are
    /// surfaced as JSON regardless of the file's syntax.
    pub fn entries(&self, container: &str) -> Vec<(String, Value)> {
        match self {
            ConfigDocument::Json(doc) => doc
                .value
                .get(container)
                .and_then(Value::as_object)
                .map(|servers| servers.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
                .unwrap_or_default(),
            ConfigDocument::Toml(doc) => {
                let Some(servers) = doc.get(container).filter(|item| item.is_table_like()) else {
                    return Vec::new();
                };
                // Only the server tables are converted; the rest of the
                // document is never re-rendered.
                let mut wrapper = DocumentMut::new();
                wrapper.insert(container, servers.clone());
                let parsed = match toml::from_str::<toml::Table>(&wrapper.to_string()) {
                    Ok(parsed) => parsed,
                    Err(e) => {
                        debug!("Cannot read `{}` entries: {}", container, e);
                        return Vec::new();
                    }
                };
                parsed
                    .get(container)
                    .and_then(toml::Value::as_table)
                    .map(|servers| {
                        servers
                            .iter()
                            .filter_map(|(k, v)| serde_json::to_value(v).ok().map(|v| (k.clone(), v)))
                            .collect()
                    })
                    .unwrap_or_default()
            }
        }
    }

    pub fn entry(&self, container: &str, alias: &str) -> Option<Value> {
        self.entries(container)
            .into_iter()
            .find_map(|(k, v)| (k == alias).then_some(v))
    }

    /// Insert or replace `alias` under `container`, creating the container.
    ///
    /// Returns `true` when an existing non-table container had to be replaced.
    pub fn upsert(&mut self, container: &str, alias: &str, entry: Value) -> Result<bool, String> {
        match self {
            ConfigDocument::Json(doc) => doc.upsert(container, alias, entry),
            ConfigDocument::Toml(doc) => {
                let has_content = !doc.to_string().trim().is_empty();
                let existing = doc.get(container).map(toml_edit::Item::is_table_like);
                let replaced = existing == Some(false);
                if existing != Some(true) {
                    let mut servers = toml_edit::Table::new();
                    servers.set_implicit(true);
                    doc.insert(container, toml_edit::Item::Table(servers));
                }
                let servers = doc
                    .get_mut(container)
                    .and_then(toml_edit::Item::as_table_like_mut)
                    .ok_or_else(|| format!("`{}` is not a table", container))?;
                servers.insert(alias, toml_entry_table(&entry, has_content)?);
                Ok(replaced)
            }
        }
    }

    /// Remove `alias` from `container`. Returns whether anything was removed.
    pub fn remove(&mut self, container: &str, alias: &str) -> bool {
        match self {
            ConfigDocument::Json(doc) => doc.remove(container, alias),
            ConfigDocument::Toml(doc) => doc
                .get_mut(container)
                .and_then(toml_edit::Item::as_table_like_mut)
                .and_then(|servers| servers.remove(alias))
                .is_some(),
        }
    }
}

/// Pull the endpoint URL out of a server entry.
///
/// Looks at `url`, `serverUrl` and `httpUrl`, then falls back to the first
/// http(s) argument (bridges such as `mcp-remote` take the URL as an arg).
pub fn entry_url(entry: &Value) -> Option<String> {
    for key in ["url", "serverUrl", "httpUrl"] {
        if let Some(url) = entry.get(key).and_then(Value::as_str) {
            return Some(url.to_string());
        }
    }
    entry
        .get("args")
        .and_then(Value::as_array)?
        .iter()
        .filter_map(Value::as_str)
        .find(|arg| arg.starts_with("http://") || arg.starts_with("https://"))
        .map(String::from)
}

/// Read and parse `path`. A missing file is `Ok(None)`.
pub fn read_document(path: &Path, format: ConfigFormat) -> Result<Option<ConfigDocument>, ClientError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ClientError::ReadFailed {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    ConfigDocument::parse(format, &raw, path).map(Some)
}

/// Write `doc` to `path` via a sibling temp file and rename.
pub fn write_document(path: &Path, doc: &ConfigDocument) -> Result<(), ClientError> {
    let write_err = |message: String| ClientError::WriteFailed {
        path: path.to_path_buf(),
        message,
    };
    let parent = path.parent().ok_or_else(|| write_err("invalid file path".into()))?;
    fs::create_dir_all(parent).map_err(|e| write_err(format!("create directory: {}", e)))?;

    let file_name = path
        .file_name()
        .ok_or_else(|| write_err("invalid file path".into()))?
        .to_string_lossy();
    let tmp_path = parent.join(format!("{}.tmp", file_name));

    fs::write(&tmp_path, doc.render()).map_err(|e| write_err(e.to_string()))?;
    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(write_err(format!("rename: {}", e)));
    }
    info!("Wrote {}", path.display());
    Ok(())
}

fn backup_prefix(path: &Path) -> Option<String> {
    path.file_name()
        .map(|name| format!("{}.backup-", name.to_string_lossy()))
}

/// Copy `path` into `backup_dir` under a fresh timestamped name.
///
/// Returns `Ok(None)` when there is nothing to back up (missing or empty
/// file). The backup file is created exclusively, so an earlier backup is
/// never overwritten; a name collision moves on to the next `-NNN` suffix.
pub fn backup_file(path: &Path, backup_dir: &Path) -> Result<Option<PathBuf>, ClientError> {
    let backup_err = |source: io::Error| ClientError::BackupFailed {
        path: path.to_path_buf(),
        source,
    };
    let meta = match fs::metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(backup_err(e)),
    };
    if meta.len() == 0 {
        return Ok(None);
    }

    let prefix = backup_prefix(path)
        .ok_or_else(|| backup_err(io::Error::new(ErrorKind::InvalidInput, "invalid file path")))?;
    fs::create_dir_all(backup_dir).map_err(backup_err)?;

    let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S-%3f").to_string();
    for n in 0..=MAX_BACKUP_SUFFIX {
        let name = if n == 0 {
            format!("{}{}", prefix, stamp)
        } else {
            format!("{}{}-{:03}", prefix, stamp, n)
        };
        let candidate = backup_dir.join(name);
        let mut target = match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(backup_err(e)),
        };
        let copied = File::open(path).and_then(|mut source| io::copy(&mut source, &mut target));
        if let Err(e) = copied {
            drop(target);
            let _ = fs::remove_file(&candidate);
            return Err(backup_err(e));
        }
        info!("Backed up {} to {}", path.display(), candidate.display());
        return Ok(Some(candidate));
    }
    Err(backup_err(io::Error::new(
        ErrorKind::AlreadyExists,
        "too many backups within one millisecond",
    )))
}

/// Backups of `path` found in `backup_dir`, newest first.
pub fn list_backups(path: &Path, backup_dir: &Path) -> Vec<PathBuf> {
    let Some(prefix) = backup_prefix(path) else {
        return Vec::new();
    };
    let Ok(entries) = fs::read_dir(backup_dir) else {
        return Vec::new();
    };
    let mut backups: Vec<PathBuf> = entries
        .flatten()
        .filter(|e| e.file_name().to_string_lossy().starts_with(&prefix))
        .map(|e| e.path())
        .collect();
    backups.sort();
    backups.reverse();
    backups
}
