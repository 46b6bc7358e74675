//! Host probing for installed client applications.
//!
//! A client counts as installed when one of its marker paths exists or its
//! executable is found on the search path. Version numbers come from
//! `<exe> --version`, bounded by [`VERSION_PROBE_TIMEOUT`].

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;
use regex::Regex;

use super::error::ClientError;
use super::types::{ClientDescriptor, DetectionResult, StepLog};

/// Upper bound for a single `--version` subprocess.
pub const VERSION_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

static VERSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+\.\d+(?:\.\d+)?").expect("version regex is valid"));

/// Host directories the detectors derive their paths from.
#[derive(Debug, Clone)]
pub struct HostLayout {
    /// The user's home directory.
    pub home: PathBuf,
    /// Per-user config directory (`~/Library/Application Support`, `%APPDATA%`, `~/.config`).
    pub config_dir: PathBuf,
    /// Where application bundles / install directories live.
    pub app_dirs: Vec<PathBuf>,
    /// Executable search path; `None` uses the process `PATH`.
    pub search_path: Option<OsString>,
    /// Where backups are written; `None` means next to the config file.
    pub backup_dir: Option<PathBuf>,
}

impl HostLayout {
    /// Layout of the running host.
    pub fn from_host() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        let config_dir = dirs::config_dir().unwrap_or_else(|| home.join(".config"));

        let mut app_dirs = Vec::new();
        if cfg!(target_os = "macos") {
            app_dirs.push(PathBuf::from("/Applications"));
            app_dirs.push(home.join("Applications"));
        } else if cfg!(target_os = "windows") {
            if let Some(local) = dirs::data_local_dir() {
                app_dirs.push(local.join("Programs"));
                app_dirs.push(local);
            }
        } else {
            app_dirs.push(PathBuf::from("/opt"));
            app_dirs.push(PathBuf::from("/usr/share"));
        }

        Self {
            home,
            config_dir,
            app_dirs,
            search_path: std::env::var_os("PATH"),
            backup_dir: None,
        }
    }

    /// A self-contained layout below `base`: `home/`, `config/`, `apps/`, `bin/`.
    pub fn rooted(base: &Path) -> Self {
        Self {
            home: base.join("home"),
            config_dir: base.join("config"),
            app_dirs: vec![base.join("apps")],
            search_path: Some(base.join("bin").into_os_string()),
            backup_dir: None,
        }
    }

    /// Resolve `name` against the search path.
    pub fn find_executable(&self, name: &str) -> Option<PathBuf> {
        match &self.search_path {
            Some(paths) => which::which_in(name, Some(paths), &self.home).ok(),
            None => which::which(name).ok(),
        }
    }

    /// Candidate install locations named `names` inside every app dir.
    pub fn app_markers(&self, names: &[&str]) -> Vec<PathBuf> {
        self.app_dirs
            .iter()
            .flat_map(|dir| names.iter().map(move |n| dir.join(n)))
            .collect()
    }
}

/// What a detector looks for.
#[derive(Debug, Clone, Default)]
pub struct ProbeTargets {
    pub markers: Vec<PathBuf>,
    pub executable: Option<&'static str>,
}

/// Probe the host for one client.
///
/// Never fails for "not installed"; `error` is set only when a probe hit an
/// unexpected failure and nothing else proved the client present.
pub fn probe(
    descriptor: &ClientDescriptor,
    layout: &HostLayout,
    targets: &ProbeTargets,
    config_path: Option<PathBuf>,
) -> DetectionResult {
    let mut log = StepLog::new(&descriptor.id);
    let mut installed = false;
    let mut failure: Option<String> = None;

    for marker in &targets.markers {
        match marker.try_exists() {
            Ok(true) => {
                log.path_step("Found", marker);
                installed = true;
            }
            Ok(false) => log.path_step("Not present", marker),
            Err(e) => {
                let msg = format!("Cannot inspect {}: {}", marker.display(), e);
                log.warn(msg.clone());
                failure.get_or_insert(msg);
            }
        }
    }

    let mut version = None;
    if let Some(exe) = targets.executable {
        match layout.find_executable(exe) {
            Some(path) => {
                log.path_step(&format!("Found `{}` executable", exe), &path);
                installed = true;
                match probe_version(&path, VERSION_PROBE_TIMEOUT) {
                    Ok(Some(v)) => {
                        log.step(format!("Version {}", v));
                        version = Some(v);
                    }
                    Ok(None) => log.step("Version could not be determined"),
                    Err(e) => log.warn(e.to_string()),
                }
            }
            None => log.step(format!("`{}` is not on the search path", exe)),
        }
    }

    match &config_path {
        Some(path) => log.path_step("Config file", path),
        None => log.step("Config directory not found"),
    }
    log.step(if installed { "Installed" } else { "Not installed" });

    DetectionResult {
        id: descriptor.id.clone(),
        display_name: descriptor.display_name.clone(),
        installed,
        version,
        config_path,
        error: if installed { None } else { failure },
        logs: log.into_lines(),
    }
}

/// Run `<exe> --version` and extract the version number.
///
/// Kills the child and returns [`ClientError::Timeout`] past `timeout`.
pub fn probe_version(exe: &Path, timeout: Duration) -> Result<Option<String>, ClientError> {
    // npm shims on Windows are .cmd files that need the shell.
    let is_exe = exe
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("exe"));
    let mut command = if cfg!(target_os = "windows") && !is_exe {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(exe);
        c
    } else {
        Command::new(exe)
    };
    let mut child = match command
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
    {
        Ok(child) => child,
        Err(_) => return Ok(None),
    };

    let started = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(_)) => break,
            Ok(None) if started.elapsed() >= timeout => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(ClientError::Timeout(format!("`{} --version`", exe.display())));
            }
            Ok(None) => std::thread::sleep(Duration::from_millis(20)),
            Err(_) => return Ok(None),
        }
    }

    let output = match child.wait_with_output() {
        Ok(output) => output,
        Err(_) => return Ok(None),
    };
    // Some tools print their version on stderr.
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    Ok(parse_version(&stdout).or_else(|| parse_version(&stderr)))
}

/// First dotted version number on the first non-empty line.
pub fn parse_version(raw: &str) -> Option<String> {
    let line = raw.lines().map(str::trim).find(|l| !l.is_empty())?;
    VERSION_RE.find(line).map(|m| m.as_str().to_string())
}
