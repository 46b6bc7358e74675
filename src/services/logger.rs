use std::fs;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use super::platform;

/// Initialize the structured logging system.
///
/// Sets up:
/// - File output: rolling log files in `{data_dir}/mcp-more/logs/mcp-more.log`
///   with daily rotation, keeping the latest 5 files.
/// - Console output (stderr): compact format. Warnings only unless `verbose`,
///   since stdout carries the JSON results.
/// - Environment filter: defaults to `info` (`debug` when `verbose`),
///   configurable via `RUST_LOG`.
///
/// Returns an error if a subscriber is already installed or the log
/// directory cannot be used.
pub fn init(verbose: bool) -> Result<(), String> {
    let log_dir = platform::get_log_dir();

    fs::create_dir_all(&log_dir)
        .map_err(|e| format!("Failed to create log directory {}: {}", log_dir.display(), e))?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("mcp-more")
        .filename_suffix("log")
        .max_log_files(5)
        .build(&log_dir)
        .map_err(|e| format!("Failed to create log file appender: {}", e))?;

    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true);

    let console_level = if verbose { LevelFilter::DEBUG } else { LevelFilter::WARN };
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .with_filter(console_level);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|e| format!("Logger already initialized: {}", e))?;

    tracing::info!(
        log_dir = %log_dir.display(),
        "Logger initialized"
    );
    Ok(())
}

/// Stderr-only logging, used when the log directory is unavailable.
pub fn init_console_only(verbose: bool) {
    let directives = if verbose { default_directives(true) } else { "warn" };
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives)),
        )
        .try_init();
}

/// Global filter used when `RUST_LOG` is unset. It must admit debug events
/// when `verbose`, or the console layer never sees them.
fn default_directives(verbose: bool) -> &'static str {
    // which/regex internals are noise at debug level.
    if verbose {
        "debug,which=warn,regex=warn"
    } else {
        "info,which=warn,regex=warn"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_filter_admits_debug() {
        let verbose = EnvFilter::new(default_directives(true));
        assert_eq!(verbose.max_level_hint(), Some(LevelFilter::DEBUG));

        let quiet = EnvFilter::new(default_directives(false));
        assert_eq!(quiet.max_level_hint(), Some(LevelFilter::INFO));
    }
}
