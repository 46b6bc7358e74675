//! Command-line front end for MCP More.
//!
//! Every subcommand maps onto one boundary command and prints its
//! `IpcResponse` as JSON on stdout. Logs go to stderr and the rolling log file.
//!
//! Environment variables:
//! - `MCP_MORE_CONFIG`: path to the settings file (defaults to the platform config dir)
//! - `RUST_LOG`: log filter override

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::{json, Value};

use mcp_more_lib::clients::ClientManager;
use mcp_more_lib::commands::{self, clients::SetupArgs, IpcResponse};
use mcp_more_lib::config::{self, FileSettings};
use mcp_more_lib::services::logger;

#[derive(Parser)]
#[command(name = "mcp-more", version, about = "Register the local MCP More server with AI clients")]
struct Cli {
    /// Settings file to read the server port and default alias from.
    #[arg(long, global = true, env = "MCP_MORE_CONFIG")]
    config: Option<PathBuf>,

    /// Mirror debug logs to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List every supported client.
    Apps,
    /// Detect one client, or all of them.
    Detect { id: Option<String> },
    /// List installed clients.
    Installed {
        #[arg(long)]
        limit: Option<i64>,
    },
    /// Register the local server with a client.
    Setup {
        id: String,
        #[arg(long)]
        alias: Option<String>,
        #[arg(long)]
        profile: Option<String>,
        /// Use this URL instead of the one derived from the settings.
        #[arg(long)]
        url: Option<String>,
    },
    /// Remove a server entry from a client.
    Remove { id: String, alias: String },
    /// Check whether an alias points at the local server.
    Check { id: String, alias: String },
    /// List local-server entries in a client's config.
    Servers { id: String },
    /// Back up a client's config file.
    Backup { id: String },
    /// List backups of a client's config file.
    Backups { id: String },
    /// Reveal a client's config directory.
    Open { id: String },
    /// Check that an alias points at a given URL.
    Verify { id: String, alias: String, url: String },
    /// Show the settings, optionally changing the server port.
    Settings {
        #[arg(long)]
        port: Option<u16>,
    },
    /// Run a boundary command by name with JSON arguments.
    Invoke { command: String, args: Option<String> },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logger::init(cli.verbose) {
        logger::init_console_only(cli.verbose);
        tracing::warn!("File logging unavailable: {}", e);
    }

    let settings = match cli.config {
        Some(path) => FileSettings::new(path),
        None => FileSettings::default_location(),
    };
    tracing::debug!(settings = %settings.path().display(), "Using settings file");

    let response = match cli.command {
        Command::Settings { port } => settings_command(&settings, port),
        command => {
            let manager = ClientManager::new(Arc::new(settings));
            run(&manager, command).await
        }
    };

    print_response(&response);
    if response.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

async fn run(manager: &ClientManager, command: Command) -> IpcResponse {
    use commands::clients as cmd;

    match command {
        Command::Apps => cmd::get_supported_apps(manager),
        Command::Detect { id: Some(id) } => cmd::detect_app(manager, &id).await,
        Command::Detect { id: None } => cmd::detect_all_apps(manager).await,
        Command::Installed { limit } => cmd::get_installed_apps(manager, limit).await,
        Command::Setup { id, alias, profile, url } => {
            let args = SetupArgs {
                alias,
                profile_id: profile,
                server_url: url,
            };
            cmd::setup_app(manager, &id, args).await
        }
        Command::Remove { id, alias } => cmd::remove_app_server(manager, &id, &alias).await,
        Command::Check { id, alias } => cmd::is_app_configured(manager, &id, &alias).await,
        Command::Servers { id } => cmd::get_app_configured_servers(manager, &id).await,
        Command::Backup { id } => cmd::backup_app_config(manager, &id).await,
        Command::Backups { id } => cmd::list_app_backups(manager, &id).await,
        Command::Open { id } => cmd::open_config_directory(manager, &id).await,
        Command::Verify { id, alias, url } => cmd::verify_app(manager, &id, &alias, &url).await,
        Command::Invoke { command, args } => {
            let args = match args.as_deref().map(serde_json::from_str::<Value>) {
                None => Value::Null,
                Some(Ok(v)) => v,
                Some(Err(e)) => return IpcResponse::err(format!("Arguments are not valid JSON: {}", e)),
            };
            cmd::dispatch(manager, &command, args).await
        }
        Command::Settings { .. } => IpcResponse::err("settings is handled before dispatch"),
    }
}

fn settings_command(settings: &FileSettings, port: Option<u16>) -> IpcResponse {
    use config::SettingsSource;

    let mut cfg = settings.current();
    if let Some(port) = port {
        cfg.server.port_number = port;
        if let Err(e) = config::save_config(settings.path(), &cfg) {
            return IpcResponse::err(e);
        }
        tracing::info!(port, "Server port updated");
    }
    IpcResponse::ok(json!({
        "path": settings.path(),
        "settings": cfg,
    }))
}

fn print_response(response: &IpcResponse) {
    match serde_json::to_string_pretty(response) {
        Ok(out) => println!("{}", out),
        Err(e) => eprintln!("Failed to render response: {}", e),
    }
}
