//! Mower Agent - Entry Point
//!
//! Polls the Automower Connect cloud API, mirrors the state of the mowers
//! linked to an application key and relays commands to them.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info};

use mower_agent::app::options::AppOptions;
use mower_agent::app::run::run;
use mower_agent::authn::token_mngr::Credentials;
use mower_agent::filesys::file::JsonFile;
use mower_agent::logs::{init_logging, LogLevel, LogOptions};
use mower_agent::sink::MemorySink;
use mower_agent::storage::mower_config::{home_zone, MowerConfig};
use mower_agent::storage::settings::{parse_minutes, Settings};
use mower_agent::utils::version_info;

const DEFAULT_SETTINGS_FILE: &str = "/etc/mower-agent/settings.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut cli_args: HashMap<String, String> = HashMap::new();

    for arg in args.iter().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    // Print version and exit
    let version = version_info();
    if cli_args.contains_key("version") {
        println!("{}", serde_json::to_string_pretty(&version)?);
        return Ok(());
    }

    // Retrieve the settings file
    let settings_path = cli_args
        .get("settings")
        .cloned()
        .unwrap_or_else(|| DEFAULT_SETTINGS_FILE.to_string());
    let loaded = JsonFile::new(&settings_path)
        .load::<Settings>()
        .await
        .with_context(|| format!("Unable to read settings file {}", settings_path))?;
    let settings_found = loaded.is_some();
    let mut settings = loaded.unwrap_or_default();
    apply_cli_overrides(&mut settings, &cli_args)?;

    // Initialize logging
    let log_options = LogOptions {
        log_level: settings.log_level.clone(),
        log_dir: settings.log_dir.as_ref().map(PathBuf::from),
        json_format: settings.log_json,
        ..Default::default()
    };
    let _log_guard = match init_logging(log_options) {
        Ok(guard) => guard,
        Err(e) => {
            println!("Failed to initialize logging: {e}");
            None
        }
    };

    if !settings_found {
        info!("Settings file {} not found, using defaults and command line", settings_path);
    }
    settings.validate().context("Invalid settings")?;

    // Zones and cutting height range
    let home = settings
        .home
        .as_ref()
        .map(|home| home_zone(&home.name, home.location()));
    let config = MowerConfig::load(&settings.config_file, home).await;

    let credentials = Credentials::new(settings.client_id.clone(), settings.client_secret.clone());
    let options = AppOptions::from_settings(&settings);

    info!(
        "Running mower agent {} ({}) with options: {:?}",
        version.version, version.git_hash, options
    );
    let sink = Arc::new(MemorySink::new());
    let result = run(options, credentials, sink, &config, await_shutdown_signal()).await;
    if let Err(e) = &result {
        error!("Failed to run the agent: {e}");
    }
    result.context("Mower agent stopped with an error")
}

fn apply_cli_overrides(settings: &mut Settings, cli_args: &HashMap<String, String>) -> anyhow::Result<()> {
    if let Some(client_id) = cli_args.get("client_id") {
        settings.client_id = client_id.clone();
    }
    if let Some(client_secret) = cli_args.get("client_secret") {
        settings.client_secret = client_secret.clone();
    }
    if let Some(interval) = cli_args.get("interval") {
        settings.update_interval_minutes = parse_minutes(interval)?;
    }
    if let Some(level) = cli_args.get("log_level") {
        settings.log_level = level.parse::<LogLevel>().map_err(anyhow::Error::msg)?;
    }
    Ok(())
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = sigterm.recv() => {
                        info!("SIGTERM received, shutting down...");
                    }
                    _ = tokio::signal::ctrl_c() => {
                        info!("Ctrl+C received, shutting down...");
                    }
                }
            }
            Err(e) => {
                error!("Unable to listen for SIGTERM: {}", e);
                let _ = tokio::signal::ctrl_c().await;
                info!("Ctrl+C received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Unable to listen for Ctrl+C: {}", e);
        }
        info!("Ctrl+C received, shutting down...");
    }
}
