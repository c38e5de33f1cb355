mod cli;
mod config;
mod cost;
mod error;
mod maps;
mod server;
mod tools;
mod traffic;
mod types;

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;

use cli::{Cli, Command};
use config::AppConfig;
use maps::google::GoogleDirectionsClient;
use maps::RouteService;
use tools::{create_default_router, ToolRouter};

fn setup_logging(level: &str) {
    // stdout carries the protocol, so logs always go to stderr
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .target(env_logger::Target::Stderr)
        .init();
}

/// Build the tool router on top of the Google Maps client.
fn create_router(config: &AppConfig, api_key: String) -> Result<ToolRouter> {
    let client = GoogleDirectionsClient::new(api_key, &config.google_maps, &config.routing.units)?;
    let service = Arc::new(RouteService::new(Arc::new(client), config.routing.clone()));
    Ok(create_default_router(service, config.costs.clone()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(&cli.log_level);

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => AppConfig::config_path()?,
    };

    match cli.command.unwrap_or(Command::Serve) {
        Command::InitConfig { force } => {
            if config_path.exists() && !force {
                bail!(
                    "Config file already exists: {} (use --force to overwrite)",
                    config_path.display()
                );
            }
            AppConfig::save_default(&config_path)?;
            println!("[Config] Created default config: {}", config_path.display());
            println!("[Config] Edit it to set google_maps.api_key.");
            Ok(())
        }
        Command::ListTools => {
            let config = AppConfig::load(&config_path)?;
            // The catalog is static; no provider call is made, so no key is needed.
            let router = create_router(&config, String::new())?;
            let catalog = serde_json::to_string_pretty(&router.definitions())
                .context("Failed to serialize tool catalog")?;
            println!("{}", catalog);
            Ok(())
        }
        Command::Serve => {
            info!("[Config] Loading {}", config_path.display());
            let config = AppConfig::load(&config_path)?;
            let api_key = config.api_key()?;
            info!(
                "[Config] API: {}, traffic model: {}, units: {}",
                config.google_maps.api_base,
                config.routing.default_traffic_model,
                config.routing.units
            );

            let router = create_router(&config, api_key)?;
            info!("[Server] {} tools registered", router.len());
            server::run_stdio(Arc::new(router)).await
        }
    }
}
