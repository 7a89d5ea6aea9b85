mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use cli::Commands;
use objstore_config::Config;
use objstore_engine::ObjectStore;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing; stdout is reserved for object bytes
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = cli::Cli::parse();
    let config = load_config(&cli)?;

    // Open storage once (creates directories and runs migrations). Only the
    // long-running server and `recover` repair leftovers from earlier runs.
    let (store, recovery) = match cli.command {
        Commands::Serve { .. } | Commands::Recover => {
            ObjectStore::open_with_recovery(&config.storage_directory, &config.database_path).await?
        }
        _ => (
            ObjectStore::open(&config.storage_directory, &config.database_path).await?,
            None,
        ),
    };
    let store = Arc::new(store);

    let result = commands::run(cli.command, store.clone(), recovery, &config).await;
    store.close().await;
    result
}

fn load_config(cli: &cli::Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    if let Some(dir) = &cli.storage_dir {
        config.storage_directory = dir.clone();
    }
    if let Some(db) = &cli.database {
        config.database_path = db.clone();
    }

    config.validate()?;
    Ok(config)
}
