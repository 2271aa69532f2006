use anyhow::{Context, Result};
use clap::Parser;
use fleetmap_config::{ConfigLoad, ConfigLoader};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,fleetmap_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let ConfigLoad { config, warnings } = {
        let mut loader = ConfigLoader::new();
        if let Some(path) = &cli.config {
            loader = loader.with_config_path(path);
        }
        if let Some(path) = &cli.env_file {
            loader = loader.with_env_file(path);
        }
        loader.load().context("failed to load configuration")?
    };

    if config.metadata.env_file_loaded {
        info!("loaded .env file");
    }
    if let Some(path) = &config.metadata.config_path {
        info!(path = %path.display(), "loaded configuration file");
    }
    for warning in warnings.iter() {
        match &warning.hint {
            Some(hint) => warn!(hint = %hint, "{}", warning.message),
            None => warn!("{}", warning.message),
        }
    }

    match cli.command {
        Command::Watch(args) => cli::watch::run(&config, args).await,
        Command::Couriers(args) => cli::couriers::run(&config, args).await,
    }
}
