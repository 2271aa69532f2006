use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use fleetmap_config::Config;
use fleetmap_core::normalize::Normalizer;
use fleetmap_core::pocketbase::{PocketBaseClient, PocketBaseFiles};

pub mod couriers;
pub mod watch;

#[derive(Debug, Parser)]
#[command(
    name = "fleetmapctl",
    version,
    about = "Live courier map engine for the operations dashboard"
)]
pub struct Cli {
    /// TOML configuration file (default: fleetmap.toml or config/fleetmap.toml)
    #[arg(long, global = true, env = "FLEETMAP_CONFIG")]
    pub config: Option<PathBuf>,

    /// .env file to read before the environment
    #[arg(long, global = true)]
    pub env_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Follow the courier map live and log every update until Ctrl-C
    Watch(WatchArgs),
    /// List couriers once and exit
    Couriers(CouriersArgs),
}

#[derive(Debug, Clone, Args)]
pub struct StoreArgs {
    /// PocketBase base URL, overriding the configuration
    #[arg(long, value_name = "URL")]
    pub store_url: Option<String>,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    #[command(flatten)]
    pub store: StoreArgs,
}

#[derive(Debug, Args)]
pub struct CouriersArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Print one JSON object per courier instead of a table
    #[arg(long)]
    pub json: bool,

    /// Only couriers with a known position, as the side list shows them
    #[arg(long)]
    pub located: bool,
}

impl StoreArgs {
    pub fn client(&self, config: &Config) -> Result<PocketBaseClient> {
        let base_url = match &self.store_url {
            Some(url) => url.clone(),
            None => config.store.base_url.to_string(),
        };
        let client =
            PocketBaseClient::new(&base_url, config.store.collection.clone())
                .with_context(|| format!("cannot use store at {base_url}"))?
                .with_request_timeout(config.store.request_timeout)
                .context("failed to build HTTP client")?
                .with_realtime(config.realtime_settings());
        Ok(client)
    }
}

/// Normalizer resolving avatars against the client's file endpoint.
pub fn normalizer(config: &Config, client: &PocketBaseClient) -> Normalizer {
    let files = PocketBaseFiles::new(client.base_url().clone());
    config.configure_normalizer(Normalizer::new().with_resolver(Arc::new(files)))
}
