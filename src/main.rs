//! Datalayer cache command-line entrypoint.

mod cli;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use mimalloc::MiMalloc;
use tracing_subscriber::EnvFilter;

use datalayer::{ChangeFeed, Config, DataLayerCache};

use crate::cli::{Cli, Commands};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut config = Config::from_env()?;
    if let Some(root) = cli.root {
        config.storage_root = Some(root);
    }
    if let Some(url) = cli.rpc_url {
        config.remote.endpoint = url;
    }
    if let Some(ms) = cli.timeout_ms {
        config.remote.timeout = Duration::from_millis(ms);
    }

    let feed = Arc::new(ChangeFeed::default());
    let cache = DataLayerCache::connect(&config, feed)?;

    tracing::debug!(
        endpoint = %config.remote.endpoint,
        cache_dir = %cache.cache_directory()?.display(),
        "Cache ready"
    );

    match cli.command {
        Commands::Get { store, key } => {
            let lookup = cache.lookup_value(&store, &key).await?;
            tracing::info!(store = %store, key = %key, source = %lookup.source(), "Lookup complete");
            println!("{}", serde_json::to_string_pretty(lookup.value().as_ref())?);
        }
        Commands::Keys { store } => {
            let lookup = cache.lookup_keys(&store).await?;
            tracing::info!(store = %store, source = %lookup.source(), "Lookup complete");
            for key in lookup.value().keys() {
                println!("{}", key);
            }
        }
        Commands::Invalidate { store, key } => {
            let result = cache.invalidate(&store, key.as_deref()).await?;
            println!(
                "memory_removed={} disk_removed={}",
                result.memory_removed, result.disk_removed
            );
        }
        Commands::Clear => {
            let result = cache.invalidate_all().await;
            println!("disk_removed={}", result.disk_removed);
        }
        Commands::Path => {
            println!("{}", cache.cache_directory()?.display());
        }
        Commands::Stores => {
            for store in cache.disk().store_ids().await? {
                println!("{}", store);
            }
        }
    }

    let flushed = cache.flush_write_backs().await;
    let stats = cache.stats();
    tracing::debug!(
        flushed,
        write_back_failures = stats.write_back_failures,
        "Write-backs flushed"
    );

    Ok(())
}
