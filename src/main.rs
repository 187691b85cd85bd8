mod cli;

use std::time::Duration;

use clap::Parser;
use cli::{CacheCommand, Cli, Commands};
use stockbridge::cache::FjallCache;
use stockbridge::config::Config;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Commands::Server(args) => stockbridge::api::run(config, args.address).await?,
        Commands::Cache(command) => {
            let cache = FjallCache::open(&config.bridge.cache_path)?;
            match command {
                CacheCommand::Stats => {
                    let stats = cache.stats()?;
                    println!("entries:      {}", stats.entries);
                    println!("stored bytes: {}", stats.stored_bytes);
                    match stats.last_prune {
                        Some(at) => println!("last prune:   {}", at.to_rfc3339()),
                        None => println!("last prune:   never"),
                    }
                }
                CacheCommand::Prune { older_than_secs } => {
                    let stats = cache.prune(Duration::from_secs(older_than_secs))?;
                    println!(
                        "scanned {}, removed {} expired and {} corrupt entries",
                        stats.scanned, stats.expired, stats.corrupt
                    );
                }
            }
        }
    }

    Ok(())
}
