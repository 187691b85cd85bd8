use clap::{Parser, Subcommand};
use std::net::SocketAddr;

#[derive(Parser, Debug)]
#[command(name = "stockbridge")]
#[command(about = "Stock-photo API bridge with uploads and image transforms", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP server
    Server(ServerArgs),

    /// Inspect or prune the shared response cache
    #[command(subcommand)]
    Cache(CacheCommand),
}

#[derive(clap::Args, Debug)]
pub struct ServerArgs {
    /// Address to bind the HTTP server to (defaults to server.bind_addr)
    #[arg(long)]
    pub address: Option<SocketAddr>,
}

#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// Print entry count, stored bytes and last prune time
    Stats,

    /// Delete cached responses older than the given age
    Prune {
        #[arg(long, default_value_t = 86_400)]
        older_than_secs: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_server_address() {
        let cli = Cli::try_parse_from(["stockbridge", "server", "--address", "127.0.0.1:9100"]).unwrap();
        match cli.command {
            Commands::Server(args) => {
                assert_eq!(args.address, Some("127.0.0.1:9100".parse().unwrap()))
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_cache_prune() {
        let cli =
            Cli::try_parse_from(["stockbridge", "cache", "prune", "--older-than-secs", "60"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Cache(CacheCommand::Prune { older_than_secs: 60 })
        ));
    }
}
