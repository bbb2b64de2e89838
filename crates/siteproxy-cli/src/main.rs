//! siteproxy CLI
//!
//! Lists configured sites, picks the best one, and queries a running daemon.

mod commands;

use anyhow::Context;
use clap::{Parser, Subcommand};
use siteproxy_core::{expand_tilde, ProxyConfig};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// siteproxy - pick the least loaded code-review site
#[derive(Parser, Debug)]
#[command(name = "siteproxy")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Config file (default $HOME/.siteproxy/siteproxy.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List all configured sites
    List {
        /// Print a table including the SSH endpoint
        #[arg(short, long)]
        wide: bool,
    },

    /// Probe all sites and print the best one
    Query {
        /// Write the result to a file (.json or .txt)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print every field of the chosen site
        #[arg(short, long)]
        wide: bool,
    },

    /// Show the status table of a running daemon
    Sites {
        /// Daemon API address
        #[arg(long, default_value = "http://localhost:9090")]
        api: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    match cli.command {
        Commands::List { wide } => {
            let config = load_config(cli.config)?;
            commands::list(&config, wide)?;
        }
        Commands::Query { output, wide } => {
            let config = load_config(cli.config)?;
            let output = output.map(|p| expand_tilde(&p));
            commands::query(&config, output.as_deref(), wide).await?;
        }
        Commands::Sites { api } => {
            let client = commands::ApiClient::new(&api);
            commands::sites(&client).await?;
        }
    }

    Ok(())
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<ProxyConfig> {
    ProxyConfig::load_or_init(path.as_deref()).context("failed to load configuration")
}
