//! # docmesh
//!
//! CLI tool for exercising docmesh transports.
//!
//! ## Commands
//!
//! - `demo`: Start several peers on one broadcast channel and report what
//!   each of them sees
//!
//! ## Example
//!
//! ```bash
//! # Three peers on the default channel
//! docmesh demo
//!
//! # Five peers on a named channel, with debug logs
//! docmesh --log-level debug demo --peers 5 --channel notes
//!
//! # Peer settings from a file
//! docmesh demo --config docmesh.toml --payload "hello"
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mesh_network::Config;
use std::path::PathBuf;
use std::time::Duration;

mod commands;
mod logging;
mod synchronizer;

use commands::demo::{self, DemoOptions};
use logging::{init_logging, LogFormat};

/// CLI tool for exercising docmesh transports.
#[derive(Parser, Debug)]
#[command(name = "docmesh")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Log level when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Human)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run several in-process peers and show the handshake and traffic
    Demo {
        /// Number of peers to start
        #[arg(long, default_value = "3")]
        peers: usize,

        /// Channel name (overrides the config file)
        #[arg(long)]
        channel: Option<String>,

        /// TOML config file with channel and peer settings
        #[arg(long)]
        config: Option<PathBuf>,

        /// Payload each peer sends to every peer it discovers
        #[arg(long, default_value = "hello from docmesh")]
        payload: String,

        /// Milliseconds to wait between demo phases
        #[arg(long, default_value = "200")]
        settle_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_format, &cli.log_level)?;

    match cli.command {
        Commands::Demo {
            peers,
            channel,
            config,
            payload,
            settle_ms,
        } => {
            let mut config = match config {
                Some(path) => Config::from_file(&path).context("Failed to load config")?,
                None => Config::default(),
            };
            if let Some(name) = channel {
                config.channel = config.channel.with_channel_name(&name);
            }

            demo::run(DemoOptions {
                peers,
                config,
                payload,
                settle: Duration::from_millis(settle_ms),
            })
            .await?;
        }
    }

    Ok(())
}
