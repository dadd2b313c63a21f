use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use aicurate_node::api;
use aicurate_node::config::NodeConfig;
use aicurate_node::logging;
use aicurate_node::node::AicurateNode;

#[derive(Parser)]
#[command(name = "aicurate")]
#[command(about = "AICurate reward service - proof points, badges and CUR8 issuance", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbosity level (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the reward service
    Start {
        /// Port for the HTTP API
        #[arg(long)]
        api_port: Option<u16>,
    },
    /// Write a default configuration file
    Init {
        /// Output path
        #[arg(short, long, default_value = "aicurate.toml")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    match cli.command {
        Commands::Init { output } => {
            let config = NodeConfig::default();
            config
                .save_to_file(&output)
                .with_context(|| format!("Failed to write config to {}", output.display()))?;
            info!("⚙️ Default configuration written to {}", output.display());
            Ok(())
        }
        Commands::Start { api_port } => {
            let mut config = match &cli.config {
                Some(path) => NodeConfig::from_file(path)
                    .with_context(|| format!("Failed to load config from {}", path.display()))?,
                None => NodeConfig::default(),
            };
            config.apply_env_overrides();
            if let Some(port) = api_port {
                config.api.port = port;
            }

            let node = AicurateNode::new(&config).await?;
            api::serve(node, &config.api).await
        }
    }
}
