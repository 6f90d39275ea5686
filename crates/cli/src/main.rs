//! Configuration recommender CLI
//!
//! A command-line tool for submitting telemetry, reading the latest
//! recommendation, checking service health, and inspecting model bundles.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{bundle, predict, status};
use std::path::PathBuf;

/// Configuration recommender CLI
#[derive(Parser)]
#[command(name = "recctl")]
#[command(author, version, about = "CLI for the configuration recommender", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via RECCTL_API_URL env var)
    #[arg(long, env = "RECCTL_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short, global = true)]
    pub format: Option<output::OutputFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Submit telemetry for an instance and get a recommendation
    Predict {
        /// Instance identifier
        #[arg(long, short)]
        instance_id: String,

        /// Telemetry field as KEY=VALUE (repeatable)
        #[arg(long = "metric", short = 'm', value_name = "KEY=VALUE")]
        metrics: Vec<String>,

        /// JSON file holding a telemetry object
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Show the most recent recommendation
    Last,

    /// Show service health
    Status,

    /// Inspect a model bundle offline
    #[command(subcommand)]
    Bundle(BundleCommands),
}

#[derive(Subcommand)]
pub enum BundleCommands {
    /// List the features the bundle expects, in order
    Features {
        #[command(flatten)]
        location: BundleArgs,
    },

    /// Show the raw feature vector built from telemetry
    Normalize {
        #[command(flatten)]
        location: BundleArgs,

        /// Telemetry field as KEY=VALUE (repeatable)
        #[arg(long = "metric", short = 'm', value_name = "KEY=VALUE")]
        metrics: Vec<String>,

        /// JSON file holding a telemetry object
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

#[derive(clap::Args)]
pub struct BundleArgs {
    /// Directory searched for the bundle
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Bundle manifest path, skipping the search
    #[arg(long)]
    pub path: Option<PathBuf>,
}

impl BundleArgs {
    fn into_source(self, config: &config::Config) -> bundle::BundleSource {
        bundle::BundleSource {
            root: self
                .root
                .or_else(|| config.bundle_root.clone())
                .unwrap_or_else(|| PathBuf::from(".")),
            path: self.path,
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        output::print_error(&format!("{:#}", err));
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = config::Config::load()?;

    let format = cli
        .format
        .or_else(|| {
            config
                .default_format
                .as_deref()
                .and_then(output::OutputFormat::parse_name)
        })
        .unwrap_or_default();

    match cli.command {
        Commands::Predict {
            instance_id,
            metrics,
            file,
        } => {
            let client = client::ApiClient::new(&config.resolve_api_url(cli.api_url.as_deref()))?;
            predict::predict(&client, &instance_id, &metrics, file.as_deref(), format).await?;
        }
        Commands::Last => {
            let client = client::ApiClient::new(&config.resolve_api_url(cli.api_url.as_deref()))?;
            predict::last(&client, format).await?;
        }
        Commands::Status => {
            let client = client::ApiClient::new(&config.resolve_api_url(cli.api_url.as_deref()))?;
            status::show_status(&client, format).await?;
        }
        Commands::Bundle(bundle_cmd) => match bundle_cmd {
            BundleCommands::Features { location } => {
                bundle::show_features(&location.into_source(&config), format)?;
            }
            BundleCommands::Normalize {
                location,
                metrics,
                file,
            } => {
                bundle::normalize(&location.into_source(&config), &metrics, file.as_deref(), format)?;
            }
        },
    }

    Ok(())
}
