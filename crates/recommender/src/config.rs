//! Service configuration

use anyhow::{Context, Result};
use config::builder::DefaultState;
use config::ConfigBuilder;
use serde::Deserialize;
use std::path::PathBuf;

/// Optional config file, looked up in the working directory
const CONFIG_FILE: &str = "recommender";

/// Environment variable prefix, e.g. `RECOMMENDER_API_PORT`
const ENV_PREFIX: &str = "RECOMMENDER";

/// Service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Name attached to every structured log event
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// HTTP port for prediction, health and metrics endpoints
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Directory searched for `models/model_bundle.json`
    #[serde(default = "default_bundle_root")]
    pub bundle_root: PathBuf,

    /// Explicit bundle manifest path, skips the search when set
    #[serde(default)]
    pub bundle_path: Option<PathBuf>,
}

fn default_service_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "config-recommender".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_bundle_root() -> PathBuf {
    PathBuf::from(".")
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            api_port: default_api_port(),
            bundle_root: default_bundle_root(),
            bundle_path: None,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from `recommender.toml` (optional) and environment
    pub fn load() -> Result<Self> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name(CONFIG_FILE).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true));
        Self::from_builder(builder)
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        builder
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")
    }
}
