//! Configuration recommender service
//!
//! Serves configuration recommendations from a pre-trained model bundle
//! and exposes the latest one for the dashboard status view.

use anyhow::Result;
use config_recommender::{api, build_service, config::ServiceConfig};
use recommender_lib::{health::HealthRegistry, StructuredLogger};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting config-recommender");

    let config = ServiceConfig::load()?;
    info!(
        service_name = %config.service_name,
        bundle_root = ?config.bundle_root,
        "Service configured"
    );

    let health_registry = HealthRegistry::new();
    let logger = StructuredLogger::new(&config.service_name);

    let service = build_service(&config, &health_registry, &logger).await;
    logger.log_startup(SERVICE_VERSION, service.model_version().unwrap_or("none"));

    let app_state = Arc::new(api::AppState::new(Arc::new(service), health_registry.clone()));

    // Mark ready after initialization; readiness still tracks the model component
    health_registry.set_ready(true).await;

    tokio::select! {
        result = api::serve(config.api_port, app_state) => {
            result?;
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            logger.log_shutdown("SIGINT received");
            info!("Shutting down");
        }
    }

    Ok(())
}
