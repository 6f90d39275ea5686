//! HTTP surface and startup wiring for the configuration recommender

pub mod api;
pub mod config;

use recommender_lib::{
    health::{components, HealthRegistry},
    predictor::{BundleLocator, Predictor},
    RecommendationCache, RecommendationService, StructuredLogger,
};
use std::sync::Arc;

/// Load the model bundle and build the recommendation service
///
/// A missing or broken bundle does not stop the service: it starts without a
/// model, reports the model component unhealthy and answers every
/// recommendation request with a model error.
pub async fn build_service(
    config: &config::ServiceConfig,
    health_registry: &HealthRegistry,
    logger: &StructuredLogger,
) -> RecommendationService {
    let mut locator = BundleLocator::new(&config.bundle_root);
    if let Some(path) = &config.bundle_path {
        locator = locator.with_explicit_path(path);
    }

    let cache = RecommendationCache::new();
    health_registry.register(components::MODEL).await;
    health_registry
        .set_degraded(components::CACHE, "No recommendation yet")
        .await;

    match locator.load() {
        Ok(loaded) => {
            let version = loaded.predictor.model_version().to_string();
            logger.log_bundle_loaded(
                &loaded.path.display().to_string(),
                &version,
                loaded.legacy_location,
            );
            RecommendationService::new(Arc::new(loaded.predictor), cache, logger.clone())
        }
        Err(err) => {
            let reason = format!("{err:#}");
            logger.log_bundle_unavailable(&reason);
            health_registry
                .set_unhealthy(components::MODEL, reason.clone())
                .await;
            RecommendationService::without_model(reason, cache, logger.clone())
        }
    }
}
