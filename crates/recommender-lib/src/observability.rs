//! Observability infrastructure for the recommender
//!
//! Provides:
//! - Prometheus metrics (inference latency, outcomes, degraded features, model version)
//! - Structured JSON logging with tracing

use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter, register_int_gauge, GaugeVec,
    Histogram, IntCounter, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<RecommenderMetricsInner> = OnceLock::new();

/// Inner metrics structure that holds the actual Prometheus metrics
struct RecommenderMetricsInner {
    inference_latency_seconds: Histogram,
    recommendations_generated: IntCounter,
    validation_errors: IntCounter,
    model_errors: IntCounter,
    slow_inferences: IntCounter,
    defaulted_features: IntCounter,
    model_version_info: GaugeVec,
    cache_populated: IntGauge,
}

impl RecommenderMetricsInner {
    fn new() -> Self {
        Self {
            inference_latency_seconds: register_histogram!(
                "recommender_inference_latency_seconds",
                "Time spent normalizing telemetry and running the model",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register inference_latency_seconds"),

            recommendations_generated: register_int_counter!(
                "recommender_recommendations_generated_total",
                "Total number of recommendations generated"
            )
            .expect("Failed to register recommendations_generated"),

            validation_errors: register_int_counter!(
                "recommender_validation_errors_total",
                "Total number of requests rejected for missing fields"
            )
            .expect("Failed to register validation_errors"),

            model_errors: register_int_counter!(
                "recommender_model_errors_total",
                "Total number of failed model invocations"
            )
            .expect("Failed to register model_errors"),

            slow_inferences: register_int_counter!(
                "recommender_slow_inferences_total",
                "Total number of model invocations over the latency target"
            )
            .expect("Failed to register slow_inferences"),

            defaulted_features: register_int_counter!(
                "recommender_defaulted_features_total",
                "Total number of features that fell back to their default value"
            )
            .expect("Failed to register defaulted_features"),

            model_version_info: register_gauge_vec!(
                "recommender_model_version_info",
                "Information about the currently loaded model bundle",
                &["version"]
            )
            .expect("Failed to register model_version_info"),

            cache_populated: register_int_gauge!(
                "recommender_cache_populated",
                "Whether a last recommendation is available (1) or not (0)"
            )
            .expect("Failed to register cache_populated"),
        }
    }
}

/// Recommender metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct RecommenderMetrics {
    _private: (),
}

impl Default for RecommenderMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl RecommenderMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(RecommenderMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &RecommenderMetricsInner {
        GLOBAL_METRICS.get_or_init(RecommenderMetricsInner::new)
    }

    pub fn observe_inference_latency(&self, duration_secs: f64) {
        self.inner().inference_latency_seconds.observe(duration_secs);
    }

    pub fn inc_recommendations_generated(&self) {
        self.inner().recommendations_generated.inc();
    }

    pub fn inc_validation_errors(&self) {
        self.inner().validation_errors.inc();
    }

    pub fn inc_model_errors(&self) {
        self.inner().model_errors.inc();
    }

    pub fn inc_slow_inferences(&self) {
        self.inner().slow_inferences.inc();
    }

    pub fn add_defaulted_features(&self, count: usize) {
        self.inner().defaulted_features.inc_by(count as u64);
    }

    /// Update model version info
    pub fn set_model_version(&self, version: &str) {
        // Reset previous version
        self.inner().model_version_info.reset();
        self.inner()
            .model_version_info
            .with_label_values(&[version])
            .set(1.0);
    }

    pub fn set_cache_populated(&self, populated: bool) {
        self.inner().cache_populated.set(i64::from(populated));
    }
}

/// Structured logger for recommender events
///
/// Provides consistent JSON-formatted logging for recommendations,
/// rejected requests, and lifecycle events.
#[derive(Clone)]
pub struct StructuredLogger {
    service_name: String,
}

impl StructuredLogger {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    /// Log a generated recommendation
    pub fn log_recommendation(
        &self,
        instance_id: &str,
        compute_class: &str,
        storage_class: &str,
        scaling_action: &str,
        defaulted_features: &[String],
        model_version: &str,
    ) {
        info!(
            event = "recommendation_generated",
            service = %self.service_name,
            instance_id = %instance_id,
            recommended_ec2 = %compute_class,
            recommended_storage = %storage_class,
            recommended_scaling_action = %scaling_action,
            defaulted_features = ?defaulted_features,
            model_version = %model_version,
            "Generated configuration recommendation"
        );
    }

    /// Log a request rejected before reaching the model
    pub fn log_rejected(&self, instance_id: Option<&str>, reason: &str) {
        info!(
            event = "recommendation_rejected",
            service = %self.service_name,
            instance_id = ?instance_id,
            reason = %reason,
            "Rejected recommendation request"
        );
    }

    /// Log a model failure
    pub fn log_model_error(&self, instance_id: &str, error: &str) {
        warn!(
            event = "model_error",
            service = %self.service_name,
            instance_id = %instance_id,
            error = %error,
            "Model invocation failed, keeping previous recommendation"
        );
    }

    /// Log the outcome of loading the model bundle
    pub fn log_bundle_loaded(&self, path: &str, model_version: &str, legacy_location: bool) {
        if legacy_location {
            warn!(
                event = "bundle_loaded",
                service = %self.service_name,
                path = %path,
                model_version = %model_version,
                legacy_location = true,
                "Model bundle loaded from legacy location"
            );
        } else {
            info!(
                event = "bundle_loaded",
                service = %self.service_name,
                path = %path,
                model_version = %model_version,
                legacy_location = false,
                "Model bundle loaded"
            );
        }
    }

    /// Log a bundle that could not be loaded
    pub fn log_bundle_unavailable(&self, error: &str) {
        warn!(
            event = "bundle_unavailable",
            service = %self.service_name,
            error = %error,
            "Model bundle unavailable, recommendations disabled"
        );
    }

    /// Log service startup
    pub fn log_startup(&self, version: &str, model_version: &str) {
        info!(
            event = "service_started",
            service = %self.service_name,
            service_version = %version,
            model_version = %model_version,
            "Configuration recommender started"
        );
    }

    /// Log service shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            service = %self.service_name,
            reason = %reason,
            "Configuration recommender shutting down"
        );
    }
}
