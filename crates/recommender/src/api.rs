//! HTTP API for recommendations, health checks and Prometheus metrics

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use recommender_lib::{
    health::{components, ComponentStatus, HealthRegistry},
    InferenceRequest, RecommendError, RecommendationResult, RecommendationService,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

/// Name reported by the index route
pub const SERVICE_NAME: &str = "aws-config-recommender";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<RecommendationService>,
    pub health_registry: HealthRegistry,
}

impl AppState {
    pub fn new(service: Arc<RecommendationService>, health_registry: HealthRegistry) -> Self {
        Self {
            service,
            health_registry,
        }
    }
}

/// Error body returned for failed recommendations
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    kind: &'static str,
}

/// Maps boundary errors onto HTTP responses
pub struct ApiError(RecommendError);

impl From<RecommendError> for ApiError {
    fn from(err: RecommendError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            RecommendError::Validation(_) => StatusCode::BAD_REQUEST,
            RecommendError::Model(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorBody {
            error: self.0.message(),
            kind: self.0.kind(),
        };
        (status, Json(body)).into_response()
    }
}

/// Response of the last-recommendation route
#[derive(Debug, Serialize)]
struct LastResponse {
    last_ai: Option<RecommendationResult>,
}

async fn index() -> impl IntoResponse {
    Json(json!({ "service": SERVICE_NAME, "status": "running" }))
}

async fn predict(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<InferenceRequest>, JsonRejection>,
) -> Result<Json<RecommendationResult>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        state
            .service
            .reject_malformed(format!("Invalid request body: {}", rejection.body_text()))
    })?;
    let result = state.service.recommend(&request)?;
    state.health_registry.set_healthy(components::CACHE).await;
    Ok(Json(result.as_ref().clone()))
}

async fn last(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let last_ai = state.service.last().map(|result| result.as_ref().clone());
    Json(LastResponse { last_ai })
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %err, "Failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/predict", post(predict))
        .route("/last", get(last))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
