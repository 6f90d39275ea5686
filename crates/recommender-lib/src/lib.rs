//! Configuration recommender library
//!
//! This crate provides the core functionality for:
//! - Normalizing raw telemetry into the model's feature order
//! - Loading the model bundle (scaler, classifiers, label decoders)
//! - Producing configuration recommendations and caching the latest one
//! - Health checks and observability

pub mod cache;
pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod predictor;
pub mod service;

pub use cache::RecommendationCache;
pub use error::RecommendError;
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{RecommenderMetrics, StructuredLogger};
pub use service::RecommendationService;
