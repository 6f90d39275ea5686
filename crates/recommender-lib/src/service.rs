//! Recommendation boundary
//!
//! Validates a request, normalizes its telemetry, runs the model and, only on
//! success, publishes the result to the last-recommendation cache. A failed
//! request never overwrites a previously cached recommendation.

use crate::cache::RecommendationCache;
use crate::error::RecommendError;
use crate::models::{
    FeatureVector, InferenceRequest, RecommendationResult, RelevantMetrics, TelemetryRecord,
    REQUIRED_METRICS,
};
use crate::observability::{RecommenderMetrics, StructuredLogger};
use crate::predictor::{FeatureNormalizer, Predictor};
use std::sync::Arc;
use std::time::Instant;

enum ModelSlot {
    Loaded {
        predictor: Arc<dyn Predictor>,
        normalizer: FeatureNormalizer,
    },
    Unavailable(String),
}

pub struct RecommendationService {
    model: ModelSlot,
    cache: RecommendationCache,
    metrics: RecommenderMetrics,
    logger: StructuredLogger,
}

impl RecommendationService {
    pub fn new(
        predictor: Arc<dyn Predictor>,
        cache: RecommendationCache,
        logger: StructuredLogger,
    ) -> Self {
        let metrics = RecommenderMetrics::new();
        metrics.set_model_version(predictor.model_version());
        let normalizer = FeatureNormalizer::new(predictor.feature_names().to_vec());

        Self {
            model: ModelSlot::Loaded {
                predictor,
                normalizer,
            },
            cache,
            metrics,
            logger,
        }
    }

    /// A service whose every inference fails with a model error
    pub fn without_model(
        reason: impl Into<String>,
        cache: RecommendationCache,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            model: ModelSlot::Unavailable(reason.into()),
            cache,
            metrics: RecommenderMetrics::new(),
            logger,
        }
    }

    pub fn is_model_loaded(&self) -> bool {
        matches!(self.model, ModelSlot::Loaded { .. })
    }

    pub fn model_version(&self) -> Option<&str> {
        match &self.model {
            ModelSlot::Loaded { predictor, .. } => Some(predictor.model_version()),
            ModelSlot::Unavailable(_) => None,
        }
    }

    pub fn cache(&self) -> &RecommendationCache {
        &self.cache
    }

    /// Latest successful recommendation
    pub fn last(&self) -> Option<Arc<RecommendationResult>> {
        self.cache.get()
    }

    /// Raw (unscaled) feature vector for a record
    pub fn normalize(&self, record: &TelemetryRecord) -> Result<FeatureVector, RecommendError> {
        let (_, normalizer) = self.loaded_model()?;
        Ok(normalizer.normalize(record))
    }

    /// Validate and run the model without touching the cache
    pub fn infer(&self, request: &InferenceRequest) -> Result<RecommendationResult, RecommendError> {
        let instance_id = self.validate(request)?;
        let (predictor, normalizer) = match self.loaded_model() {
            Ok(model) => model,
            Err(err) => {
                self.metrics.inc_model_errors();
                self.logger.log_model_error(instance_id, &err.message());
                return Err(err);
            }
        };

        let start = Instant::now();
        let features = normalizer.normalize(&request.metrics);
        let prediction = predictor.predict(&features);
        self.metrics
            .observe_inference_latency(start.elapsed().as_secs_f64());

        let recommendation = prediction.map_err(|err| {
            let err = RecommendError::from_model_error(err);
            self.metrics.inc_model_errors();
            self.logger.log_model_error(instance_id, &err.message());
            err
        })?;

        self.metrics.add_defaulted_features(features.defaulted.len());
        self.logger.log_recommendation(
            instance_id,
            &recommendation.compute_class,
            &recommendation.storage_class,
            &recommendation.scaling_action,
            &features.defaulted,
            predictor.model_version(),
        );

        Ok(RecommendationResult {
            instance_id: instance_id.to_string(),
            metrics: RelevantMetrics::from_record(&request.metrics),
            recommendation,
        })
    }

    /// Infer and publish the result as the latest recommendation
    pub fn recommend(
        &self,
        request: &InferenceRequest,
    ) -> Result<Arc<RecommendationResult>, RecommendError> {
        let result = Arc::new(self.infer(request)?);
        self.cache.set(Arc::clone(&result));
        self.metrics.inc_recommendations_generated();
        self.metrics.set_cache_populated(true);
        Ok(result)
    }

    /// Record a request body that could not be decoded as a validation failure
    pub fn reject_malformed(&self, reason: impl Into<String>) -> RecommendError {
        let err = RecommendError::Validation(reason.into());
        self.reject(None, &err);
        err
    }

    fn loaded_model(&self) -> Result<(&dyn Predictor, &FeatureNormalizer), RecommendError> {
        match &self.model {
            ModelSlot::Loaded {
                predictor,
                normalizer,
            } => Ok((predictor.as_ref(), normalizer)),
            ModelSlot::Unavailable(reason) => Err(RecommendError::Model(format!(
                "Model bundle not loaded: {reason}"
            ))),
        }
    }

    fn validate<'a>(&self, request: &'a InferenceRequest) -> Result<&'a str, RecommendError> {
        let instance_id = match request.instance_id.as_deref() {
            Some(id) if !id.is_empty() => id,
            _ => {
                let err = RecommendError::Validation("instance_id is missing".to_string());
                self.reject(None, &err);
                return Err(err);
            }
        };

        let missing: Vec<&str> = REQUIRED_METRICS
            .iter()
            .copied()
            .filter(|field| !request.metrics.contains(field))
            .collect();
        if !missing.is_empty() {
            let err = RecommendError::Validation(format!(
                "Missing metrics: {}",
                missing.join(", ")
            ));
            self.reject(Some(instance_id), &err);
            return Err(err);
        }

        Ok(instance_id)
    }

    fn reject(&self, instance_id: Option<&str>, err: &RecommendError) {
        self.metrics.inc_validation_errors();
        self.logger.log_rejected(instance_id, &err.message());
    }
}
