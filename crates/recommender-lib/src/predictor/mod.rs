//! ML recommendation engine

mod bundle;
mod features;
mod inference;
mod output;
mod scaling;

pub use bundle::{
    compute_checksum, load_bundle, BundleEncoders, BundleLocator, BundleManifest, BundleModels,
    LoadedBundle, ModelSpec, DEFAULT_BUNDLE_PATH, LEGACY_BUNDLE_PATHS,
};
pub use features::{
    coerce_category, coerce_feature, coerce_numeric, coerce_timestamp, Coerced,
    FeatureNormalizer, JOB_TYPE_CODES, JOB_TYPE_FEATURE, SCHEDULER_CODES, SCHEDULER_FEATURE,
    TIMESTAMP_FEATURE,
};
pub use inference::{
    BundlePredictor, Classifier, LinearClassifier, OnnxClassifier,
};
pub use output::{decode_label, LabelDecoder, OutputDecoders, PredictionCodes};
pub use scaling::StandardScaler;

use crate::models::{FeatureVector, Recommendation};
use anyhow::Result;

/// Trait for prediction implementations
pub trait Predictor: Send + Sync {
    /// Ordered feature names the model was trained on
    fn feature_names(&self) -> &[String];

    /// Generate a recommendation from a normalized, unscaled feature vector
    fn predict(&self, features: &FeatureVector) -> Result<Recommendation>;

    /// Get current model version
    fn model_version(&self) -> &str;
}
