//! Classifier inference
//!
//! Each model bundle carries three independent classifiers (compute class,
//! storage class, scaling action). Classifiers exported to ONNX run through
//! tract; small linear models can be embedded directly in the manifest.

use super::output::{OutputDecoders, PredictionCodes};
use super::scaling::StandardScaler;
use super::Predictor;
use crate::models::{FeatureVector, Recommendation};
use crate::observability::RecommenderMetrics;
use anyhow::{bail, ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tract_onnx::prelude::*;
use tracing::{debug, warn};

/// Maximum inference latency before warning (5ms target)
const MAX_INFERENCE_MS: u128 = 5;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// A pre-trained model emitting one categorical code per scaled vector
pub trait Classifier: Send + Sync {
    fn classify(&self, scaled: &[f64]) -> Result<i64>;
}

/// ONNX classifier run with tract
///
/// The model takes a single `f32 [1, n_features]` input. Output 0 is either
/// the predicted label (integer tensor) or per-class scores (f32 tensor),
/// in which case the argmax is the code.
pub struct OnnxClassifier {
    model: TractModel,
    num_features: usize,
}

impl OnnxClassifier {
    /// Create a classifier from model bytes
    pub fn new(model_bytes: &[u8], num_features: usize) -> Result<Self> {
        let model = Self::load_model(model_bytes, num_features)?;
        Ok(Self {
            model,
            num_features,
        })
    }

    /// Load and optimize an ONNX model from bytes
    fn load_model(model_bytes: &[u8], num_features: usize) -> Result<TractModel> {
        let model = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(model_bytes))
            .context("Failed to parse ONNX model")?
            .with_input_fact(0, f32::fact([1, num_features]).into())
            .context("Failed to set input shape")?
            .into_optimized()
            .context("Failed to optimize model")?
            .into_runnable()
            .context("Failed to create runnable model")?;
        Ok(model)
    }

    fn to_tensor(&self, scaled: &[f64]) -> Result<Tensor> {
        let data: Vec<f32> = scaled.iter().map(|v| *v as f32).collect();
        let array = tract_ndarray::Array2::from_shape_vec((1, self.num_features), data)
            .context("Feature vector does not match model input shape")?;
        Ok(array.into())
    }
}

impl Classifier for OnnxClassifier {
    fn classify(&self, scaled: &[f64]) -> Result<i64> {
        let input = self.to_tensor(scaled)?;
        let result = self.model.run(tvec!(input.into()))?;
        let output = result.first().context("No output from model")?;
        output_code(output)
    }
}

fn output_code(output: &Tensor) -> Result<i64> {
    match output.datum_type() {
        DatumType::I64 => output
            .to_array_view::<i64>()?
            .iter()
            .next()
            .copied()
            .context("Model returned an empty label tensor"),
        DatumType::I32 => output
            .to_array_view::<i32>()?
            .iter()
            .next()
            .map(|code| i64::from(*code))
            .context("Model returned an empty label tensor"),
        DatumType::F32 => {
            let scores: Vec<f32> = output.to_array_view::<f32>()?.iter().copied().collect();
            if scores.iter().any(|s| !s.is_finite()) {
                bail!("Model returned a non-finite score {:?}", scores);
            }
            match scores.len() {
                0 => bail!("Model returned an empty score tensor"),
                1 => Ok(scores[0].round() as i64),
                _ => Ok(argmax(scores.iter().map(|s| f64::from(*s))) as i64),
            }
        }
        other => bail!("Unsupported model output type {:?}", other),
    }
}

fn argmax(values: impl Iterator<Item = f64>) -> usize {
    let mut best = (0, f64::NEG_INFINITY);
    for (idx, value) in values.enumerate() {
        if value > best.1 {
            best = (idx, value);
        }
    }
    best.0
}

/// Linear classifier embedded in the bundle manifest
///
/// Scores are `W·x + b`; the code is `classes[argmax]`. A single row is a
/// binary model: a positive score selects `classes[1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearClassifier {
    pub coefficients: Vec<Vec<f64>>,
    pub intercepts: Vec<f64>,
    pub classes: Vec<i64>,
}

impl LinearClassifier {
    pub fn validate(&self, num_features: usize) -> Result<()> {
        ensure!(!self.coefficients.is_empty(), "Linear model has no coefficients");
        ensure!(
            self.intercepts.len() == self.coefficients.len(),
            "Linear model has {} intercepts for {} coefficient rows",
            self.intercepts.len(),
            self.coefficients.len()
        );
        if let Some(row) = self.coefficients.iter().find(|row| row.len() != num_features) {
            bail!(
                "Linear model row has {} coefficients, expected {}",
                row.len(),
                num_features
            );
        }
        let expected_classes = if self.coefficients.len() == 1 {
            2
        } else {
            self.coefficients.len()
        };
        ensure!(
            self.classes.len() == expected_classes,
            "Linear model lists {} classes, expected {}",
            self.classes.len(),
            expected_classes
        );
        Ok(())
    }

    fn score(&self, row: usize, scaled: &[f64]) -> f64 {
        let dot: f64 = self.coefficients[row]
            .iter()
            .zip(scaled)
            .map(|(w, x)| w * x)
            .sum();
        dot + self.intercepts[row]
    }
}

impl Classifier for LinearClassifier {
    fn classify(&self, scaled: &[f64]) -> Result<i64> {
        self.validate(scaled.len())?;

        let idx = if self.coefficients.len() == 1 {
            usize::from(self.score(0, scaled) > 0.0)
        } else {
            argmax((0..self.coefficients.len()).map(|row| self.score(row, scaled)))
        };
        Ok(self.classes[idx])
    }
}

/// Predictor assembled from a loaded model bundle
pub struct BundlePredictor {
    version: String,
    features: Vec<String>,
    scaler: StandardScaler,
    compute: Box<dyn Classifier>,
    storage: Box<dyn Classifier>,
    scaling: Box<dyn Classifier>,
    decoders: OutputDecoders,
    metrics: RecommenderMetrics,
}

impl BundlePredictor {
    pub fn new(
        version: impl Into<String>,
        features: Vec<String>,
        scaler: StandardScaler,
        compute: Box<dyn Classifier>,
        storage: Box<dyn Classifier>,
        scaling: Box<dyn Classifier>,
        decoders: OutputDecoders,
    ) -> Result<Self> {
        ensure!(!features.is_empty(), "Model bundle lists no features");
        scaler.validate(features.len())?;

        Ok(Self {
            version: version.into(),
            features,
            scaler,
            compute,
            storage,
            scaling,
            decoders,
            metrics: RecommenderMetrics::new(),
        })
    }

    /// Run the three classifiers on an already-normalized vector
    pub fn predict_codes(&self, features: &FeatureVector) -> Result<PredictionCodes> {
        let scaled = self
            .scaler
            .transform(features.as_slice())
            .context("Failed to scale feature vector")?;

        Ok(PredictionCodes {
            compute: self.compute.classify(&scaled).context("Compute class model failed")?,
            storage: self.storage.classify(&scaled).context("Storage class model failed")?,
            scaling: self.scaling.classify(&scaled).context("Scaling action model failed")?,
        })
    }
}

impl Predictor for BundlePredictor {
    fn feature_names(&self) -> &[String] {
        &self.features
    }

    fn predict(&self, features: &FeatureVector) -> Result<Recommendation> {
        let start = Instant::now();

        let codes = self.predict_codes(features)?;

        let elapsed = start.elapsed();
        if elapsed.as_millis() > MAX_INFERENCE_MS {
            self.metrics.inc_slow_inferences();
            warn!(elapsed_ms = elapsed.as_millis(), "Inference exceeded {}ms target", MAX_INFERENCE_MS);
        } else {
            debug!(elapsed_us = elapsed.as_micros(), "Inference completed");
        }

        Ok(self.decoders.decode(codes))
    }

    fn model_version(&self) -> &str {
        &self.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictor::LabelDecoder;

    struct Constant(i64);

    impl Classifier for Constant {
        fn classify(&self, _scaled: &[f64]) -> Result<i64> {
            Ok(self.0)
        }
    }

    struct Broken;

    impl Classifier for Broken {
        fn classify(&self, _scaled: &[f64]) -> Result<i64> {
            bail!("weights corrupted")
        }
    }

    fn features(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("f{i}")).collect()
    }

    fn vector(values: Vec<f64>) -> FeatureVector {
        FeatureVector {
            values,
            defaulted: Vec::new(),
        }
    }

    #[test]
    fn test_linear_multiclass_argmax() {
        let model = LinearClassifier {
            coefficients: vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![-1.0, -1.0]],
            intercepts: vec![0.0, 0.0, 0.0],
            classes: vec![10, 20, 30],
        };
        assert_eq!(model.classify(&[2.0, 1.0]).unwrap(), 10);
        assert_eq!(model.classify(&[0.0, 3.0]).unwrap(), 20);
        assert_eq!(model.classify(&[-1.0, -1.0]).unwrap(), 30);
    }

    #[test]
    fn test_linear_binary_threshold() {
        let model = LinearClassifier {
            coefficients: vec![vec![1.0]],
            intercepts: vec![-0.5],
            classes: vec![0, 1],
        };
        assert_eq!(model.classify(&[1.0]).unwrap(), 1);
        assert_eq!(model.classify(&[0.0]).unwrap(), 0);
    }

    #[test]
    fn test_linear_dimension_mismatch() {
        let model = LinearClassifier {
            coefficients: vec![vec![1.0, 2.0], vec![3.0, 4.0]],
            intercepts: vec![0.0, 0.0],
            classes: vec![0, 1],
        };
        assert!(model.validate(3).is_err());
        assert!(model.validate(2).is_ok());

        let wrong_classes = LinearClassifier {
            classes: vec![0, 1, 2],
            ..model
        };
        assert!(wrong_classes.validate(2).is_err());
    }

    #[test]
    fn test_invalid_onnx_bytes_rejected() {
        let err = OnnxClassifier::new(b"not an onnx model", 4).err().unwrap();
        assert!(err.to_string().contains("Failed to parse ONNX model"));
    }

    #[test]
    fn test_output_code_integer_labels() {
        assert_eq!(output_code(&tensor1(&[2i64])).unwrap(), 2);
        assert_eq!(output_code(&tensor2(&[[7i32]])).unwrap(), 7);
    }

    #[test]
    fn test_output_code_score_argmax() {
        let scores = tensor2(&[[0.1f32, 0.7, 0.2]]);
        assert_eq!(output_code(&scores).unwrap(), 1);
    }

    #[test]
    fn test_output_code_single_score_rounds() {
        assert_eq!(output_code(&tensor1(&[0.8f32])).unwrap(), 1);
        assert_eq!(output_code(&tensor1(&[0.2f32])).unwrap(), 0);
    }

    #[test]
    fn test_output_code_rejects_non_finite_scores() {
        let err = output_code(&tensor1(&[f32::NAN])).unwrap_err();
        assert!(err.to_string().contains("non-finite"));

        assert!(output_code(&tensor2(&[[0.3f32, f32::INFINITY]])).is_err());
    }

    #[test]
    fn test_output_code_rejects_empty_tensors() {
        assert!(output_code(&tensor1::<i64>(&[])).is_err());
        assert!(output_code(&tensor1::<f32>(&[])).is_err());
    }

    #[test]
    fn test_output_code_rejects_unsupported_type() {
        let err = output_code(&tensor1(&[1.0f64])).unwrap_err();
        assert!(err.to_string().contains("Unsupported model output type"));
    }

    #[test]
    fn test_slow_inference_is_counted() {
        struct Slow;

        impl Classifier for Slow {
            fn classify(&self, _scaled: &[f64]) -> Result<i64> {
                std::thread::sleep(std::time::Duration::from_millis(MAX_INFERENCE_MS as u64 + 5));
                Ok(0)
            }
        }

        fn slow_count() -> f64 {
            prometheus::gather()
                .iter()
                .find(|family| family.get_name() == "recommender_slow_inferences_total")
                .map(|family| family.get_metric()[0].get_counter().get_value())
                .unwrap_or(0.0)
        }

        let predictor = BundlePredictor::new(
            "test",
            features(1),
            StandardScaler::identity(1),
            Box::new(Slow),
            Box::new(Constant(0)),
            Box::new(Constant(0)),
            OutputDecoders::default(),
        )
        .unwrap();

        let before = slow_count();
        predictor.predict(&vector(vec![1.0])).unwrap();
        assert!(slow_count() >= before + 1.0);
    }

    #[test]
    fn test_bundle_predictor_decodes_outputs() {
        let decoders = OutputDecoders {
            compute: Some(LabelDecoder::new(vec!["t3.micro".into(), "m5.large".into()])),
            storage: Some(LabelDecoder::new(vec!["gp3".into()])),
            scaling: None,
        };
        let predictor = BundlePredictor::new(
            "test",
            features(2),
            StandardScaler::identity(2),
            Box::new(Constant(1)),
            Box::new(Constant(0)),
            Box::new(Constant(4)),
            decoders,
        )
        .unwrap();

        let rec = predictor.predict(&vector(vec![1.0, 2.0])).unwrap();
        assert_eq!(rec.compute_class, "m5.large");
        assert_eq!(rec.storage_class, "gp3");
        assert_eq!(rec.scaling_action, "4");
        assert_eq!(predictor.model_version(), "test");
    }

    #[test]
    fn test_bundle_predictor_propagates_model_failure() {
        let predictor = BundlePredictor::new(
            "test",
            features(1),
            StandardScaler::identity(1),
            Box::new(Constant(0)),
            Box::new(Broken),
            Box::new(Constant(0)),
            OutputDecoders::default(),
        )
        .unwrap();

        let err = predictor.predict(&vector(vec![1.0])).unwrap_err();
        assert!(format!("{err:#}").contains("weights corrupted"));
    }

    #[test]
    fn test_bundle_predictor_rejects_scaler_mismatch() {
        let result = BundlePredictor::new(
            "test",
            features(3),
            StandardScaler::identity(2),
            Box::new(Constant(0)),
            Box::new(Constant(0)),
            Box::new(Constant(0)),
            OutputDecoders::default(),
        );
        assert!(result.is_err());
    }
}
