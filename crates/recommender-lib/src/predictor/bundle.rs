//! Model bundle loading
//!
//! A bundle is a JSON manifest listing the model's feature order, the fitted
//! scaler, the three classifiers and their label decoders. ONNX classifiers
//! live next to the manifest and are referenced by relative path.
//!
//! The documented location is `<root>/models/model_bundle.json`. Older
//! deployments placed the bundle elsewhere; those paths are still searched
//! after the documented one, with a warning.

use super::inference::{BundlePredictor, Classifier, LinearClassifier, OnnxClassifier};
use super::output::{LabelDecoder, OutputDecoders};
use super::scaling::StandardScaler;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Documented bundle location, relative to the bundle root
pub const DEFAULT_BUNDLE_PATH: &str = "models/model_bundle.json";

/// Locations used by earlier deployment layouts, searched in order
pub const LEGACY_BUNDLE_PATHS: &[&str] = &[
    "models/model.json",
    "app/models/model_bundle.json",
    "app/models/model.json",
];

const UNVERSIONED: &str = "unversioned";

/// On-disk bundle manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleManifest {
    #[serde(default = "default_version")]
    pub version: String,
    pub features: Vec<String>,
    pub scaler: StandardScaler,
    pub models: BundleModels,
    #[serde(default)]
    pub encoders: BundleEncoders,
}

fn default_version() -> String {
    UNVERSIONED.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleModels {
    pub ec2: ModelSpec,
    pub storage: ModelSpec,
    pub scaling: ModelSpec,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BundleEncoders {
    #[serde(default)]
    pub ec2: Option<LabelDecoder>,
    #[serde(default)]
    pub storage: Option<LabelDecoder>,
    #[serde(default)]
    pub scaling: Option<LabelDecoder>,
}

/// How one classifier is stored
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ModelSpec {
    /// ONNX file relative to the manifest, optionally pinned by SHA-256
    Onnx {
        path: PathBuf,
        #[serde(default)]
        sha256: Option<String>,
    },
    /// Linear model embedded in the manifest
    Linear(LinearClassifier),
}

impl ModelSpec {
    fn build(&self, base_dir: &Path, num_features: usize) -> Result<Box<dyn Classifier>> {
        match self {
            ModelSpec::Onnx { path, sha256 } => {
                let full_path = base_dir.join(path);
                let bytes = fs::read(&full_path)
                    .with_context(|| format!("Failed to read model file {:?}", full_path))?;

                if let Some(expected) = sha256 {
                    let computed = compute_checksum(&bytes);
                    if !computed.eq_ignore_ascii_case(expected) {
                        bail!(
                            "Checksum mismatch for {:?}: expected {}, got {}",
                            full_path,
                            expected,
                            computed
                        );
                    }
                    debug!(path = ?full_path, checksum = %computed, "Model checksum validated");
                }

                let classifier = OnnxClassifier::new(&bytes, num_features)
                    .with_context(|| format!("Failed to load model {:?}", full_path))?;
                Ok(Box::new(classifier))
            }
            ModelSpec::Linear(model) => {
                model.validate(num_features)?;
                Ok(Box::new(model.clone()))
            }
        }
    }
}

impl BundleManifest {
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("Failed to parse model bundle manifest")
    }

    /// Build a predictor; ONNX paths resolve against `base_dir`
    pub fn into_predictor(self, base_dir: &Path) -> Result<BundlePredictor> {
        if self.features.is_empty() {
            bail!("Model bundle lists no features");
        }
        self.scaler.validate(self.features.len())?;

        let n = self.features.len();
        let compute = self.models.ec2.build(base_dir, n).context("Invalid ec2 model")?;
        let storage = self
            .models
            .storage
            .build(base_dir, n)
            .context("Invalid storage model")?;
        let scaling = self
            .models
            .scaling
            .build(base_dir, n)
            .context("Invalid scaling model")?;

        let decoders = OutputDecoders {
            compute: self.encoders.ec2,
            storage: self.encoders.storage,
            scaling: self.encoders.scaling,
        };

        BundlePredictor::new(
            self.version,
            self.features,
            self.scaler,
            compute,
            storage,
            scaling,
            decoders,
        )
    }
}

/// Load a bundle manifest and everything it references
pub fn load_bundle(path: &Path) -> Result<BundlePredictor> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read model bundle {:?}", path))?;
    let manifest = BundleManifest::from_json(&content)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    manifest.into_predictor(base_dir)
}

/// Compute SHA256 checksum of data
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// A bundle that was found and loaded
pub struct LoadedBundle {
    pub path: PathBuf,
    pub legacy_location: bool,
    pub predictor: BundlePredictor,
}

/// Finds the model bundle on disk
#[derive(Debug, Clone)]
pub struct BundleLocator {
    root: PathBuf,
    explicit_path: Option<PathBuf>,
}

impl BundleLocator {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            explicit_path: None,
        }
    }

    /// Use this path and skip the search entirely
    pub fn with_explicit_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.explicit_path = Some(path.into());
        self
    }

    /// Candidate paths in search order
    pub fn candidates(&self) -> Vec<PathBuf> {
        if let Some(path) = &self.explicit_path {
            return vec![path.clone()];
        }
        std::iter::once(DEFAULT_BUNDLE_PATH)
            .chain(LEGACY_BUNDLE_PATHS.iter().copied())
            .map(|relative| self.root.join(relative))
            .collect()
    }

    /// Return the first existing candidate and whether it is a legacy location
    pub fn locate(&self) -> Result<(PathBuf, bool)> {
        let candidates = self.candidates();
        for (idx, candidate) in candidates.iter().enumerate() {
            if candidate.is_file() {
                let legacy = self.explicit_path.is_none() && idx > 0;
                if legacy {
                    warn!(
                        path = ?candidate,
                        documented = %DEFAULT_BUNDLE_PATH,
                        "Model bundle found at a legacy location"
                    );
                }
                return Ok((candidate.clone(), legacy));
            }
        }
        bail!("Model bundle not found, searched {:?}", candidates)
    }

    pub fn load(&self) -> Result<LoadedBundle> {
        let (path, legacy_location) = self.locate()?;
        let predictor = load_bundle(&path)?;
        info!(path = ?path, "Model bundle loaded");
        Ok(LoadedBundle {
            path,
            legacy_location,
            predictor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TelemetryRecord;
    use crate::predictor::{FeatureNormalizer, Predictor};
    use serde_json::json;
    use tempfile::TempDir;

    fn linear_manifest() -> serde_json::Value {
        json!({
            "version": "2024-06-01",
            "features": ["CPUUtilization", "NetworkIn"],
            "scaler": { "mean": [50.0, 500.0], "scale": [10.0, 100.0] },
            "models": {
                "ec2": {
                    "type": "linear",
                    "coefficients": [[1.0, 0.0], [-1.0, 0.0]],
                    "intercepts": [0.0, 0.0],
                    "classes": [0, 1]
                },
                "storage": {
                    "type": "linear",
                    "coefficients": [[0.0, 1.0]],
                    "intercepts": [0.0],
                    "classes": [0, 1]
                },
                "scaling": {
                    "type": "linear",
                    "coefficients": [[1.0, 1.0], [0.0, 0.0], [-1.0, -1.0]],
                    "intercepts": [0.0, 0.1, 0.0],
                    "classes": [0, 1, 2]
                }
            },
            "encoders": {
                "ec2": ["c5.xlarge", "t3.micro"],
                "scaling": ["scale_out", "keep", "scale_in"]
            }
        })
    }

    fn write_manifest(dir: &Path, relative: &str, manifest: &serde_json::Value) -> PathBuf {
        let path = dir.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, serde_json::to_string_pretty(manifest).unwrap()).unwrap();
        path
    }

    #[test]
    fn test_load_linear_bundle_and_predict() {
        let temp = TempDir::new().unwrap();
        write_manifest(temp.path(), DEFAULT_BUNDLE_PATH, &linear_manifest());

        let loaded = BundleLocator::new(temp.path()).load().unwrap();
        assert!(!loaded.legacy_location);
        assert_eq!(loaded.predictor.model_version(), "2024-06-01");

        let normalizer = FeatureNormalizer::new(loaded.predictor.feature_names().to_vec());
        let record = TelemetryRecord::new()
            .with("CPUUtilization", 72.5)
            .with("NetworkIn", 1000);
        let rec = loaded.predictor.predict(&normalizer.normalize(&record)).unwrap();

        // Scaled input is [2.25, 5.0]
        assert_eq!(rec.compute_class, "c5.xlarge");
        assert_eq!(rec.storage_class, "1");
        assert_eq!(rec.scaling_action, "scale_out");
    }

    #[test]
    fn test_legacy_location_is_found() {
        let temp = TempDir::new().unwrap();
        write_manifest(temp.path(), "app/models/model.json", &linear_manifest());

        let (path, legacy) = BundleLocator::new(temp.path()).locate().unwrap();
        assert!(legacy);
        assert!(path.ends_with("app/models/model.json"));
    }

    #[test]
    fn test_documented_location_wins() {
        let temp = TempDir::new().unwrap();
        write_manifest(temp.path(), "models/model.json", &linear_manifest());
        write_manifest(temp.path(), DEFAULT_BUNDLE_PATH, &linear_manifest());

        let (path, legacy) = BundleLocator::new(temp.path()).locate().unwrap();
        assert!(!legacy);
        assert!(path.ends_with(DEFAULT_BUNDLE_PATH));
    }

    #[test]
    fn test_explicit_path_skips_search() {
        let temp = TempDir::new().unwrap();
        write_manifest(temp.path(), DEFAULT_BUNDLE_PATH, &linear_manifest());
        let custom = write_manifest(temp.path(), "elsewhere/bundle.json", &linear_manifest());

        let locator = BundleLocator::new(temp.path()).with_explicit_path(&custom);
        assert_eq!(locator.candidates(), vec![custom.clone()]);
        let (path, legacy) = locator.locate().unwrap();
        assert_eq!(path, custom);
        assert!(!legacy);
    }

    #[test]
    fn test_missing_bundle_reports_candidates() {
        let temp = TempDir::new().unwrap();
        let err = BundleLocator::new(temp.path()).locate().unwrap_err();
        assert!(err.to_string().contains("Model bundle not found"));
        assert!(err.to_string().contains("model_bundle.json"));
    }

    #[test]
    fn test_scaler_feature_mismatch_rejected() {
        let mut manifest = linear_manifest();
        manifest["scaler"]["mean"] = json!([1.0]);
        let temp = TempDir::new().unwrap();
        let path = write_manifest(temp.path(), DEFAULT_BUNDLE_PATH, &manifest);

        assert!(load_bundle(&path).is_err());
    }

    #[test]
    fn test_linear_model_dimension_mismatch_rejected() {
        let mut manifest = linear_manifest();
        manifest["models"]["storage"]["coefficients"] = json!([[1.0, 2.0, 3.0]]);
        let temp = TempDir::new().unwrap();
        let path = write_manifest(temp.path(), DEFAULT_BUNDLE_PATH, &manifest);

        let err = load_bundle(&path).err().unwrap();
        assert!(format!("{err:#}").contains("Invalid storage model"));
    }

    #[test]
    fn test_onnx_checksum_mismatch_rejected() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("models")).unwrap();
        fs::write(temp.path().join("models/ec2.onnx"), b"fake model bytes").unwrap();

        let mut manifest = linear_manifest();
        manifest["models"]["ec2"] = json!({
            "type": "onnx",
            "path": "ec2.onnx",
            "sha256": "0".repeat(64)
        });
        let path = write_manifest(temp.path(), DEFAULT_BUNDLE_PATH, &manifest);

        let err = load_bundle(&path).err().unwrap();
        assert!(format!("{err:#}").contains("Checksum mismatch"));
    }

    #[test]
    fn test_onnx_path_resolved_against_manifest_dir() {
        let temp = TempDir::new().unwrap();
        let mut manifest = linear_manifest();
        manifest["models"]["scaling"] = json!({ "type": "onnx", "path": "missing.onnx" });
        let path = write_manifest(temp.path(), DEFAULT_BUNDLE_PATH, &manifest);

        let err = load_bundle(&path).err().unwrap();
        let message = format!("{err:#}");
        assert!(message.contains("Failed to read model file"));
        assert!(message.contains("models"));
    }

    #[test]
    fn test_manifest_defaults() {
        let mut manifest = linear_manifest();
        manifest.as_object_mut().unwrap().remove("version");
        manifest.as_object_mut().unwrap().remove("encoders");
        let parsed = BundleManifest::from_json(&manifest.to_string()).unwrap();

        assert_eq!(parsed.version, "unversioned");
        assert!(parsed.encoders.ec2.is_none());
    }

    #[test]
    fn test_checksum_is_sha256_hex() {
        assert_eq!(
            compute_checksum(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
