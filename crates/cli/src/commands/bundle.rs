//! Offline inspection of a model bundle

use anyhow::{Context, Result};
use colored::Colorize;
use recommender_lib::predictor::{BundleLocator, BundleManifest, FeatureNormalizer, ModelSpec};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tabled::Tabled;

use crate::commands::read_telemetry;
use crate::output::{print_json, print_warning, OutputFormat};

/// Where to look for the bundle
#[derive(Debug, Clone)]
pub struct BundleSource {
    pub root: PathBuf,
    pub path: Option<PathBuf>,
}

struct LocatedManifest {
    path: PathBuf,
    legacy_location: bool,
    manifest: BundleManifest,
}

impl BundleSource {
    /// Find and parse the manifest without loading any model files
    fn read_manifest(&self) -> Result<LocatedManifest> {
        let mut locator = BundleLocator::new(&self.root);
        if let Some(path) = &self.path {
            locator = locator.with_explicit_path(path);
        }
        let (path, legacy_location) = locator.locate()?;
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read model bundle {:?}", path))?;
        let manifest = BundleManifest::from_json(&content)?;

        Ok(LocatedManifest {
            path,
            legacy_location,
            manifest,
        })
    }
}

#[derive(Tabled)]
struct FeatureRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Feature")]
    name: String,
}

#[derive(Tabled)]
struct NormalizedRow {
    #[tabled(rename = "Feature")]
    name: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Defaulted")]
    defaulted: String,
}

#[derive(Debug, Serialize)]
struct FeatureReport<'a> {
    path: &'a Path,
    version: &'a str,
    features: &'a [String],
    models: ModelKinds,
}

#[derive(Debug, Serialize)]
struct ModelKinds {
    ec2: &'static str,
    storage: &'static str,
    scaling: &'static str,
}

#[derive(Debug, Serialize)]
struct NormalizedFeature<'a> {
    name: &'a str,
    value: f64,
    defaulted: bool,
}

#[derive(Debug, Serialize)]
struct NormalizeReport<'a> {
    version: &'a str,
    features: Vec<NormalizedFeature<'a>>,
}

fn model_kind(spec: &ModelSpec) -> &'static str {
    match spec {
        ModelSpec::Onnx { .. } => "onnx",
        ModelSpec::Linear(_) => "linear",
    }
}

/// List the ordered features a bundle expects
pub fn show_features(source: &BundleSource, format: OutputFormat) -> Result<()> {
    let located = source.read_manifest()?;
    let manifest = &located.manifest;

    match format {
        OutputFormat::Json => {
            let report = FeatureReport {
                path: &located.path,
                version: &manifest.version,
                features: &manifest.features,
                models: ModelKinds {
                    ec2: model_kind(&manifest.models.ec2),
                    storage: model_kind(&manifest.models.storage),
                    scaling: model_kind(&manifest.models.scaling),
                },
            };
            print_json(&report)?;
        }
        OutputFormat::Table => {
            println!("{}", "Model Bundle".bold());
            println!("{}", "=".repeat(50));
            println!("Path:       {}", located.path.display().to_string().cyan());
            println!("Version:    {}", manifest.version);
            println!(
                "Models:     ec2={} storage={} scaling={}",
                model_kind(&manifest.models.ec2),
                model_kind(&manifest.models.storage),
                model_kind(&manifest.models.scaling)
            );
            println!();

            let rows: Vec<FeatureRow> = manifest
                .features
                .iter()
                .enumerate()
                .map(|(index, name)| FeatureRow {
                    index,
                    name: name.clone(),
                })
                .collect();
            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);

            if located.legacy_location {
                print_warning("Bundle was found at a legacy location");
            }
        }
    }

    Ok(())
}

/// Print the raw (unscaled) feature vector the service would build for this telemetry
pub fn normalize(
    source: &BundleSource,
    metrics: &[String],
    file: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let located = source.read_manifest()?;
    let record = read_telemetry(file, metrics)?;

    let normalizer = FeatureNormalizer::new(located.manifest.features.clone());
    let vector = normalizer.normalize(&record);

    let features: Vec<NormalizedFeature> = normalizer
        .features()
        .iter()
        .zip(vector.as_slice())
        .map(|(name, value)| NormalizedFeature {
            name,
            value: *value,
            defaulted: vector.defaulted.contains(name),
        })
        .collect();

    match format {
        OutputFormat::Json => print_json(&NormalizeReport {
            version: &located.manifest.version,
            features,
        })?,
        OutputFormat::Table => {
            let rows: Vec<NormalizedRow> = features
                .iter()
                .map(|f| NormalizedRow {
                    name: f.name.to_string(),
                    value: f.value.to_string(),
                    defaulted: if f.defaulted {
                        "yes".yellow().to_string()
                    } else {
                        "no".to_string()
                    },
                })
                .collect();
            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);

            if !vector.defaulted.is_empty() {
                print_warning(&format!(
                    "{} of {} features fell back to 0",
                    vector.defaulted.len(),
                    vector.len()
                ));
            }
        }
    }

    Ok(())
}
