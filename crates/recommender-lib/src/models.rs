//! Core data models for the configuration recommender

use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Telemetry field names the inference boundary refuses to do without
pub const REQUIRED_METRICS: [&str; 3] = ["CPUUtilization", "NetworkIn", "NetworkOut"];

/// Raw telemetry submitted for inference, keyed by metric name
///
/// Values are kept exactly as submitted; coercion happens in the normalizer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TelemetryRecord(Map<String, Value>);

impl TelemetryRecord {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Builder-style insert, mostly useful in tests and the CLI
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(field, value);
        self
    }
}

impl From<Map<String, Value>> for TelemetryRecord {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Body of a recommendation request
///
/// Scalar instance ids are accepted as their string form; falsy ones (`null`,
/// `false`, `0`, `""`) count as missing. `"metrics": null` is an empty record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InferenceRequest {
    #[serde(default, deserialize_with = "instance_id_from_json")]
    pub instance_id: Option<String>,
    #[serde(default, deserialize_with = "metrics_from_json")]
    pub metrics: TelemetryRecord,
}

fn instance_id_from_json<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) | Some(Value::Bool(false)) => Ok(None),
        Some(Value::Bool(true)) => Ok(Some("true".to_string())),
        Some(Value::String(id)) => Ok(Some(id)),
        Some(Value::Number(n)) if n.as_f64() == Some(0.0) => Ok(None),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(de::Error::custom(format!(
            "instance_id must be a string or number, got {other}"
        ))),
    }
}

fn metrics_from_json<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<TelemetryRecord, D::Error> {
    Ok(Option::<TelemetryRecord>::deserialize(deserializer)?.unwrap_or_default())
}

impl InferenceRequest {
    pub fn new(instance_id: impl Into<String>, metrics: TelemetryRecord) -> Self {
        Self {
            instance_id: Some(instance_id.into()),
            metrics,
        }
    }
}

/// Ordered numeric encoding of a telemetry record, one value per model feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub values: Vec<f64>,
    /// Features whose value fell back to the default during normalization
    pub defaulted: Vec<String>,
}

impl FeatureVector {
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Decoded model output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(rename = "recommended_ec2")]
    pub compute_class: String,
    #[serde(rename = "recommended_storage")]
    pub storage_class: String,
    #[serde(rename = "recommended_scaling_action")]
    pub scaling_action: String,
}

/// Subset of the submitted telemetry echoed back with a recommendation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelevantMetrics {
    #[serde(rename = "CPUUtilization")]
    pub cpu_utilization: Option<Value>,
    #[serde(rename = "NetworkIn")]
    pub network_in: Option<Value>,
    #[serde(rename = "NetworkOut")]
    pub network_out: Option<Value>,
    #[serde(rename = "DiskReadOps")]
    pub disk_read_ops: Option<Value>,
    #[serde(rename = "DiskWriteOps")]
    pub disk_write_ops: Option<Value>,
}

impl RelevantMetrics {
    pub fn from_record(record: &TelemetryRecord) -> Self {
        let pick = |field: &str| record.get(field).cloned();
        Self {
            cpu_utilization: pick("CPUUtilization"),
            network_in: pick("NetworkIn"),
            network_out: pick("NetworkOut"),
            disk_read_ops: pick("DiskReadOps"),
            disk_write_ops: pick("DiskWriteOps"),
        }
    }
}

/// Result of one successful inference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResult {
    pub instance_id: String,
    pub metrics: RelevantMetrics,
    pub recommendation: Recommendation,
}
