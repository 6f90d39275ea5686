//! Feature normalization for ML inference
//!
//! Maps an arbitrary telemetry record onto the fixed, ordered feature list
//! the trained model expects. Normalization is best-effort: a field that is
//! missing or cannot be coerced degrades to 0.0 and is reported in
//! [`FeatureVector::defaulted`], it never aborts the vector.

use crate::models::{FeatureVector, TelemetryRecord};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

/// Feature that carries a date/time rather than a plain number
pub const TIMESTAMP_FEATURE: &str = "timestamp";

/// Categorical feature encoded through [`JOB_TYPE_CODES`]
pub const JOB_TYPE_FEATURE: &str = "job_type";

/// Categorical feature encoded through [`SCHEDULER_CODES`]
pub const SCHEDULER_FEATURE: &str = "scheduler";

/// Job type encoding, must match the mapping used at training time
pub const JOB_TYPE_CODES: &[(&str, u8)] = &[("service", 0), ("batch", 1), ("ai_training", 2)];

/// Scheduler encoding, must match the mapping used at training time
pub const SCHEDULER_CODES: &[(&str, u8)] = &[("fifo", 0), ("batch", 1), ("realtime", 2)];

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// A coerced field value and whether it fell back to the default
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coerced {
    pub value: f64,
    pub defaulted: bool,
}

impl Coerced {
    fn parsed(value: f64) -> Self {
        Self {
            value,
            defaulted: false,
        }
    }

    fn fallback() -> Self {
        Self {
            value: 0.0,
            defaulted: true,
        }
    }
}

/// Builds feature vectors in the model's feature order
#[derive(Debug, Clone)]
pub struct FeatureNormalizer {
    features: Vec<String>,
}

impl FeatureNormalizer {
    pub fn new(features: Vec<String>) -> Self {
        Self { features }
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }

    /// Normalize a record. Never fails; the output length always equals the
    /// feature list length.
    pub fn normalize(&self, record: &TelemetryRecord) -> FeatureVector {
        let mut values = Vec::with_capacity(self.features.len());
        let mut defaulted = Vec::new();

        for feature in &self.features {
            let coerced = coerce_feature(feature, record.get(feature));
            if coerced.defaulted {
                defaulted.push(feature.clone());
            }
            values.push(coerced.value);
        }

        FeatureVector { values, defaulted }
    }
}

/// Coerce one field according to its feature kind
pub fn coerce_feature(feature: &str, raw: Option<&Value>) -> Coerced {
    match feature {
        TIMESTAMP_FEATURE => coerce_timestamp(raw),
        JOB_TYPE_FEATURE => coerce_category(raw, JOB_TYPE_CODES),
        SCHEDULER_FEATURE => coerce_category(raw, SCHEDULER_CODES),
        _ => coerce_numeric(raw),
    }
}

/// Plain numeric coercion: numbers, numeric strings and booleans
pub fn coerce_numeric(raw: Option<&Value>) -> Coerced {
    let value = match raw {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(Value::Bool(b)) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };

    match value {
        Some(v) if v.is_finite() => Coerced::parsed(v),
        _ => Coerced::fallback(),
    }
}

/// Date/time strings become epoch seconds, anything else goes through
/// numeric coercion
pub fn coerce_timestamp(raw: Option<&Value>) -> Coerced {
    if let Some(Value::String(s)) = raw {
        if let Some(epoch) = parse_epoch_seconds(s.trim()) {
            return Coerced::parsed(epoch);
        }
    }
    coerce_numeric(raw)
}

/// Look up a categorical string in its encoding table
pub fn coerce_category(raw: Option<&Value>, codes: &[(&str, u8)]) -> Coerced {
    let code = raw
        .and_then(Value::as_str)
        .and_then(|s| codes.iter().find(|(name, _)| *name == s))
        .map(|(_, code)| *code);

    match code {
        Some(code) => Coerced::parsed(f64::from(code)),
        None => Coerced::fallback(),
    }
}

fn parse_epoch_seconds(s: &str) -> Option<f64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(to_epoch_seconds(dt.timestamp(), dt.timestamp_subsec_nanos()));
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            let utc = naive.and_utc();
            return Some(to_epoch_seconds(utc.timestamp(), utc.timestamp_subsec_nanos()));
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().timestamp() as f64)
}

fn to_epoch_seconds(secs: i64, nanos: u32) -> f64 {
    secs as f64 + f64::from(nanos) / 1_000_000_000.0
}
