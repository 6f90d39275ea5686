//! CLI subcommands

pub mod bundle;
pub mod predict;
pub mod status;

use anyhow::{bail, Context, Result};
use recommender_lib::TelemetryRecord;
use serde_json::Value;
use std::path::Path;

/// Parse a `KEY=VALUE` pair; the value is JSON when it parses, a string otherwise
pub fn parse_metric(pair: &str) -> Result<(String, Value)> {
    let Some((key, raw)) = pair.split_once('=') else {
        bail!("Invalid metric '{}', expected KEY=VALUE", pair);
    };
    let key = key.trim();
    if key.is_empty() {
        bail!("Invalid metric '{}', key is empty", pair);
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

/// Build a telemetry record from an optional JSON file and `KEY=VALUE` overrides
pub fn read_telemetry(file: Option<&Path>, metrics: &[String]) -> Result<TelemetryRecord> {
    let mut record = match file {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read telemetry file {:?}", path))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Telemetry file {:?} is not a JSON object", path))?
        }
        None => TelemetryRecord::new(),
    };

    for pair in metrics {
        let (key, value) = parse_metric(pair)?;
        record.insert(key, value);
    }

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_parse_metric_number() {
        let (key, value) = parse_metric("CPUUtilization=72.5").unwrap();
        assert_eq!(key, "CPUUtilization");
        assert_eq!(value, json!(72.5));
    }

    #[test]
    fn test_parse_metric_string_fallback() {
        let (key, value) = parse_metric("job_type=batch").unwrap();
        assert_eq!(key, "job_type");
        assert_eq!(value, json!("batch"));
    }

    #[test]
    fn test_parse_metric_keeps_equals_in_value() {
        let (_, value) = parse_metric("timestamp=a=b").unwrap();
        assert_eq!(value, json!("a=b"));
    }

    #[test]
    fn test_parse_metric_rejects_malformed() {
        assert!(parse_metric("CPUUtilization").is_err());
        assert!(parse_metric("=5").is_err());
    }

    #[test]
    fn test_read_telemetry_merges_file_and_flags() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("telemetry.json");
        std::fs::write(&path, r#"{"CPUUtilization": 10, "NetworkIn": 5}"#).unwrap();

        let record = read_telemetry(
            Some(&path),
            &["CPUUtilization=90".to_string(), "NetworkOut=\"7\"".to_string()],
        )
        .unwrap();

        assert_eq!(record.get("CPUUtilization"), Some(&json!(90)));
        assert_eq!(record.get("NetworkIn"), Some(&json!(5)));
        assert_eq!(record.get("NetworkOut"), Some(&json!("7")));
    }

    #[test]
    fn test_read_telemetry_rejects_non_object_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("telemetry.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();

        assert!(read_telemetry(Some(&path), &[]).is_err());
    }
}
