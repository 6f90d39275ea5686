//! Recommendation commands: submit telemetry and read the latest result

use anyhow::Result;
use colored::Colorize;
use recommender_lib::{InferenceRequest, RecommendationResult};
use std::path::Path;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::commands::read_telemetry;
use crate::output::{format_metric, print_info, print_json, OutputFormat};

/// Row for the metrics table
#[derive(Tabled)]
struct MetricRow {
    #[tabled(rename = "Metric")]
    name: String,
    #[tabled(rename = "Value")]
    value: String,
}

/// Submit telemetry for one instance and print the recommendation
pub async fn predict(
    client: &ApiClient,
    instance_id: &str,
    metrics: &[String],
    file: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let record = read_telemetry(file, metrics)?;
    let request = InferenceRequest::new(instance_id, record);

    let result = client.predict(&request).await?;
    print_result(&result, format)
}

/// Show the most recent recommendation
pub async fn last(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let result = client.last().await?;

    match (result, format) {
        (Some(result), format) => print_result(&result, format)?,
        (None, OutputFormat::Json) => println!("null"),
        (None, OutputFormat::Table) => print_info("No recommendation has been produced yet"),
    }

    Ok(())
}

fn print_result(result: &RecommendationResult, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(result)?,
        OutputFormat::Table => {
            let rec = &result.recommendation;
            println!("{}", "Recommendation".bold());
            println!("{}", "=".repeat(50));
            println!("Instance:          {}", result.instance_id.cyan());
            println!("Compute class:     {}", rec.compute_class.green());
            println!("Storage class:     {}", rec.storage_class.green());
            println!("Scaling action:    {}", rec.scaling_action.green());
            println!();

            let m = &result.metrics;
            let rows = vec![
                MetricRow {
                    name: "CPUUtilization".to_string(),
                    value: format_metric(m.cpu_utilization.as_ref()),
                },
                MetricRow {
                    name: "NetworkIn".to_string(),
                    value: format_metric(m.network_in.as_ref()),
                },
                MetricRow {
                    name: "NetworkOut".to_string(),
                    value: format_metric(m.network_out.as_ref()),
                },
                MetricRow {
                    name: "DiskReadOps".to_string(),
                    value: format_metric(m.disk_read_ops.as_ref()),
                },
                MetricRow {
                    name: "DiskWriteOps".to_string(),
                    value: format_metric(m.disk_write_ops.as_ref()),
                },
            ];

            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);
        }
    }

    Ok(())
}
