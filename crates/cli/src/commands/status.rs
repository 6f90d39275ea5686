//! Service health overview

use anyhow::Result;
use colored::Colorize;
use recommender_lib::ComponentStatus;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{color_status, print_json, print_warning, OutputFormat};

#[derive(Tabled)]
struct ComponentRow {
    #[tabled(rename = "Component")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Message")]
    message: String,
}

fn status_name(status: ComponentStatus) -> &'static str {
    match status {
        ComponentStatus::Healthy => "healthy",
        ComponentStatus::Degraded => "degraded",
        ComponentStatus::Unhealthy => "unhealthy",
    }
}

/// Show overall and per-component health of the service
pub async fn show_status(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let health = client.health().await?;

    match format {
        OutputFormat::Json => print_json(&health)?,
        OutputFormat::Table => {
            println!("{}", "Service Status".bold());
            println!("{}", "=".repeat(50));
            println!("Overall:    {}", color_status(status_name(health.status)));
            println!();

            let rows: Vec<ComponentRow> = health
                .components
                .iter()
                .map(|(name, component)| ComponentRow {
                    name: name.clone(),
                    status: color_status(status_name(component.status)),
                    message: component.message.clone().unwrap_or_default(),
                })
                .collect();

            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);

            if health.status == ComponentStatus::Unhealthy {
                print_warning("Predictions will fail until unhealthy components recover");
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_name_matches_wire_format() {
        for status in [
            ComponentStatus::Healthy,
            ComponentStatus::Degraded,
            ComponentStatus::Unhealthy,
        ] {
            let wire = serde_json::to_value(status).unwrap();
            assert_eq!(wire, status_name(status));
        }
    }
}
