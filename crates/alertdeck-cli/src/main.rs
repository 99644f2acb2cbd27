mod bootstrap_helpers;
mod cli_args;
mod render;
mod watch_mode;

use std::sync::Arc;

use alertdeck_api::{AlertApi, AlertApiClient, AlertTransition};
use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;

use crate::bootstrap_helpers::init_tracing;
use crate::cli_args::{Cli, CliCommand};
use crate::render::{
    render_alert_detail, render_alert_table, render_alerts_chart, render_health_badge,
    render_summary_cards,
};
use crate::watch_mode::run_watch;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    run_cli(cli).await
}

async fn run_cli(cli: Cli) -> Result<()> {
    let client = AlertApiClient::new(&cli.api_base_url, cli.request_timeout_ms)
        .context("failed to configure alert API client")?;

    match cli.command {
        CliCommand::Health => {
            let status = client.get_health().await?;
            if cli.json {
                println!("{}", json!({ "status": status }));
            } else {
                println!("{} ({status})", render_health_badge(&status));
            }
        }
        CliCommand::Alerts { limit } => {
            let alerts = client.list_alerts(limit).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&alerts)?);
            } else {
                println!("{}", render_alert_table(&alerts, &[]));
            }
        }
        CliCommand::Summary => {
            let summary = client.get_summary().await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("{}", render_summary_cards(&summary));
                println!();
                println!("{}", render_alerts_chart(&summary.alerts_over_time));
            }
        }
        CliCommand::Ack { alert_id } => {
            run_transition(&client, AlertTransition::Acknowledge, &alert_id, cli.json).await?;
        }
        CliCommand::Suppress { alert_id } => {
            run_transition(&client, AlertTransition::Suppress, &alert_id, cli.json).await?;
        }
        CliCommand::StreamUrl => {
            println!("{}", client.stream_endpoint());
        }
        CliCommand::Watch(args) => {
            run_watch(Arc::new(client), &args).await?;
        }
    }
    Ok(())
}

async fn run_transition(
    client: &AlertApiClient,
    transition: AlertTransition,
    alert_key: &str,
    json_output: bool,
) -> Result<()> {
    let alert_key = alert_key.trim();
    anyhow::ensure!(!alert_key.is_empty(), "alert id must not be blank");
    let alert = client
        .transition(transition, alert_key)
        .await
        .with_context(|| format!("failed to {} {alert_key}", transition.as_str()))?;
    if json_output {
        println!("{}", serde_json::to_string_pretty(&alert)?);
    } else {
        println!("{}", render_alert_detail(&alert));
    }
    Ok(())
}
