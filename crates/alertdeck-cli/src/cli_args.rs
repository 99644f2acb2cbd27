use alertdeck_api::{DEFAULT_API_BASE_URL, DEFAULT_REQUEST_TIMEOUT_MS};
use alertdeck_core::MAX_ALERTS;
use alertdeck_runtime::{DEFAULT_POLL_INTERVAL_MS, DEFAULT_RECONNECT_DELAY_MS};
use clap::{Args, Parser, Subcommand};

fn parse_positive_usize(value: &str) -> Result<usize, String> {
    let parsed = value
        .parse::<usize>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

fn parse_positive_u64(value: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

#[derive(Debug, Parser)]
#[command(
    name = "alertdeck",
    about = "Terminal client for the automated alert response dashboard",
    version
)]
pub(crate) struct Cli {
    #[arg(
        long,
        global = true,
        env = "ALERTDECK_API_BASE_URL",
        default_value = DEFAULT_API_BASE_URL,
        help = "Base URL of the alert REST API. The live stream URL is derived from it."
    )]
    pub(crate) api_base_url: String,

    #[arg(
        long,
        global = true,
        env = "ALERTDECK_REQUEST_TIMEOUT_MS",
        default_value_t = DEFAULT_REQUEST_TIMEOUT_MS,
        value_parser = parse_positive_u64,
        help = "Timeout applied to each REST request in milliseconds"
    )]
    pub(crate) request_timeout_ms: u64,

    #[arg(
        long,
        global = true,
        help = "Print raw JSON instead of the text rendering for one-shot commands"
    )]
    pub(crate) json: bool,

    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

#[derive(Debug, Subcommand, PartialEq, Eq)]
pub(crate) enum CliCommand {
    /// Show backend health status.
    Health,
    /// List the most recent alerts.
    Alerts {
        #[arg(long, default_value_t = MAX_ALERTS, value_parser = parse_positive_usize)]
        limit: usize,
    },
    /// Show summary metrics.
    Summary,
    /// Acknowledge an alert by business key.
    Ack { alert_id: String },
    /// Suppress an alert by business key.
    Suppress { alert_id: String },
    /// Print the live alert stream URL derived from the API base URL.
    StreamUrl,
    /// Run the live dashboard.
    Watch(WatchArgs),
}

#[derive(Debug, Args, PartialEq, Eq)]
pub(crate) struct WatchArgs {
    #[arg(
        long,
        env = "ALERTDECK_RECONNECT_DELAY_MS",
        default_value_t = DEFAULT_RECONNECT_DELAY_MS,
        value_parser = parse_positive_u64,
        help = "Delay before reopening a closed live stream in milliseconds"
    )]
    pub(crate) reconnect_delay_ms: u64,

    #[arg(
        long,
        env = "ALERTDECK_POLL_INTERVAL_MS",
        default_value_t = DEFAULT_POLL_INTERVAL_MS,
        value_parser = parse_positive_u64,
        help = "Health and summary polling interval in milliseconds"
    )]
    pub(crate) poll_interval_ms: u64,
}
