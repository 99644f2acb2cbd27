//! Interactive `watch` mode: renders every snapshot change and reads operator
//! commands from stdin.

use std::{sync::Arc, time::Duration};

use alertdeck_api::{Alert, AlertApi};
use alertdeck_runtime::{
    DashboardHandle, DashboardRuntime, DashboardRuntimeConfig, DashboardSnapshot,
    TungsteniteConnector,
};
use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

use crate::cli_args::WatchArgs;
use crate::render::render_dashboard;

const WATCH_USAGE: &str = "commands: ack <id> | suppress <id> | refresh | help | quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WatchCommand {
    Acknowledge(u64),
    Suppress(u64),
    Refresh,
    Help,
    Quit,
}

fn parse_watch_command(line: &str) -> Result<Option<WatchCommand>, String> {
    let mut parts = line.split_whitespace();
    let Some(verb) = parts.next() else {
        return Ok(None);
    };
    let argument = parts.next();
    if parts.next().is_some() {
        return Err(format!("too many arguments; {WATCH_USAGE}"));
    }
    let parse_id = |argument: Option<&str>| -> Result<u64, String> {
        let raw = argument.ok_or_else(|| format!("missing alert id; {WATCH_USAGE}"))?;
        raw.parse::<u64>()
            .map_err(|_| format!("invalid alert id '{raw}'"))
    };
    let command = match verb.to_ascii_lowercase().as_str() {
        "ack" | "acknowledge" => WatchCommand::Acknowledge(parse_id(argument)?),
        "suppress" => WatchCommand::Suppress(parse_id(argument)?),
        "refresh" => WatchCommand::Refresh,
        "help" | "?" => WatchCommand::Help,
        "quit" | "exit" | "q" => WatchCommand::Quit,
        other => return Err(format!("unknown command '{other}'; {WATCH_USAGE}")),
    };
    if argument.is_some()
        && matches!(
            command,
            WatchCommand::Refresh | WatchCommand::Help | WatchCommand::Quit
        )
    {
        return Err(format!("'{verb}' takes no arguments"));
    }
    Ok(Some(command))
}

/// Finds a displayed alert that can accept an action request.
fn resolve_action_target(snapshot: &DashboardSnapshot, id: u64) -> Result<&Alert, String> {
    let alert = snapshot
        .alert(id)
        .ok_or_else(|| format!("alert {id} is not on the dashboard"))?;
    let Some(alert_key) = alert.business_key() else {
        return Err(format!("alert {id} has no alert id yet"));
    };
    if snapshot.is_busy(alert_key) {
        return Err(format!("an action for {alert_key} is already in flight"));
    }
    Ok(alert)
}

/// Returns `false` when the operator asked to leave.
fn dispatch_watch_command(handle: &DashboardHandle, command: WatchCommand) -> Result<bool> {
    match command {
        WatchCommand::Acknowledge(id) | WatchCommand::Suppress(id) => {
            let snapshot = handle.snapshot();
            match resolve_action_target(&snapshot, id) {
                Ok(alert) if matches!(command, WatchCommand::Acknowledge(_)) => {
                    handle.acknowledge(alert)?
                }
                Ok(alert) => handle.suppress(alert)?,
                Err(message) => eprintln!("{message}"),
            }
        }
        WatchCommand::Refresh => handle.refresh()?,
        WatchCommand::Help => eprintln!("{WATCH_USAGE}"),
        WatchCommand::Quit => return Ok(false),
    }
    Ok(true)
}

pub(crate) async fn run_watch(api: Arc<dyn AlertApi>, args: &WatchArgs) -> Result<()> {
    let mut config = DashboardRuntimeConfig::new(api, Arc::new(TungsteniteConnector));
    config.reconnect_delay = Duration::from_millis(args.reconnect_delay_ms);
    config.poll_interval = Duration::from_millis(args.poll_interval_ms);

    let (runtime, handle) = DashboardRuntime::new(config);
    let mut snapshots = handle.subscribe();
    let runtime_task = tokio::spawn(runtime.run());

    println!("{}", render_dashboard(&snapshots.borrow_and_update()));
    eprintln!("{WATCH_USAGE}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                println!();
                println!("{}", render_dashboard(&snapshots.borrow_and_update()));
            }
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => match parse_watch_command(&line) {
                    Ok(Some(command)) => {
                        if !dispatch_watch_command(&handle, command)? {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(message) => eprintln!("{message}"),
                },
                Ok(None) => {
                    debug!("stdin closed; watch continues until interrupted");
                    stdin_open = false;
                }
                Err(error) => {
                    warn!("failed to read watch command: {error}");
                    stdin_open = false;
                }
            },
        }
    }

    if handle.shutdown().is_err() {
        debug!("dashboard runtime already stopped");
    }
    let final_snapshot = runtime_task
        .await
        .context("dashboard runtime task failed")?;
    debug!(
        alerts = final_snapshot.alerts.len(),
        connection_attempts = final_snapshot.connection_attempts,
        "watch finished"
    );
    Ok(())
}
