//! Plain-text rendering of dashboard snapshots and one-shot command output.

use alertdeck_api::{Alert, AlertCountPoint, Summary};
use alertdeck_runtime::DashboardSnapshot;
use chrono::{DateTime, NaiveDateTime};

const CHART_BAR_MAX_CELLS: u64 = 30;
const DESCRIPTION_MAX_CHARS: usize = 48;

pub(crate) fn render_dashboard(snapshot: &DashboardSnapshot) -> String {
    let mut lines = Vec::new();
    lines.push("Automated Response Dashboard".to_string());
    lines.push(format!(
        "{} | stream: {} | latest alert: {}",
        render_health_badge(&snapshot.health),
        snapshot.connection.as_str(),
        snapshot
            .latest_timestamp()
            .map(format_timestamp)
            .unwrap_or_else(|| "N/A".to_string())
    ));
    if let Some(notice) = &snapshot.notice {
        lines.push(format!("! {}", notice.message));
    }
    lines.push(String::new());
    lines.push(render_summary_cards(&snapshot.summary));
    lines.push(String::new());
    lines.push(render_alerts_chart(&snapshot.summary.alerts_over_time));
    lines.push(String::new());
    lines.push(render_alert_table(&snapshot.alerts, &snapshot.busy_keys));
    lines.join("\n")
}

pub(crate) fn render_health_badge(status: &str) -> &'static str {
    if status == "healthy" {
        "System Healthy"
    } else {
        "System Unhealthy"
    }
}

pub(crate) fn render_summary_cards(summary: &Summary) -> String {
    let top_service = summary
        .top_service_by_alerts
        .service
        .as_deref()
        .unwrap_or("N/A");
    [
        format!("Total Alerts:          {}", summary.total_alerts),
        format!("Critical Alerts:       {}", summary.critical_alerts),
        format!("Open:                  {}", summary.open_alerts),
        format!("Acknowledged:          {}", summary.acknowledged_alerts),
        format!("Suppressed:            {}", summary.suppressed_alerts),
        format!(
            "Top Service by Alerts: {top_service} ({} alerts)",
            summary.top_service_by_alerts.count
        ),
    ]
    .join("\n")
}

/// Per-minute alert counts as horizontal bars scaled to the busiest minute.
pub(crate) fn render_alerts_chart(points: &[AlertCountPoint]) -> String {
    let mut lines = vec!["Alerts Over Time (per minute)".to_string()];
    if points.is_empty() {
        lines.push("No alerts yet.".to_string());
        return lines.join("\n");
    }
    let max = points.iter().map(|point| point.count).max().unwrap_or(0).max(1);
    for point in points {
        let cells = (point.count.saturating_mul(CHART_BAR_MAX_CELLS) / max).max(1);
        lines.push(format!(
            "{} | {} {}",
            minute_label(&point.timestamp),
            "#".repeat(cells as usize),
            point.count
        ));
    }
    lines.join("\n")
}

pub(crate) fn render_alert_table(alerts: &[Alert], busy_keys: &[String]) -> String {
    if alerts.is_empty() {
        return "Alert Feed\nNo alerts.".to_string();
    }
    let headers = [
        "ID", "SEVERITY", "TYPE", "SERVICE", "STATUS", "TIME", "ACTIONS",
    ];
    let rows = alerts
        .iter()
        .map(|alert| {
            let busy = alert
                .business_key()
                .is_some_and(|key| busy_keys.iter().any(|busy_key| busy_key == key));
            vec![
                alert.id.to_string(),
                alert.severity.clone(),
                alert.alert_type.clone(),
                alert.source_service.clone(),
                alert.status.as_str().to_string(),
                format_timestamp(&alert.timestamp),
                render_actions(alert, busy),
            ]
        })
        .collect::<Vec<_>>();
    format!("Alert Feed\n{}", format_columns(&headers, &rows))
}

pub(crate) fn render_alert_detail(alert: &Alert) -> String {
    let mut lines = vec![format!(
        "{} {} [{}] {} {}",
        alert.id,
        alert.business_key().unwrap_or("-"),
        alert.status.as_str(),
        alert.severity,
        alert.alert_type
    )];
    lines.push(format!(
        "  service={} ip={} trace={}",
        alert.source_service,
        alert.offending_ip.as_deref().unwrap_or("-"),
        alert.source_trace_id.as_deref().unwrap_or("-")
    ));
    if !alert.description.trim().is_empty() {
        lines.push(format!(
            "  {}",
            truncate_chars(alert.description.trim(), DESCRIPTION_MAX_CHARS)
        ));
    }
    lines.join("\n")
}

fn render_actions(alert: &Alert, busy: bool) -> String {
    if busy {
        return "busy".to_string();
    }
    let mut actions = Vec::new();
    if alert.can_acknowledge() {
        actions.push("ack");
    }
    if alert.can_suppress() {
        actions.push("suppress");
    }
    if actions.is_empty() {
        return "-".to_string();
    }
    actions.join(",")
}

fn format_columns(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths = headers
        .iter()
        .map(|header| header.chars().count())
        .collect::<Vec<_>>();
    for row in rows {
        for (index, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(index) {
                *width = (*width).max(cell.chars().count());
            }
        }
    }

    let render_row = |cells: Vec<&str>| {
        cells
            .iter()
            .enumerate()
            .map(|(index, cell)| format!("{cell:<width$}", width = widths[index]))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut lines = vec![render_row(headers.to_vec())];
    for row in rows {
        lines.push(render_row(row.iter().map(String::as_str).collect()));
    }
    lines.join("\n")
}

/// Time-of-day for RFC 3339 or zone-less ISO timestamps; unparseable input is
/// returned unchanged.
pub(crate) fn format_timestamp(value: &str) -> String {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return parsed.format("%H:%M:%S").to_string();
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return parsed.format("%H:%M:%S").to_string();
    }
    value.to_string()
}

fn minute_label(value: &str) -> String {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return parsed.format("%H:%M").to_string();
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return parsed.format("%H:%M").to_string();
    }
    value.chars().skip(11).take(5).collect()
}

fn truncate_chars(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    let mut truncated = value.chars().take(max_chars).collect::<String>();
    truncated.push_str("...");
    truncated
}
