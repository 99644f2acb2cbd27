use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
/// Lifecycle status of an alert as reported by the backend.
pub enum AlertStatus {
    Open,
    Acknowledged,
    Suppressed,
}

impl AlertStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Acknowledged => "ACKNOWLEDGED",
            Self::Suppressed => "SUPPRESSED",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
/// One version of a backend alert record.
///
/// `id` is the server-assigned surrogate key and grows monotonically; `alert_id`
/// is the business key and stays `None` until the backend registers the alert.
/// Only alerts carrying an `alert_id` can be acknowledged or suppressed.
pub struct Alert {
    pub id: u64,
    #[serde(default)]
    pub alert_id: Option<String>,
    pub timestamp: String,
    #[serde(default)]
    pub alert_generated_at: Option<String>,
    pub alert_type: String,
    pub severity: String,
    #[serde(default)]
    pub description: String,
    pub source_service: String,
    #[serde(default)]
    pub source_trace_id: Option<String>,
    #[serde(default)]
    pub offending_ip: Option<String>,
    pub status: AlertStatus,
    #[serde(default)]
    pub acknowledged_at: Option<String>,
    #[serde(default)]
    pub suppressed_at: Option<String>,
    pub updated_at: String,
}

impl Alert {
    /// Returns the business key when it is present and non-blank.
    pub fn business_key(&self) -> Option<&str> {
        self.alert_id
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    pub fn can_acknowledge(&self) -> bool {
        self.status == AlertStatus::Open && self.business_key().is_some()
    }

    pub fn can_suppress(&self) -> bool {
        self.status != AlertStatus::Suppressed && self.business_key().is_some()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TopService {
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AlertCountPoint {
    pub timestamp: String,
    pub count: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
/// Aggregate alert metrics served by `/metrics/summary`.
///
/// Fetched on its own schedule, so it can lag behind the alert collection.
pub struct Summary {
    #[serde(default)]
    pub total_alerts: u64,
    #[serde(default)]
    pub critical_alerts: u64,
    #[serde(default)]
    pub open_alerts: u64,
    #[serde(default)]
    pub acknowledged_alerts: u64,
    #[serde(default)]
    pub suppressed_alerts: u64,
    #[serde(default)]
    pub top_service_by_alerts: TopService,
    #[serde(default)]
    pub alerts_over_time: Vec<AlertCountPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// State transitions a client may request for an alert.
pub enum AlertTransition {
    Acknowledge,
    Suppress,
}

impl AlertTransition {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Acknowledge => "acknowledge",
            Self::Suppress => "suppress",
        }
    }

    pub fn target_status(self) -> AlertStatus {
        match self {
            Self::Acknowledge => AlertStatus::Acknowledged,
            Self::Suppress => AlertStatus::Suppressed,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct HealthResponse {
    pub(crate) status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AlertListResponse {
    #[serde(default)]
    pub(crate) items: Vec<Alert>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AlertItemResponse {
    pub(crate) item: Alert,
}

#[derive(Debug, Error)]
/// Failures surfaced by the alert REST client.
pub enum ApiError {
    #[error("invalid api base url '{value}': {reason}")]
    InvalidBaseUrl { value: String, reason: String },
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("{operation} request failed: {source}")]
    Network {
        operation: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{operation} returned non-success status {status}: {body}")]
    Http {
        operation: String,
        status: u16,
        body: String,
    },
    #[error("failed to decode {operation} response: {source}")]
    Decode {
        operation: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ApiError {
    /// Status code for `Http` failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}
