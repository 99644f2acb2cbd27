//! REST client for the alert backend plus live-stream endpoint derivation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde::de::DeserializeOwned;

use crate::types::{
    Alert, AlertItemResponse, AlertListResponse, AlertTransition, ApiError, HealthResponse,
    Summary,
};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
pub const ALERT_STREAM_PATH: &str = "/ws/alerts";

const ERROR_BODY_MAX_CHARS: usize = 320;

#[async_trait]
/// Typed access to the alert backend.
///
/// `AlertApiClient` is the HTTP implementation; the dashboard runtime only
/// depends on this trait.
pub trait AlertApi: Send + Sync {
    async fn get_health(&self) -> Result<String, ApiError>;

    async fn list_alerts(&self, limit: usize) -> Result<Vec<Alert>, ApiError>;

    async fn get_summary(&self) -> Result<Summary, ApiError>;

    async fn acknowledge(&self, alert_key: &str) -> Result<Alert, ApiError>;

    async fn suppress(&self, alert_key: &str) -> Result<Alert, ApiError>;

    /// URL of the live alert stream.
    fn stream_endpoint(&self) -> Url;

    async fn transition(
        &self,
        transition: AlertTransition,
        alert_key: &str,
    ) -> Result<Alert, ApiError> {
        match transition {
            AlertTransition::Acknowledge => self.acknowledge(alert_key).await,
            AlertTransition::Suppress => self.suppress(alert_key).await,
        }
    }
}

#[derive(Clone)]
pub struct AlertApiClient {
    http: reqwest::Client,
    base_url: Url,
}

impl AlertApiClient {
    pub fn new(api_base: &str, request_timeout_ms: u64) -> Result<Self, ApiError> {
        let trimmed = api_base.trim();
        let base_url = parse_api_base(trimmed)?;

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("alertdeck"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(request_timeout_ms.max(1)))
            .build()
            .map_err(ApiError::Client)?;

        Ok(Self { http, base_url })
    }

    /// Appends percent-encoded path segments to the base URL, keeping any
    /// path prefix the base carries.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.set_query(None);
        url.set_fragment(None);
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidBaseUrl {
                value: self.base_url.to_string(),
                reason: "base url cannot carry a path".to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub(crate) fn transition_endpoint(
        &self,
        transition: AlertTransition,
        alert_key: &str,
    ) -> Result<Url, ApiError> {
        self.endpoint(&["alerts", alert_key.trim(), transition.as_str()])
    }

    async fn request_json<T>(
        &self,
        operation: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        let response = request.send().await.map_err(|source| ApiError::Network {
            operation: operation.to_string(),
            source,
        })?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(
                operation,
                status = status.as_u16(),
                "alert api returned non-success status"
            );
            return Err(ApiError::Http {
                operation: operation.to_string(),
                status: status.as_u16(),
                body: truncate_for_error(&body, ERROR_BODY_MAX_CHARS),
            });
        }
        let bytes = response.bytes().await.map_err(|source| ApiError::Network {
            operation: operation.to_string(),
            source,
        })?;
        serde_json::from_slice::<T>(&bytes).map_err(|source| ApiError::Decode {
            operation: operation.to_string(),
            source,
        })
    }
}

#[async_trait]
impl AlertApi for AlertApiClient {
    async fn get_health(&self) -> Result<String, ApiError> {
        let response: HealthResponse = self
            .request_json("health", self.http.get(self.endpoint(&["health"])?))
            .await?;
        Ok(response.status)
    }

    async fn list_alerts(&self, limit: usize) -> Result<Vec<Alert>, ApiError> {
        let response: AlertListResponse = self
            .request_json(
                "list alerts",
                self.http
                    .get(self.endpoint(&["alerts"])?)
                    .query(&[("limit", limit)]),
            )
            .await?;
        Ok(response.items)
    }

    async fn get_summary(&self) -> Result<Summary, ApiError> {
        self.request_json(
            "summary",
            self.http.get(self.endpoint(&["metrics", "summary"])?),
        )
        .await
    }

    async fn acknowledge(&self, alert_key: &str) -> Result<Alert, ApiError> {
        self.post_transition(AlertTransition::Acknowledge, alert_key)
            .await
    }

    async fn suppress(&self, alert_key: &str) -> Result<Alert, ApiError> {
        self.post_transition(AlertTransition::Suppress, alert_key)
            .await
    }

    fn stream_endpoint(&self) -> Url {
        stream_endpoint_for(&self.base_url)
    }
}

impl AlertApiClient {
    async fn post_transition(
        &self,
        transition: AlertTransition,
        alert_key: &str,
    ) -> Result<Alert, ApiError> {
        let url = self.transition_endpoint(transition, alert_key)?;
        let response: AlertItemResponse = self
            .request_json(transition.as_str(), self.http.post(url))
            .await?;
        Ok(response.item)
    }
}

/// Derives the live-stream URL from a REST base: `https` maps to `wss`, anything
/// else to `ws`, and the path is replaced with [`ALERT_STREAM_PATH`].
pub fn stream_endpoint_for(base_url: &Url) -> Url {
    let mut endpoint = base_url.clone();
    let scheme = if base_url.scheme() == "https" {
        "wss"
    } else {
        "ws"
    };
    // http(s) -> ws(s) is always accepted between special schemes.
    let _ = endpoint.set_scheme(scheme);
    endpoint.set_path(ALERT_STREAM_PATH);
    endpoint
}

fn parse_api_base(value: &str) -> Result<Url, ApiError> {
    let parsed = Url::parse(value).map_err(|error| ApiError::InvalidBaseUrl {
        value: value.to_string(),
        reason: error.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(ApiError::InvalidBaseUrl {
            value: value.to_string(),
            reason: format!("unsupported scheme '{other}', expected http or https"),
        }),
    }
}

fn truncate_for_error(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated = text.chars().take(max_chars).collect::<String>();
    truncated.push_str("...");
    truncated
}
