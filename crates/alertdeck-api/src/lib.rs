//! Remote access layer for the alert dashboard backend.
//!
//! Typed request/response helpers for health, paginated alert listing, summary
//! metrics, and the acknowledge/suppress transitions, plus derivation of the
//! live alert stream URL from the REST base.

mod client;
mod types;

pub use client::{
    stream_endpoint_for, AlertApi, AlertApiClient, ALERT_STREAM_PATH, DEFAULT_API_BASE_URL,
    DEFAULT_REQUEST_TIMEOUT_MS,
};
pub use reqwest::Url;
pub use types::{
    Alert, AlertCountPoint, AlertStatus, AlertTransition, ApiError, Summary, TopService,
};
