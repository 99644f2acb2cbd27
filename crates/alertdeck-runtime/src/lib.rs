//! Connection lifecycle manager for the alert dashboard.
//!
//! Owns the live alert stream, its reconnection policy, the periodic
//! health/summary poll, bootstrap ordering, and acknowledge/suppress dispatch.
//! Every state change happens on one event loop and is published as a
//! [`DashboardSnapshot`].

pub mod dashboard_runtime;
pub mod dashboard_state;
pub mod stream_transport;

pub use dashboard_runtime::{
    DashboardCommand, DashboardHandle, DashboardRuntime, DashboardRuntimeConfig,
    DEFAULT_POLL_INTERVAL_MS, DEFAULT_RECONNECT_DELAY_MS,
};
pub use dashboard_state::{
    ConnectionState, DashboardSnapshot, Notice, NoticeKind, HEALTH_HEALTHY, HEALTH_UNHEALTHY,
    HEALTH_UNKNOWN,
};
pub use stream_transport::{
    parse_stream_frame, AlertStream, StreamConnector, StreamError, StreamEvent, StreamFrame,
    StreamFrameKind, TungsteniteConnector,
};
