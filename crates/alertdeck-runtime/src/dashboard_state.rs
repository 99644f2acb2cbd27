use alertdeck_api::{Alert, Summary};

pub const HEALTH_UNKNOWN: &str = "unknown";
pub const HEALTH_HEALTHY: &str = "healthy";
pub const HEALTH_UNHEALTHY: &str = "unhealthy";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Live stream connection state. `Closed` always has a reconnection pending
/// while the runtime is active.
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Open,
    Closed,
}

impl ConnectionState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoticeKind {
    /// Bootstrap or poll failure; stays until the next successful poll.
    Backend,
    /// Stream failure; cleared once the stream reopens.
    Transport,
    /// Failed acknowledge/suppress; cleared by the next successful action.
    Action,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Everything a presentation layer needs to draw the dashboard.
pub struct DashboardSnapshot {
    pub alerts: Vec<Alert>,
    pub summary: Summary,
    pub health: String,
    pub connection: ConnectionState,
    pub busy_keys: Vec<String>,
    pub notice: Option<Notice>,
    pub connection_attempts: u64,
}

impl Default for DashboardSnapshot {
    fn default() -> Self {
        Self {
            alerts: Vec::new(),
            summary: Summary::default(),
            health: HEALTH_UNKNOWN.to_string(),
            connection: ConnectionState::Disconnected,
            busy_keys: Vec::new(),
            notice: None,
            connection_attempts: 0,
        }
    }
}

impl DashboardSnapshot {
    pub fn is_healthy(&self) -> bool {
        self.health == HEALTH_HEALTHY
    }

    pub fn latest_timestamp(&self) -> Option<&str> {
        self.alerts.first().map(|alert| alert.timestamp.as_str())
    }

    pub fn is_busy(&self, alert_key: &str) -> bool {
        self.busy_keys.iter().any(|key| key == alert_key)
    }

    pub fn alert(&self, id: u64) -> Option<&Alert> {
        self.alerts.iter().find(|alert| alert.id == id)
    }
}
