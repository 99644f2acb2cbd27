//! Tests for dashboard runtime lifecycle, reconciliation wiring, and actions.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use alertdeck_api::{Alert, AlertApi, AlertStatus, ApiError, Summary, TopService, Url};
use async_trait::async_trait;
use serde_json::json;
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
    time::{sleep, sleep_until, timeout, Instant},
};

use super::{DashboardHandle, DashboardRuntime, DashboardRuntimeConfig};
use crate::dashboard_state::{ConnectionState, DashboardSnapshot, NoticeKind};
use crate::stream_transport::{AlertStream, StreamConnector, StreamError, StreamEvent};

fn alert(id: u64, alert_key: Option<&str>, status: AlertStatus) -> Alert {
    Alert {
        id,
        alert_id: alert_key.map(str::to_string),
        timestamp: format!("2026-10-15T10:{:02}:00", id % 60),
        alert_generated_at: None,
        alert_type: "AUTH_FAILURE_BURST".to_string(),
        severity: "HIGH".to_string(),
        description: format!("alert {id}"),
        source_service: "auth-service".to_string(),
        source_trace_id: None,
        offending_ip: Some("10.1.2.3".to_string()),
        status,
        acknowledged_at: None,
        suppressed_at: None,
        updated_at: "2026-10-15T10:00:00".to_string(),
    }
}

fn open(id: u64) -> Alert {
    alert(id, Some(&format!("ALERT-{id}")), AlertStatus::Open)
}

fn frame(kind: &str, items: &[Alert]) -> StreamEvent {
    StreamEvent::Text(json!({ "type": kind, "items": items }).to_string())
}

fn ids(snapshot: &DashboardSnapshot) -> Vec<u64> {
    snapshot.alerts.iter().map(|alert| alert.id).collect()
}

fn http_error(operation: &str, status: u16) -> ApiError {
    ApiError::Http {
        operation: operation.to_string(),
        status,
        body: String::new(),
    }
}

struct FakeBackend {
    alerts: Vec<Alert>,
    list_status: Option<u16>,
    list_delay: Duration,
    health: String,
    summary: Summary,
    poll_status: Option<u16>,
    transitions: HashMap<String, Result<Alert, u16>>,
    transition_delay: Duration,
    panicking_keys: Vec<String>,
    panicking_connects: u64,
    log: Vec<String>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self {
            alerts: Vec::new(),
            list_status: None,
            list_delay: Duration::ZERO,
            health: "healthy".to_string(),
            summary: Summary::default(),
            poll_status: None,
            transitions: HashMap::new(),
            transition_delay: Duration::ZERO,
            panicking_keys: Vec::new(),
            panicking_connects: 0,
            log: Vec::new(),
        }
    }
}

struct FakeApi {
    backend: Arc<Mutex<FakeBackend>>,
}

impl FakeApi {
    async fn transition_result(&self, action: &str, alert_key: &str) -> Result<Alert, ApiError> {
        let (delay, panics, result) = {
            let mut backend = self.backend.lock().expect("backend lock");
            backend.log.push(format!("{action}:{alert_key}"));
            (
                backend.transition_delay,
                backend.panicking_keys.iter().any(|key| key == alert_key),
                backend.transitions.get(alert_key).cloned(),
            )
        };
        if !delay.is_zero() {
            sleep(delay).await;
        }
        if panics {
            panic!("transition handler crashed for {alert_key}");
        }
        match result {
            Some(Ok(alert)) => Ok(alert),
            Some(Err(status)) => Err(http_error(action, status)),
            None => Err(http_error(action, 404)),
        }
    }
}

#[async_trait]
impl AlertApi for FakeApi {
    async fn get_health(&self) -> Result<String, ApiError> {
        let mut backend = self.backend.lock().expect("backend lock");
        backend.log.push("health".to_string());
        match backend.poll_status {
            Some(status) => Err(http_error("health", status)),
            None => Ok(backend.health.clone()),
        }
    }

    async fn list_alerts(&self, limit: usize) -> Result<Vec<Alert>, ApiError> {
        let delay = {
            let mut backend = self.backend.lock().expect("backend lock");
            backend.log.push("list_alerts".to_string());
            backend.list_delay
        };
        if !delay.is_zero() {
            sleep(delay).await;
        }
        let mut backend = self.backend.lock().expect("backend lock");
        backend.log.push("list_alerts_resolved".to_string());
        match backend.list_status {
            Some(status) => Err(http_error("list alerts", status)),
            None => Ok(backend.alerts.iter().take(limit).cloned().collect()),
        }
    }

    async fn get_summary(&self) -> Result<Summary, ApiError> {
        let mut backend = self.backend.lock().expect("backend lock");
        backend.log.push("summary".to_string());
        match backend.poll_status {
            Some(status) => Err(http_error("summary", status)),
            None => Ok(backend.summary.clone()),
        }
    }

    async fn acknowledge(&self, alert_key: &str) -> Result<Alert, ApiError> {
        self.transition_result("acknowledge", alert_key).await
    }

    async fn suppress(&self, alert_key: &str) -> Result<Alert, ApiError> {
        self.transition_result("suppress", alert_key).await
    }

    fn stream_endpoint(&self) -> Url {
        Url::parse("ws://alerts.test/ws/alerts").expect("stream url")
    }
}

struct FakeConnector {
    backend: Arc<Mutex<FakeBackend>>,
    attempts: AtomicU64,
    failing_attempts: u64,
    senders: Mutex<Vec<Option<mpsc::UnboundedSender<StreamEvent>>>>,
}

impl FakeConnector {
    fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }

    fn send(&self, connection: usize, event: StreamEvent) {
        let senders = self.senders.lock().expect("senders lock");
        senders
            .get(connection)
            .and_then(Option::as_ref)
            .expect("open connection")
            .send(event)
            .expect("stream receiver alive");
    }

    fn drop_connection(&self, connection: usize) {
        let mut senders = self.senders.lock().expect("senders lock");
        if let Some(slot) = senders.get_mut(connection) {
            slot.take();
        }
    }
}

#[async_trait]
impl StreamConnector for FakeConnector {
    async fn connect(&self, _url: &Url) -> Result<Box<dyn AlertStream>, StreamError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        let panicking_connects = {
            let mut backend = self.backend.lock().expect("backend lock");
            backend.log.push("connect".to_string());
            backend.panicking_connects
        };
        if attempt <= panicking_connects {
            panic!("connector crashed on attempt {attempt}");
        }
        if attempt <= self.failing_attempts {
            return Err(StreamError::Transport("connection refused".to_string()));
        }
        let (sender, events) = mpsc::unbounded_channel();
        self.senders.lock().expect("senders lock").push(Some(sender));
        Ok(Box::new(FakeStream {
            events,
            backend: Arc::clone(&self.backend),
        }))
    }
}

struct FakeStream {
    events: mpsc::UnboundedReceiver<StreamEvent>,
    backend: Arc<Mutex<FakeBackend>>,
}

#[async_trait]
impl AlertStream for FakeStream {
    async fn next_event(&mut self) -> StreamEvent {
        self.events.recv().await.unwrap_or(StreamEvent::Closed)
    }

    async fn close(&mut self) {
        self.backend
            .lock()
            .expect("backend lock")
            .log
            .push("close".to_string());
        self.events.close();
    }
}

struct Harness {
    backend: Arc<Mutex<FakeBackend>>,
    connector: Arc<FakeConnector>,
    handle: DashboardHandle,
    snapshots: watch::Receiver<DashboardSnapshot>,
    join: JoinHandle<DashboardSnapshot>,
}

impl Harness {
    fn start(backend: FakeBackend) -> Self {
        Self::start_with_failures(backend, 0)
    }

    fn start_with_failures(backend: FakeBackend, failing_attempts: u64) -> Self {
        let backend = Arc::new(Mutex::new(backend));
        let connector = Arc::new(FakeConnector {
            backend: Arc::clone(&backend),
            attempts: AtomicU64::new(0),
            failing_attempts,
            senders: Mutex::new(Vec::new()),
        });
        let api = Arc::new(FakeApi {
            backend: Arc::clone(&backend),
        });
        let config = DashboardRuntimeConfig::new(api, connector.clone());
        let (runtime, handle) = DashboardRuntime::new(config);
        let snapshots = handle.subscribe();
        let join = tokio::spawn(runtime.run());
        Self {
            backend,
            connector,
            handle,
            snapshots,
            join,
        }
    }

    async fn wait_for<F>(&mut self, description: &str, predicate: F) -> DashboardSnapshot
    where
        F: FnMut(&DashboardSnapshot) -> bool,
    {
        match timeout(Duration::from_secs(120), self.snapshots.wait_for(predicate)).await {
            Ok(Ok(snapshot)) => snapshot.clone(),
            _ => panic!("timed out waiting for {description}"),
        }
    }

    async fn wait_open(&mut self) -> DashboardSnapshot {
        self.wait_for("open stream", |snapshot| {
            snapshot.connection == ConnectionState::Open
        })
        .await
    }

    fn log(&self) -> Vec<String> {
        self.backend.lock().expect("backend lock").log.clone()
    }

    fn count(&self, entry: &str) -> usize {
        self.log().iter().filter(|logged| *logged == entry).count()
    }

    fn with_backend(&self, update: impl FnOnce(&mut FakeBackend)) {
        update(&mut self.backend.lock().expect("backend lock"));
    }
}

fn seeded_backend() -> FakeBackend {
    FakeBackend {
        alerts: vec![open(3), open(7), open(5)],
        summary: Summary {
            total_alerts: 3,
            open_alerts: 3,
            top_service_by_alerts: TopService {
                service: Some("auth-service".to_string()),
                count: 3,
            },
            ..Summary::default()
        },
        ..FakeBackend::default()
    }
}

#[tokio::test(start_paused = true)]
async fn functional_bootstrap_seeds_collection_before_polling_and_streaming() {
    let mut harness = Harness::start(seeded_backend());
    let snapshot = harness
        .wait_for("bootstrap complete", |snapshot| {
            snapshot.connection == ConnectionState::Open && snapshot.is_healthy()
        })
        .await;

    assert_eq!(ids(&snapshot), vec![7, 5, 3]);
    assert_eq!(snapshot.summary.total_alerts, 3);
    assert_eq!(snapshot.notice, None);
    assert_eq!(snapshot.connection_attempts, 1);
    assert_eq!(snapshot.latest_timestamp(), Some("2026-10-15T10:07:00"));

    let log = harness.log();
    assert_eq!(log.first().map(String::as_str), Some("list_alerts"));
    let position = |entry: &str| log.iter().position(|logged| logged == entry);
    assert!(position("health") > position("list_alerts"));
    assert!(position("summary") > position("list_alerts"));
    assert!(position("connect") > position("list_alerts"));
}

#[tokio::test(start_paused = true)]
async fn regression_slow_first_page_defers_polling_until_bootstrap_resolves() {
    let mut backend = seeded_backend();
    backend.list_delay = Duration::from_secs(15);
    let mut harness = Harness::start(backend);
    harness.handle.refresh().expect("refresh sent");

    sleep(Duration::from_secs(12)).await;
    assert_eq!(harness.log(), vec!["list_alerts"]);
    assert_eq!(harness.connector.attempts(), 0);

    let snapshot = harness
        .wait_for("bootstrap complete", |snapshot| {
            snapshot.connection == ConnectionState::Open && snapshot.is_healthy()
        })
        .await;
    let loaded_at = Instant::now();
    assert_eq!(ids(&snapshot), vec![7, 5, 3]);
    let log = harness.log();
    assert_eq!(log[..2], ["list_alerts", "list_alerts_resolved"]);
    assert_eq!(harness.count("health"), 1);
    assert_eq!(harness.count("summary"), 1);

    sleep_until(loaded_at + Duration::from_millis(9_990)).await;
    assert_eq!(harness.count("health"), 1);
    sleep_until(loaded_at + Duration::from_millis(10_010)).await;
    assert_eq!(harness.count("health"), 2);
}

#[tokio::test(start_paused = true)]
async fn functional_stream_frames_reconcile_into_collection() {
    let mut harness = Harness::start(seeded_backend());
    harness.wait_open().await;

    let acknowledged = alert(7, Some("ALERT-7"), AlertStatus::Acknowledged);
    harness
        .connector
        .send(0, frame("delta", &[open(9), acknowledged.clone()]));
    let snapshot = harness
        .wait_for("delta applied", |snapshot| snapshot.alerts.len() == 4)
        .await;

    assert_eq!(ids(&snapshot), vec![9, 7, 5, 3]);
    assert_eq!(snapshot.alert(7), Some(&acknowledged));

    harness
        .connector
        .send(0, frame("snapshot", &[open(5), open(4)]));
    let snapshot = harness
        .wait_for("snapshot applied", |snapshot| snapshot.alerts.len() == 5)
        .await;
    assert_eq!(ids(&snapshot), vec![9, 7, 5, 4, 3]);
}

#[tokio::test(start_paused = true)]
async fn regression_malformed_stream_frame_is_dropped_silently() {
    let mut harness = Harness::start(seeded_backend());
    let before = harness.wait_open().await;

    harness
        .connector
        .send(0, StreamEvent::Text("{\"type\":\"delta\",".to_string()));
    harness
        .connector
        .send(0, StreamEvent::Text("[1,2,3]".to_string()));
    harness.connector.send(0, frame("delta", &[open(11)]));

    let after = harness
        .wait_for("valid frame after malformed ones", |snapshot| {
            snapshot.alert(11).is_some()
        })
        .await;
    assert_eq!(after.alerts[1..], before.alerts[..]);
    assert_eq!(after.connection, ConnectionState::Open);
    assert_eq!(after.notice, None);
    assert_eq!(after.connection_attempts, 1);
}

#[tokio::test(start_paused = true)]
async fn integration_stream_close_reconnects_exactly_once_after_delay() {
    let mut harness = Harness::start(seeded_backend());
    harness.wait_open().await;
    assert_eq!(harness.connector.attempts(), 1);

    let closed_at = Instant::now();
    harness.connector.drop_connection(0);
    harness
        .wait_for("closed pending retry", |snapshot| {
            snapshot.connection == ConnectionState::Closed
        })
        .await;

    sleep_until(closed_at + Duration::from_millis(1_999)).await;
    assert_eq!(harness.connector.attempts(), 1);

    sleep_until(closed_at + Duration::from_millis(2_001)).await;
    assert_eq!(harness.connector.attempts(), 2);

    let snapshot = harness.wait_open().await;
    assert_eq!(snapshot.connection_attempts, 2);

    sleep(Duration::from_secs(30)).await;
    assert_eq!(harness.connector.attempts(), 2);
}

#[tokio::test(start_paused = true)]
async fn regression_failed_connection_attempt_surfaces_notice_and_retries() {
    let mut harness = Harness::start_with_failures(seeded_backend(), 1);
    let failed = harness
        .wait_for("transport notice", |snapshot| {
            snapshot.connection == ConnectionState::Closed && snapshot.notice.is_some()
        })
        .await;
    assert_eq!(
        failed.notice.as_ref().map(|notice| notice.kind),
        Some(NoticeKind::Transport)
    );
    assert_eq!(ids(&failed), vec![7, 5, 3]);

    let recovered = harness.wait_open().await;
    assert_eq!(recovered.notice, None);
    assert_eq!(recovered.connection_attempts, 2);
    assert_eq!(harness.connector.attempts(), 2);
}

#[tokio::test(start_paused = true)]
async fn regression_crashed_connection_attempt_still_schedules_reconnect() {
    let mut backend = seeded_backend();
    backend.panicking_connects = 1;
    let mut harness = Harness::start(backend);
    let failed = harness
        .wait_for("transport notice after crash", |snapshot| {
            snapshot.connection == ConnectionState::Closed && snapshot.notice.is_some()
        })
        .await;
    assert_eq!(
        failed.notice.as_ref().map(|notice| notice.kind),
        Some(NoticeKind::Transport)
    );

    let recovered = harness.wait_open().await;
    assert_eq!(recovered.connection_attempts, 2);
    assert_eq!(recovered.notice, None);
    assert_eq!(harness.connector.attempts(), 2);
}

#[tokio::test(start_paused = true)]
async fn functional_transport_error_surfaces_notice_without_closing() {
    let mut harness = Harness::start(seeded_backend());
    harness.wait_open().await;

    harness
        .connector
        .send(0, StreamEvent::Error("connection reset".to_string()));
    let errored = harness
        .wait_for("transport notice", |snapshot| snapshot.notice.is_some())
        .await;
    assert_eq!(errored.connection, ConnectionState::Open);
    assert_eq!(
        errored.notice.as_ref().map(|notice| notice.kind),
        Some(NoticeKind::Transport)
    );

    harness.connector.drop_connection(0);
    let reopened = harness
        .wait_for("reopened stream", |snapshot| {
            snapshot.connection == ConnectionState::Open && snapshot.connection_attempts == 2
        })
        .await;
    assert_eq!(reopened.notice, None);
}

#[tokio::test(start_paused = true)]
async fn functional_acknowledge_applies_result_and_refreshes_summary() {
    let mut backend = seeded_backend();
    let mut acknowledged = alert(7, Some("ALERT-7"), AlertStatus::Acknowledged);
    acknowledged.acknowledged_at = Some("2026-10-15T10:08:00".to_string());
    backend
        .transitions
        .insert("ALERT-7".to_string(), Ok(acknowledged.clone()));
    let mut harness = Harness::start(backend);
    let ready = harness.wait_open().await;
    let summaries_before = harness.count("summary");

    harness.with_backend(|backend| backend.summary.acknowledged_alerts = 1);
    let target = ready.alert(7).cloned().expect("alert 7 displayed");
    harness.handle.acknowledge(&target).expect("command sent");

    let snapshot = harness
        .wait_for("acknowledged alert and refreshed summary", |snapshot| {
            snapshot.alert(7).map(|alert| alert.status) == Some(AlertStatus::Acknowledged)
                && snapshot.summary.acknowledged_alerts == 1
        })
        .await;
    assert_eq!(snapshot.alert(7), Some(&acknowledged));
    assert_eq!(ids(&snapshot), vec![7, 5, 3]);
    assert!(snapshot.busy_keys.is_empty());
    assert_eq!(harness.count("acknowledge:ALERT-7"), 1);
    assert!(harness.count("summary") > summaries_before);
}

#[tokio::test(start_paused = true)]
async fn regression_transition_result_for_undisplayed_alert_is_not_inserted() {
    let mut backend = seeded_backend();
    backend.transitions.insert(
        "ALERT-42".to_string(),
        Ok(alert(42, Some("ALERT-42"), AlertStatus::Suppressed)),
    );
    let mut harness = Harness::start(backend);
    harness
        .wait_for("bootstrap complete", |snapshot| {
            snapshot.connection == ConnectionState::Open && snapshot.is_healthy()
        })
        .await;
    let summaries_before = harness.count("summary");

    harness
        .handle
        .suppress(&open(42))
        .expect("command sent");
    while harness.count("summary") == summaries_before {
        sleep(Duration::from_millis(1)).await;
    }

    let snapshot = harness.handle.snapshot();
    assert_eq!(harness.count("suppress:ALERT-42"), 1);
    assert_eq!(ids(&snapshot), vec![7, 5, 3]);
}

#[tokio::test(start_paused = true)]
async fn regression_acknowledge_without_business_key_issues_no_request() {
    let mut backend = seeded_backend();
    backend
        .alerts
        .push(alert(8, None, AlertStatus::Open));
    let mut harness = Harness::start(backend);
    let ready = harness
        .wait_for("bootstrap complete", |snapshot| {
            snapshot.connection == ConnectionState::Open && snapshot.is_healthy()
        })
        .await;
    let polls_before = harness.count("health");

    let unregistered = ready.alert(8).cloned().expect("alert 8 displayed");
    harness
        .handle
        .acknowledge(&unregistered)
        .expect("command sent");
    harness.handle.refresh().expect("refresh sent");
    while harness.count("health") == polls_before {
        sleep(Duration::from_millis(1)).await;
    }

    let snapshot = harness.handle.snapshot();
    assert!(harness
        .log()
        .iter()
        .all(|entry| !entry.starts_with("acknowledge:")));
    assert_eq!(snapshot.alerts, ready.alerts);
    assert!(snapshot.busy_keys.is_empty());
    assert_eq!(snapshot.notice, None);
}

#[tokio::test(start_paused = true)]
async fn regression_failed_action_names_alert_and_leaves_collection() {
    let mut backend = seeded_backend();
    backend.transitions.insert("ALERT-5".to_string(), Err(409));
    let mut harness = Harness::start(backend);
    let ready = harness.wait_open().await;

    let target = ready.alert(5).cloned().expect("alert 5 displayed");
    harness.handle.suppress(&target).expect("command sent");
    let snapshot = harness
        .wait_for("action notice", |snapshot| snapshot.notice.is_some())
        .await;

    let notice = snapshot.notice.clone().expect("notice");
    assert_eq!(notice.kind, NoticeKind::Action);
    assert_eq!(notice.message, "failed to suppress ALERT-5");
    assert_eq!(snapshot.alerts, ready.alerts);
    assert!(snapshot.busy_keys.is_empty());
}

#[tokio::test(start_paused = true)]
async fn regression_crashed_transition_releases_busy_key() {
    let mut backend = seeded_backend();
    backend.panicking_keys.push("ALERT-5".to_string());
    let mut harness = Harness::start(backend);
    let ready = harness.wait_open().await;

    let target = ready.alert(5).cloned().expect("alert 5 displayed");
    harness.handle.suppress(&target).expect("command sent");
    let crashed = harness
        .wait_for("action notice after crash", |snapshot| snapshot.notice.is_some())
        .await;
    assert_eq!(
        crashed.notice.as_ref().map(|notice| notice.message.as_str()),
        Some("failed to suppress ALERT-5")
    );
    assert!(crashed.busy_keys.is_empty());
    assert_eq!(crashed.alerts, ready.alerts);

    let suppressed = alert(5, Some("ALERT-5"), AlertStatus::Suppressed);
    harness.with_backend(|backend| {
        backend.panicking_keys.clear();
        backend
            .transitions
            .insert("ALERT-5".to_string(), Ok(suppressed));
    });
    harness.handle.suppress(&target).expect("retry sent");
    let retried = harness
        .wait_for("retry applied", |snapshot| {
            snapshot.alert(5).map(|alert| alert.status) == Some(AlertStatus::Suppressed)
        })
        .await;
    assert_eq!(retried.notice, None);
    assert_eq!(harness.count("suppress:ALERT-5"), 2);
}

#[tokio::test(start_paused = true)]
async fn functional_busy_key_blocks_duplicate_but_not_other_alerts() {
    let mut backend = seeded_backend();
    backend.transition_delay = Duration::from_millis(500);
    backend.transitions.insert(
        "ALERT-7".to_string(),
        Ok(alert(7, Some("ALERT-7"), AlertStatus::Acknowledged)),
    );
    backend.transitions.insert(
        "ALERT-3".to_string(),
        Ok(alert(3, Some("ALERT-3"), AlertStatus::Suppressed)),
    );
    let mut harness = Harness::start(backend);
    let ready = harness.wait_open().await;

    let seven = ready.alert(7).cloned().expect("alert 7");
    let three = ready.alert(3).cloned().expect("alert 3");
    harness.handle.acknowledge(&seven).expect("first ack");
    harness.handle.acknowledge(&seven).expect("duplicate ack");
    harness.handle.suppress(&seven).expect("suppress while busy");
    harness.handle.suppress(&three).expect("other alert");

    let busy = harness
        .wait_for("both keys busy", |snapshot| snapshot.busy_keys.len() == 2)
        .await;
    assert!(busy.is_busy("ALERT-7"));
    assert!(busy.is_busy("ALERT-3"));

    let done = harness
        .wait_for("both transitions applied", |snapshot| {
            snapshot.busy_keys.is_empty()
                && snapshot.alert(7).map(|alert| alert.status) == Some(AlertStatus::Acknowledged)
                && snapshot.alert(3).map(|alert| alert.status) == Some(AlertStatus::Suppressed)
        })
        .await;
    assert_eq!(ids(&done), vec![7, 5, 3]);
    assert_eq!(harness.count("acknowledge:ALERT-7"), 1);
    assert_eq!(harness.count("suppress:ALERT-7"), 0);
    assert_eq!(harness.count("suppress:ALERT-3"), 1);
}

#[tokio::test(start_paused = true)]
async fn functional_poll_runs_on_interval_regardless_of_stream_state() {
    let mut harness = Harness::start(seeded_backend());
    harness
        .wait_for("bootstrap complete", |snapshot| {
            snapshot.connection == ConnectionState::Open && snapshot.is_healthy()
        })
        .await;
    let started = Instant::now();
    assert_eq!(harness.count("health"), 1);

    harness.connector.drop_connection(0);
    sleep_until(started + Duration::from_millis(10_001)).await;
    assert_eq!(harness.count("health"), 2);
    assert_eq!(harness.count("summary"), 2);

    sleep_until(started + Duration::from_millis(20_001)).await;
    assert_eq!(harness.count("health"), 3);
}

#[tokio::test(start_paused = true)]
async fn regression_poll_failure_is_standing_until_next_success() {
    let mut backend = seeded_backend();
    backend.poll_status = Some(503);
    let mut harness = Harness::start(backend);
    let failing = harness
        .wait_for("backend notice", |snapshot| {
            snapshot.connection == ConnectionState::Open && snapshot.notice.is_some()
        })
        .await;
    assert_eq!(failing.health, "unhealthy");
    assert_eq!(
        failing.notice.as_ref().map(|notice| notice.kind),
        Some(NoticeKind::Backend)
    );
    assert_eq!(
        failing.notice.as_ref().map(|notice| notice.message.as_str()),
        Some("unable to reach backend")
    );

    harness.with_backend(|backend| backend.poll_status = None);
    harness.handle.refresh().expect("refresh sent");
    let recovered = harness
        .wait_for("healthy again", |snapshot| snapshot.is_healthy())
        .await;
    assert_eq!(recovered.notice, None);
}

#[tokio::test(start_paused = true)]
async fn regression_bootstrap_failure_still_polls_and_connects() {
    let mut backend = seeded_backend();
    backend.list_status = Some(500);
    backend.poll_status = Some(500);
    let mut harness = Harness::start(backend);
    let snapshot = harness
        .wait_for("stream opened after failed bootstrap", |snapshot| {
            snapshot.connection == ConnectionState::Open && snapshot.health == "unhealthy"
        })
        .await;

    assert!(snapshot.alerts.is_empty());
    assert_eq!(
        snapshot.notice.as_ref().map(|notice| notice.kind),
        Some(NoticeKind::Backend)
    );
    assert_eq!(harness.log().first().map(String::as_str), Some("list_alerts"));

    harness.connector.send(0, frame("snapshot", &[open(1), open(2)]));
    let streamed = harness
        .wait_for("stream snapshot", |snapshot| snapshot.alerts.len() == 2)
        .await;
    assert_eq!(ids(&streamed), vec![2, 1]);
}

#[tokio::test(start_paused = true)]
async fn functional_shutdown_closes_stream_and_stops_lifecycle() {
    let mut harness = Harness::start(seeded_backend());
    harness.wait_open().await;

    harness.handle.shutdown().expect("shutdown sent");
    let final_snapshot = (&mut harness.join).await.expect("runtime joined");
    assert_eq!(final_snapshot.connection, ConnectionState::Disconnected);
    assert_eq!(harness.count("close"), 1);

    let polls = harness.count("health");
    sleep(Duration::from_secs(60)).await;
    assert_eq!(harness.count("health"), polls);
    assert_eq!(harness.connector.attempts(), 1);
    assert!(harness.handle.refresh().is_err());
}

#[tokio::test(start_paused = true)]
async fn regression_shutdown_cancels_pending_reconnect() {
    let mut harness = Harness::start(seeded_backend());
    harness.wait_open().await;
    harness.connector.drop_connection(0);
    harness
        .wait_for("closed pending retry", |snapshot| {
            snapshot.connection == ConnectionState::Closed
        })
        .await;

    harness.handle.shutdown().expect("shutdown sent");
    (&mut harness.join).await.expect("runtime joined");
    sleep(Duration::from_secs(10)).await;
    assert_eq!(harness.connector.attempts(), 1);
    assert_eq!(harness.count("close"), 0);
}

#[tokio::test(start_paused = true)]
async fn regression_dropping_every_handle_tears_runtime_down() {
    let backend = Arc::new(Mutex::new(seeded_backend()));
    let connector = Arc::new(FakeConnector {
        backend: Arc::clone(&backend),
        attempts: AtomicU64::new(0),
        failing_attempts: 0,
        senders: Mutex::new(Vec::new()),
    });
    let api = Arc::new(FakeApi {
        backend: Arc::clone(&backend),
    });
    let (runtime, handle) = DashboardRuntime::new(DashboardRuntimeConfig::new(api, connector));
    let mut snapshots = handle.subscribe();
    let join = tokio::spawn(runtime.run());
    timeout(
        Duration::from_secs(30),
        snapshots.wait_for(|snapshot| snapshot.connection == ConnectionState::Open),
    )
    .await
    .expect("opened in time")
    .expect("runtime alive");

    drop(handle);
    let final_snapshot = timeout(Duration::from_secs(30), join)
        .await
        .expect("runtime stopped in time")
        .expect("runtime joined");
    assert_eq!(final_snapshot.connection, ConnectionState::Disconnected);
}
