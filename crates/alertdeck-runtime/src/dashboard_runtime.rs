//! Dashboard event loop: bootstrap, live stream lifecycle, polling, and actions.

use std::{collections::HashMap, future::Future, sync::Arc, time::Duration};

use alertdeck_api::{Alert, AlertApi, AlertTransition, ApiError, Summary, Url};
use alertdeck_core::{ActionGuard, AlertCollection, MAX_ALERTS};
use anyhow::{anyhow, Result};
use tokio::{
    sync::{mpsc, watch},
    task::{self, JoinSet},
    time::{Instant, Interval, MissedTickBehavior},
};

use crate::dashboard_state::{
    ConnectionState, DashboardSnapshot, Notice, NoticeKind, HEALTH_UNHEALTHY, HEALTH_UNKNOWN,
};
use crate::stream_transport::{
    parse_stream_frame, AlertStream, StreamConnector, StreamError, StreamEvent,
};

pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 2_000;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 10_000;

const BACKEND_UNREACHABLE_MESSAGE: &str = "unable to reach backend";
const STREAM_RETRY_MESSAGE: &str = "live alert stream connection failed, retrying";

#[derive(Clone)]
/// Runtime configuration for the dashboard event loop.
pub struct DashboardRuntimeConfig {
    pub api: Arc<dyn AlertApi>,
    pub connector: Arc<dyn StreamConnector>,
    pub alert_page_limit: usize,
    pub reconnect_delay: Duration,
    pub poll_interval: Duration,
}

impl DashboardRuntimeConfig {
    pub fn new(api: Arc<dyn AlertApi>, connector: Arc<dyn StreamConnector>) -> Self {
        Self {
            api,
            connector,
            alert_page_limit: MAX_ALERTS,
            reconnect_delay: Duration::from_millis(DEFAULT_RECONNECT_DELAY_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DashboardCommand {
    Transition {
        transition: AlertTransition,
        id: u64,
        alert_key: Option<String>,
    },
    Refresh,
    Shutdown,
}

#[derive(Clone)]
/// Cloneable front door to a running [`DashboardRuntime`].
pub struct DashboardHandle {
    commands: mpsc::UnboundedSender<DashboardCommand>,
    snapshots: watch::Receiver<DashboardSnapshot>,
}

impl DashboardHandle {
    pub fn acknowledge(&self, alert: &Alert) -> Result<()> {
        self.transition(AlertTransition::Acknowledge, alert)
    }

    pub fn suppress(&self, alert: &Alert) -> Result<()> {
        self.transition(AlertTransition::Suppress, alert)
    }

    pub fn transition(&self, transition: AlertTransition, alert: &Alert) -> Result<()> {
        self.send(DashboardCommand::Transition {
            transition,
            id: alert.id,
            alert_key: alert.alert_id.clone(),
        })
    }

    /// Requests an immediate health/summary poll.
    pub fn refresh(&self) -> Result<()> {
        self.send(DashboardCommand::Refresh)
    }

    pub fn shutdown(&self) -> Result<()> {
        self.send(DashboardCommand::Shutdown)
    }

    pub fn subscribe(&self) -> watch::Receiver<DashboardSnapshot> {
        self.snapshots.clone()
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        self.snapshots.borrow().clone()
    }

    fn send(&self, command: DashboardCommand) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| anyhow!("dashboard runtime has stopped"))
    }
}

enum TaskOutcome {
    Bootstrap(Result<Vec<Alert>, ApiError>),
    Poll(Result<(String, Summary), ApiError>),
    SummaryRefresh(Result<Summary, ApiError>),
    Connected(Result<Box<dyn AlertStream>, StreamError>),
    Transition {
        transition: AlertTransition,
        alert_key: String,
        result: Result<Alert, ApiError>,
    },
}

/// What a spawned task was doing, kept so a panicked task can still release
/// the state it was holding.
enum PendingTask {
    Bootstrap,
    Refresh,
    Connect,
    Transition {
        transition: AlertTransition,
        alert_key: String,
    },
}

enum RuntimeEvent {
    Command(DashboardCommand),
    CommandsClosed,
    Task(task::Id, TaskOutcome),
    TaskFailed { id: task::Id, error: String },
    Stream(StreamEvent),
    ReconnectDue,
    PollDue,
}

/// Single-threaded owner of the alert collection and connection lifecycle.
///
/// All mutations happen inside [`DashboardRuntime::run`]; requests and
/// connection attempts run as tasks whose results re-enter the loop as events.
pub struct DashboardRuntime {
    config: DashboardRuntimeConfig,
    stream_url: Url,
    commands: mpsc::UnboundedReceiver<DashboardCommand>,
    snapshots: watch::Sender<DashboardSnapshot>,
    tasks: JoinSet<TaskOutcome>,
    pending: HashMap<task::Id, PendingTask>,
    // Stays `None` until bootstrap resolves.
    poll: Option<Interval>,
    stream: Option<Box<dyn AlertStream>>,
    reconnect_at: Option<Instant>,
    active: bool,
    collection: AlertCollection,
    actions: ActionGuard,
    summary: Summary,
    health: String,
    connection: ConnectionState,
    notice: Option<Notice>,
    connection_attempts: u64,
}

impl DashboardRuntime {
    pub fn new(config: DashboardRuntimeConfig) -> (Self, DashboardHandle) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(DashboardSnapshot::default());
        let stream_url = config.api.stream_endpoint();
        let runtime = Self {
            config,
            stream_url,
            commands: command_rx,
            snapshots: snapshot_tx,
            tasks: JoinSet::new(),
            pending: HashMap::new(),
            poll: None,
            stream: None,
            reconnect_at: None,
            active: true,
            collection: AlertCollection::new(),
            actions: ActionGuard::new(),
            summary: Summary::default(),
            health: HEALTH_UNKNOWN.to_string(),
            connection: ConnectionState::Disconnected,
            notice: None,
            connection_attempts: 0,
        };
        let handle = DashboardHandle {
            commands: command_tx,
            snapshots: snapshot_rx,
        };
        (runtime, handle)
    }

    /// Runs until a shutdown command arrives or every handle is dropped.
    pub async fn run(mut self) -> DashboardSnapshot {
        self.start_bootstrap();
        self.publish();

        loop {
            let event = self.next_event().await;
            match event {
                RuntimeEvent::Command(DashboardCommand::Shutdown) | RuntimeEvent::CommandsClosed => {
                    self.teardown().await;
                    break;
                }
                event => self.handle_event(event).await,
            }
            self.publish();
        }

        self.publish();
        self.snapshot()
    }

    async fn next_event(&mut self) -> RuntimeEvent {
        let reconnect_at = self.reconnect_at;
        tokio::select! {
            biased;
            command = self.commands.recv() => match command {
                Some(command) => RuntimeEvent::Command(command),
                None => RuntimeEvent::CommandsClosed,
            },
            Some(joined) = self.tasks.join_next_with_id() => match joined {
                Ok((id, outcome)) => RuntimeEvent::Task(id, outcome),
                Err(error) => RuntimeEvent::TaskFailed {
                    id: error.id(),
                    error: error.to_string(),
                },
            },
            event = next_stream_event(&mut self.stream) => RuntimeEvent::Stream(event),
            _ = sleep_until_deadline(reconnect_at) => RuntimeEvent::ReconnectDue,
            _ = next_poll_tick(&mut self.poll) => RuntimeEvent::PollDue,
        }
    }

    async fn handle_event(&mut self, event: RuntimeEvent) {
        if !self.active {
            return;
        }
        match event {
            RuntimeEvent::Command(DashboardCommand::Transition {
                transition,
                id,
                alert_key,
            }) => self.start_transition(transition, id, alert_key),
            RuntimeEvent::Command(DashboardCommand::Refresh) | RuntimeEvent::PollDue => {
                if self.poll.is_none() {
                    tracing::debug!("refresh ignored until the first alert page loads");
                    return;
                }
                self.start_poll()
            }
            RuntimeEvent::Command(DashboardCommand::Shutdown) | RuntimeEvent::CommandsClosed => {}
            RuntimeEvent::Task(id, outcome) => {
                self.pending.remove(&id);
                self.handle_task_outcome(outcome).await
            }
            RuntimeEvent::TaskFailed { id, error } => self.handle_task_failure(id, &error),
            RuntimeEvent::Stream(event) => self.handle_stream_event(event),
            RuntimeEvent::ReconnectDue => {
                self.reconnect_at = None;
                self.connect();
            }
        }
    }

    async fn handle_task_outcome(&mut self, outcome: TaskOutcome) {
        match outcome {
            TaskOutcome::Bootstrap(result) => {
                match result {
                    Ok(items) => {
                        tracing::debug!(count = items.len(), "bootstrap alert page loaded");
                        self.collection.reconcile(items);
                    }
                    Err(error) => {
                        tracing::warn!(error = %error, "bootstrap alert fetch failed");
                        self.raise_notice(NoticeKind::Backend, BACKEND_UNREACHABLE_MESSAGE);
                    }
                }
                self.finish_bootstrap();
            }
            TaskOutcome::Poll(Ok((health, summary))) => {
                self.health = health;
                self.summary = summary;
                self.clear_notice(NoticeKind::Backend);
            }
            TaskOutcome::Poll(Err(error)) => {
                tracing::warn!(error = %error, "health/summary poll failed");
                self.health = HEALTH_UNHEALTHY.to_string();
                self.raise_notice(NoticeKind::Backend, BACKEND_UNREACHABLE_MESSAGE);
            }
            TaskOutcome::SummaryRefresh(Ok(summary)) => {
                self.summary = summary;
            }
            TaskOutcome::SummaryRefresh(Err(error)) => {
                tracing::debug!(error = %error, "summary refresh after action failed");
            }
            TaskOutcome::Connected(Ok(mut stream)) => {
                if self.stream.is_some() {
                    tracing::warn!("closing surplus alert stream connection");
                    stream.close().await;
                    return;
                }
                self.stream = Some(stream);
                self.connection = ConnectionState::Open;
                self.clear_notice(NoticeKind::Transport);
            }
            TaskOutcome::Connected(Err(error)) => {
                tracing::warn!(error = %error, "alert stream connection attempt failed");
                self.connection_failed();
            }
            TaskOutcome::Transition {
                transition,
                alert_key,
                result,
            } => {
                self.actions.finish(&alert_key);
                match result {
                    Ok(updated) => {
                        self.collection.apply_local_result(updated);
                        self.clear_notice(NoticeKind::Action);
                        self.start_summary_refresh();
                    }
                    Err(error) => {
                        tracing::warn!(
                            alert_key = %alert_key,
                            action = transition.as_str(),
                            error = %error,
                            "alert transition failed"
                        );
                        self.transition_failed(transition, &alert_key);
                    }
                }
            }
        }
    }

    fn handle_task_failure(&mut self, id: task::Id, error: &str) {
        match self.pending.remove(&id) {
            Some(PendingTask::Bootstrap) => {
                tracing::warn!(error = %error, "bootstrap task failed");
                self.raise_notice(NoticeKind::Backend, BACKEND_UNREACHABLE_MESSAGE);
                self.finish_bootstrap();
            }
            Some(PendingTask::Connect) => {
                tracing::warn!(error = %error, "alert stream connection task failed");
                self.connection_failed();
            }
            Some(PendingTask::Transition {
                transition,
                alert_key,
            }) => {
                tracing::warn!(
                    alert_key = %alert_key,
                    action = transition.as_str(),
                    error = %error,
                    "alert transition task failed"
                );
                self.actions.finish(&alert_key);
                self.transition_failed(transition, &alert_key);
            }
            Some(PendingTask::Refresh) | None => {
                tracing::warn!(error = %error, "dashboard task failed");
            }
        }
    }

    fn finish_bootstrap(&mut self) {
        if self.poll.is_none() {
            self.poll = Some(poll_interval(self.config.poll_interval));
        }
        self.start_poll();
        self.connect();
    }

    fn connection_failed(&mut self) {
        self.raise_notice(NoticeKind::Transport, STREAM_RETRY_MESSAGE);
        self.schedule_reconnect();
    }

    fn transition_failed(&mut self, transition: AlertTransition, alert_key: &str) {
        self.raise_notice(
            NoticeKind::Action,
            &format!("failed to {} {alert_key}", transition.as_str()),
        );
    }

    fn handle_stream_event(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::Text(text) => match parse_stream_frame(&text) {
                Ok(frame) => {
                    tracing::debug!(
                        kind = frame.kind.as_str(),
                        items = frame.items.len(),
                        "alert stream frame received"
                    );
                    self.collection.reconcile(frame.items);
                }
                Err(error) => {
                    tracing::debug!(error = %error, "dropping malformed alert stream frame");
                }
            },
            StreamEvent::Error(error) => {
                tracing::warn!(error = %error, "alert stream transport error");
                self.raise_notice(NoticeKind::Transport, STREAM_RETRY_MESSAGE);
            }
            StreamEvent::Closed => {
                self.stream = None;
                self.schedule_reconnect();
            }
        }
    }

    fn start_bootstrap(&mut self) {
        let api = Arc::clone(&self.config.api);
        let limit = self.config.alert_page_limit;
        self.spawn_task(PendingTask::Bootstrap, async move {
            TaskOutcome::Bootstrap(api.list_alerts(limit).await)
        });
    }

    fn start_poll(&mut self) {
        let api = Arc::clone(&self.config.api);
        self.spawn_task(PendingTask::Refresh, async move {
            let result = tokio::try_join!(api.get_health(), api.get_summary());
            TaskOutcome::Poll(result)
        });
    }

    fn start_summary_refresh(&mut self) {
        let api = Arc::clone(&self.config.api);
        self.spawn_task(PendingTask::Refresh, async move {
            TaskOutcome::SummaryRefresh(api.get_summary().await)
        });
    }

    fn start_transition(&mut self, transition: AlertTransition, id: u64, alert_key: Option<String>) {
        let Some(alert_key) = alert_key
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
        else {
            tracing::debug!(id, action = transition.as_str(), "alert has no business key");
            return;
        };
        if !self.actions.try_begin(&alert_key) {
            tracing::debug!(
                alert_key = %alert_key,
                action = transition.as_str(),
                "alert already has a transition in flight"
            );
            return;
        }

        let api = Arc::clone(&self.config.api);
        let pending = PendingTask::Transition {
            transition,
            alert_key: alert_key.clone(),
        };
        self.spawn_task(pending, async move {
            let result = api.transition(transition, &alert_key).await;
            TaskOutcome::Transition {
                transition,
                alert_key,
                result,
            }
        });
    }

    fn connect(&mut self) {
        if !self.active
            || self.stream.is_some()
            || self.connection == ConnectionState::Connecting
        {
            return;
        }
        self.reconnect_at = None;
        self.connection = ConnectionState::Connecting;
        self.connection_attempts = self.connection_attempts.saturating_add(1);

        let connector = Arc::clone(&self.config.connector);
        let url = self.stream_url.clone();
        self.spawn_task(PendingTask::Connect, async move {
            TaskOutcome::Connected(connector.connect(&url).await)
        });
    }

    fn spawn_task<F>(&mut self, pending: PendingTask, task: F)
    where
        F: Future<Output = TaskOutcome> + Send + 'static,
    {
        let id = self.tasks.spawn(task).id();
        self.pending.insert(id, pending);
    }

    fn schedule_reconnect(&mut self) {
        if !self.active {
            return;
        }
        self.connection = ConnectionState::Closed;
        // One deadline slot: scheduling replaces any earlier timer.
        self.reconnect_at = Some(Instant::now() + self.config.reconnect_delay);
        tracing::debug!(
            delay_ms = self.config.reconnect_delay.as_millis() as u64,
            "alert stream reconnect scheduled"
        );
    }

    async fn teardown(&mut self) {
        self.active = false;
        self.reconnect_at = None;
        self.poll = None;
        if let Some(mut stream) = self.stream.take() {
            stream.close().await;
        }
        self.connection = ConnectionState::Disconnected;
        // In-flight requests run to completion but can no longer touch state.
        self.tasks.detach_all();
        self.pending.clear();
        tracing::debug!("dashboard runtime stopped");
    }

    fn raise_notice(&mut self, kind: NoticeKind, message: &str) {
        self.notice = Some(Notice {
            kind,
            message: message.to_string(),
        });
    }

    fn clear_notice(&mut self, kind: NoticeKind) {
        if self.notice.as_ref().map(|notice| notice.kind) == Some(kind) {
            self.notice = None;
        }
    }

    fn snapshot(&self) -> DashboardSnapshot {
        DashboardSnapshot {
            alerts: self.collection.alerts().to_vec(),
            summary: self.summary.clone(),
            health: self.health.clone(),
            connection: self.connection,
            busy_keys: self.actions.busy_keys().map(str::to_string).collect(),
            notice: self.notice.clone(),
            connection_attempts: self.connection_attempts,
        }
    }

    fn publish(&self) {
        let next = self.snapshot();
        self.snapshots.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }
}

fn poll_interval(period: Duration) -> Interval {
    let period = period.max(Duration::from_millis(1));
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

async fn next_poll_tick(poll: &mut Option<Interval>) {
    match poll.as_mut() {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn next_stream_event(stream: &mut Option<Box<dyn AlertStream>>) -> StreamEvent {
    match stream.as_mut() {
        Some(stream) => stream.next_event().await,
        None => std::future::pending().await,
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests;
