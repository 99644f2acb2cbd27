//! Live alert stream transport: frame decoding and the websocket connector.

use alertdeck_api::{Alert, Url};
use async_trait::async_trait;
use futures_util::StreamExt;
use serde::Deserialize;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async, tungstenite::Message as WsMessage, MaybeTlsStream, WebSocketStream,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamFrameKind {
    Snapshot,
    Delta,
    #[serde(other)]
    Other,
}

impl StreamFrameKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Snapshot => "snapshot",
            Self::Delta => "delta",
            Self::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
/// Inbound stream payload. `kind` is informational; snapshots and deltas are
/// reconciled the same way.
pub struct StreamFrame {
    #[serde(rename = "type")]
    pub kind: StreamFrameKind,
    pub items: Vec<Alert>,
}

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("failed to parse alert stream frame: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("alert stream transport failure: {0}")]
    Transport(String),
}

pub fn parse_stream_frame(text: &str) -> Result<StreamFrame, StreamError> {
    Ok(serde_json::from_str::<StreamFrame>(text)?)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Text(String),
    /// Transport-level failure. The connection reports `Closed` afterwards.
    Error(String),
    Closed,
}

#[async_trait]
/// One live stream connection.
pub trait AlertStream: Send {
    /// Waits for the next inbound event. Keeps returning `Closed` once the
    /// connection has ended.
    async fn next_event(&mut self) -> StreamEvent;

    /// Actively closes the connection.
    async fn close(&mut self);
}

#[async_trait]
pub trait StreamConnector: Send + Sync {
    async fn connect(&self, url: &Url) -> Result<Box<dyn AlertStream>, StreamError>;
}

#[derive(Debug, Clone, Copy, Default)]
/// Connects to the alert stream with `tokio-tungstenite`.
pub struct TungsteniteConnector;

#[async_trait]
impl StreamConnector for TungsteniteConnector {
    async fn connect(&self, url: &Url) -> Result<Box<dyn AlertStream>, StreamError> {
        let (stream, _response) = connect_async(url.as_str())
            .await
            .map_err(|error| StreamError::Transport(error.to_string()))?;
        tracing::debug!(url = %url, "alert stream connected");
        Ok(Box::new(TungsteniteAlertStream {
            inner: stream,
            finished: false,
        }))
    }
}

struct TungsteniteAlertStream {
    inner: WebSocketStream<MaybeTlsStream<TcpStream>>,
    finished: bool,
}

#[async_trait]
impl AlertStream for TungsteniteAlertStream {
    async fn next_event(&mut self) -> StreamEvent {
        if self.finished {
            return StreamEvent::Closed;
        }
        loop {
            let Some(message) = self.inner.next().await else {
                self.finished = true;
                return StreamEvent::Closed;
            };
            match message {
                Ok(message) => {
                    if let Some(event) = event_for_message(message) {
                        if event == StreamEvent::Closed {
                            self.finished = true;
                        }
                        return event;
                    }
                }
                Err(error) => {
                    self.finished = true;
                    return StreamEvent::Error(error.to_string());
                }
            }
        }
    }

    async fn close(&mut self) {
        if let Err(error) = self.inner.close(None).await {
            tracing::debug!(error = %error, "alert stream close handshake failed");
        }
        self.finished = true;
    }
}

fn event_for_message(message: WsMessage) -> Option<StreamEvent> {
    match message {
        WsMessage::Text(text) => Some(StreamEvent::Text(text.as_str().to_string())),
        WsMessage::Binary(bytes) => match String::from_utf8(bytes.to_vec()) {
            Ok(text) => Some(StreamEvent::Text(text)),
            Err(_) => {
                tracing::debug!("ignoring non utf-8 binary alert stream frame");
                None
            }
        },
        WsMessage::Close(_) => Some(StreamEvent::Closed),
        WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_) => None,
    }
}
