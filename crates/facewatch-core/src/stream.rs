use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::warn;

pub const ALERT_EVENT: &str = "new_alert";
pub const FPS_EVENT: &str = "fps_update";
pub const COUNT_OVERRIDE_EVENT: &str = "face_count_update";

#[derive(Debug, Clone, Deserialize)]
pub struct RawFrame {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Detection(DetectionEvent),
    Fps(FpsSample),
    CountOverride { face_count: i64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectionEvent {
    pub face_count: i64,
    pub timestamp: Option<DateTime<Utc>>,
    pub frame_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FpsSample {
    pub fps: f64,
}

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("not connected")]
    NotConnected,
    #[error("stream closed")]
    Closed,
    #[error("io error: {0}")]
    Io(String),
    #[error("protocol error: {0}")]
    Protocol(String),
}

#[async_trait]
pub trait EventStream: Send {
    async fn connect(&mut self) -> Result<(), StreamError>;
    async fn next_frame(&mut self) -> Result<Option<RawFrame>, StreamError>;
    async fn disconnect(&mut self) -> Result<(), StreamError>;
    fn is_connected(&self) -> bool;
}

// Field-lenient: one bad field never discards the whole message.
pub fn decode_frame(frame: &RawFrame) -> Option<SessionEvent> {
    let data = &frame.data;

    match frame.event.as_str() {
        ALERT_EVENT => Some(SessionEvent::Detection(DetectionEvent {
            face_count: data
                .get("face_count")
                .and_then(|v| v.as_i64())
                .unwrap_or(0),
            timestamp: data
                .get("timestamp")
                .and_then(|v| v.as_str())
                .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
                .map(|ts| ts.with_timezone(&Utc)),
            frame_url: data
                .get("frame_url")
                .and_then(|v| v.as_str())
                .map(|url| url.to_string()),
        })),
        FPS_EVENT => Some(SessionEvent::Fps(FpsSample {
            fps: data.get("fps").and_then(|v| v.as_f64()).unwrap_or(0.0),
        })),
        COUNT_OVERRIDE_EVENT => Some(SessionEvent::CountOverride {
            face_count: data
                .get("face_count")
                .and_then(|v| v.as_i64())
                .unwrap_or(0),
        }),
        _ => None,
    }
}

pub struct TcpEventStream {
    addr: String,
    lines: Option<Lines<BufReader<TcpStream>>>,
}

impl TcpEventStream {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            lines: None,
        }
    }
}

#[async_trait]
impl EventStream for TcpEventStream {
    async fn connect(&mut self) -> Result<(), StreamError> {
        let stream = TcpStream::connect(&self.addr)
            .await
            .map_err(|err| StreamError::Io(format!("failed to connect to {}: {err}", self.addr)))?;
        self.lines = Some(BufReader::new(stream).lines());
        Ok(())
    }

    async fn next_frame(&mut self) -> Result<Option<RawFrame>, StreamError> {
        let Some(lines) = self.lines.as_mut() else {
            return Err(StreamError::NotConnected);
        };

        loop {
            let line = lines
                .next_line()
                .await
                .map_err(|err| StreamError::Io(format!("stream read failed: {err}")))?;

            let Some(line) = line else {
                self.lines = None;
                return Ok(None);
            };

            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str::<RawFrame>(&line) {
                Ok(frame) => return Ok(Some(frame)),
                Err(err) => {
                    warn!(%err, "skipping unparseable frame");
                }
            }
        }
    }

    async fn disconnect(&mut self) -> Result<(), StreamError> {
        self.lines = None;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.lines.is_some()
    }
}

// In-process stream backed by a channel, for tests and embedders.
pub struct ChannelEventStream {
    rx: mpsc::UnboundedReceiver<RawFrame>,
    connected: bool,
}

impl ChannelEventStream {
    pub fn new() -> (mpsc::UnboundedSender<RawFrame>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            tx,
            Self {
                rx,
                connected: false,
            },
        )
    }
}

#[async_trait]
impl EventStream for ChannelEventStream {
    async fn connect(&mut self) -> Result<(), StreamError> {
        self.connected = true;
        Ok(())
    }

    async fn next_frame(&mut self) -> Result<Option<RawFrame>, StreamError> {
        if !self.connected {
            return Err(StreamError::NotConnected);
        }
        Ok(self.rx.recv().await)
    }

    async fn disconnect(&mut self) -> Result<(), StreamError> {
        self.connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
