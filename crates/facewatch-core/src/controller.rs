use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::config::SessionConfig;
use crate::session::{apply_event, HistoryBuffer, SessionState, SessionStatus};
use crate::snapshot::{SessionSnapshot, SessionStats};
use crate::stream::{decode_frame, EventStream, StreamError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpOutcome {
    Applied,
    Ignored,
    Closed,
}

pub struct SessionController<S: EventStream> {
    stream: S,
    config: SessionConfig,
    state: SessionState,
    history: HistoryBuffer,
    stats: SessionStats,
}

impl<S: EventStream> SessionController<S> {
    pub fn new(stream: S, config: SessionConfig) -> Self {
        Self {
            stream,
            config,
            state: SessionState::default(),
            history: HistoryBuffer::new(),
            stats: SessionStats::default(),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn history(&self) -> &HistoryBuffer {
        &self.history
    }

    pub fn is_online(&self) -> bool {
        self.state.status == SessionStatus::Online
    }

    pub async fn start(&mut self) -> Result<(), StreamError> {
        if self.is_online() {
            return Ok(());
        }

        self.stream.connect().await?;

        self.state.status = SessionStatus::Online;
        self.state.started_at = Some(Utc::now());
        self.state.video_url = Some(self.config.feed_url.clone());
        self.stats.sessions_started += 1;
        debug!("session started");
        Ok(())
    }

    pub async fn stop(&mut self) {
        if !self.is_online() {
            return;
        }

        // Disconnect is fire-and-forget: a broken transport must not block stop.
        let _ = self.stream.disconnect().await;
        self.go_offline();
        debug!("session stopped");
    }

    pub async fn pump_one(&mut self) -> Result<PumpOutcome, StreamError> {
        if !self.is_online() {
            return Err(StreamError::NotConnected);
        }

        let frame = match self.stream.next_frame().await {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                warn!("event stream closed by remote");
                self.go_offline();
                return Ok(PumpOutcome::Closed);
            }
            Err(err) => {
                self.go_offline();
                return Err(err);
            }
        };

        let Some(event) = decode_frame(&frame) else {
            debug!(event = %frame.event, "ignoring unknown event");
            self.stats.events_ignored += 1;
            return Ok(PumpOutcome::Ignored);
        };

        if apply_event(&mut self.state, &mut self.history, event, Utc::now()) {
            self.stats.events_applied += 1;
            Ok(PumpOutcome::Applied)
        } else {
            self.stats.events_ignored += 1;
            Ok(PumpOutcome::Ignored)
        }
    }

    // Explicit new-session reset; stop() never clears these.
    pub fn reset(&mut self) {
        self.state.total_face_count = 0;
        self.state.last_detection_at = None;
        self.state.last_fps = None;
        self.state.snapshot_url = None;
        self.history.clear();
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> SessionSnapshot {
        SessionSnapshot {
            ts: now,
            status: self.state.status,
            started_at: self.state.started_at,
            uptime: self.state.uptime_display(now),
            total_face_count: self.state.total_face_count,
            last_detection_at: self.state.last_detection_at,
            last_fps: self.state.last_fps,
            snapshot_url: self.state.snapshot_url.clone(),
            video_url: self.state.video_url.clone(),
            history: self.history.to_vec(),
            stats: self.stats,
        }
    }

    fn go_offline(&mut self) {
        self.state.status = SessionStatus::Offline;
        self.state.started_at = None;
        self.state.video_url = None;
    }
}
