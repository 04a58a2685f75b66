use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::stream::SessionEvent;

pub const HISTORY_CAPACITY: usize = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Offline,
    Online,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Offline => write!(f, "Offline"),
            SessionStatus::Online => write!(f, "Online"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub status: SessionStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub total_face_count: u64,
    pub last_detection_at: Option<DateTime<Utc>>,
    pub last_fps: Option<f64>,
    pub snapshot_url: Option<String>,
    pub video_url: Option<String>,
}

impl SessionState {
    pub fn uptime_display(&self, now: DateTime<Utc>) -> String {
        match (self.status, self.started_at) {
            (SessionStatus::Online, Some(started)) => {
                // Clamp instead of going negative when clocks disagree.
                let elapsed = (now - started).num_seconds().max(0);
                format_uptime(elapsed as u64)
            }
            _ => format_uptime(0),
        }
    }
}

pub fn format_uptime(total_seconds: u64) -> String {
    format!("{:02}:{:02}", total_seconds / 60, total_seconds % 60)
}

pub fn face_label(count: u64) -> String {
    if count == 1 {
        "1 face".to_string()
    } else {
        format!("{count} faces")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub face_count: u64,
    pub frame_url: Option<String>,
}

impl HistoryEntry {
    pub fn face_label(&self) -> String {
        face_label(self.face_count)
    }
}

#[derive(Debug, Clone, Default)]
pub struct HistoryBuffer {
    entries: VecDeque<HistoryEntry>,
}

impl HistoryBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: HistoryEntry) {
        self.entries.push_front(entry);
        self.entries.truncate(HISTORY_CAPACITY);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn to_vec(&self) -> Vec<HistoryEntry> {
        self.entries.iter().cloned().collect()
    }
}

pub fn apply_event(
    state: &mut SessionState,
    history: &mut HistoryBuffer,
    event: SessionEvent,
    received_at: DateTime<Utc>,
) -> bool {
    // Frames racing a stop must not mutate anything once the session is down.
    if state.status != SessionStatus::Online {
        return false;
    }

    match event {
        SessionEvent::Detection(detection) => {
            let faces = detection.face_count.max(0) as u64;
            state.total_face_count += faces;

            let timestamp = detection.timestamp.unwrap_or(received_at);
            state.last_detection_at = Some(timestamp);

            if let Some(frame_url) = detection.frame_url.as_deref() {
                state.snapshot_url = Some(cache_busted(frame_url, received_at));
            }

            // Entries land at the head in receipt order, even when the embedded
            // timestamp is older than the current head's.
            history.push(HistoryEntry {
                timestamp,
                face_count: faces,
                frame_url: detection.frame_url,
            });
        }
        SessionEvent::Fps(sample) => {
            state.last_fps = Some(sample.fps.max(0.0));
        }
        SessionEvent::CountOverride { face_count } => {
            state.total_face_count = face_count.max(0) as u64;
        }
    }

    true
}

fn cache_busted(url: &str, received_at: DateTime<Utc>) -> String {
    format!("{url}?t={}", received_at.timestamp_millis())
}
