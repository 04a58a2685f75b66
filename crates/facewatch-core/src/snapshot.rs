use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::{HistoryEntry, SessionStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub ts: DateTime<Utc>,
    pub status: SessionStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub uptime: String,
    pub total_face_count: u64,
    pub last_detection_at: Option<DateTime<Utc>>,
    pub last_fps: Option<f64>,
    pub snapshot_url: Option<String>,
    pub video_url: Option<String>,
    pub history: Vec<HistoryEntry>,
    pub stats: SessionStats,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    pub events_applied: u64,
    pub events_ignored: u64,
    pub sessions_started: u64,
}
