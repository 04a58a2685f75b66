use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub feed_url: String,
    pub tick_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            feed_url: "http://127.0.0.1:5000/video_feed".to_string(),
            tick_interval: Duration::from_secs(1),
        }
    }
}

// Pass-through mapping of the detector tuning form. Values stay exactly as the
// user typed them; rejecting malformed ones is the backend's job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectorConfig {
    pub rtsp_url: String,
    pub frame_width: String,
    pub frame_height: String,
    pub scale_factor: String,
    pub min_neighbors: String,
    pub min_size: String,
}
