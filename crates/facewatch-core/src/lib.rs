pub mod config;
pub mod controller;
pub mod session;
pub mod snapshot;
pub mod stream;

pub use config::{DetectorConfig, SessionConfig};
pub use controller::{PumpOutcome, SessionController};
pub use session::{
    apply_event, face_label, format_uptime, HistoryBuffer, HistoryEntry, SessionState,
    SessionStatus, HISTORY_CAPACITY,
};
pub use snapshot::{SessionSnapshot, SessionStats};
pub use stream::{
    decode_frame, ChannelEventStream, DetectionEvent, EventStream, FpsSample, RawFrame,
    SessionEvent, StreamError, TcpEventStream, ALERT_EVENT, COUNT_OVERRIDE_EVENT, FPS_EVENT,
};

#[cfg(test)]
mod controller_tests;
#[cfg(test)]
mod stream_tests;
