use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;

use crate::config::SessionConfig;
use crate::controller::{PumpOutcome, SessionController};
use crate::session::SessionStatus;
use crate::stream::{ChannelEventStream, EventStream, RawFrame, StreamError};

fn controller() -> (
    tokio::sync::mpsc::UnboundedSender<RawFrame>,
    SessionController<ChannelEventStream>,
) {
    let (tx, stream) = ChannelEventStream::new();
    let config = SessionConfig {
        feed_url: "http://127.0.0.1:5000/video_feed".to_string(),
        ..SessionConfig::default()
    };
    (tx, SessionController::new(stream, config))
}

fn alert(face_count: i64) -> RawFrame {
    RawFrame {
        event: "new_alert".to_string(),
        data: json!({ "face_count": face_count }),
    }
}

#[tokio::test]
async fn start_is_idempotent() {
    // Arrange
    let (_tx, mut controller) = controller();
    controller.start().await.expect("start");
    let first_start = controller.state().started_at;

    // Act
    controller.start().await.expect("second start");

    // Assert
    assert_eq!(controller.state().started_at, first_start);
    assert_eq!(controller.snapshot(Utc::now()).stats.sessions_started, 1);
}

#[tokio::test]
async fn stop_is_safe_from_any_state_and_repeatable() {
    // Arrange
    let (_tx, mut controller) = controller();

    // Act: stop before any start, then a full cycle with a double stop.
    controller.stop().await;
    controller.start().await.expect("start");
    controller.stop().await;
    controller.stop().await;

    // Assert
    assert_eq!(controller.state().status, SessionStatus::Offline);
    assert!(controller.state().started_at.is_none());
}

#[tokio::test]
async fn start_assigns_the_feed_and_stop_clears_it() {
    // Arrange
    let (_tx, mut controller) = controller();

    // Act + Assert
    controller.start().await.expect("start");
    assert_eq!(
        controller.state().video_url.as_deref(),
        Some("http://127.0.0.1:5000/video_feed")
    );

    controller.stop().await;
    assert!(controller.state().video_url.is_none());
}

#[tokio::test]
async fn stop_preserves_counters_and_history() {
    // Arrange
    let (tx, mut controller) = controller();
    controller.start().await.expect("start");
    tx.send(alert(2)).expect("send");
    tx.send(alert(3)).expect("send");
    controller.pump_one().await.expect("pump");
    controller.pump_one().await.expect("pump");

    // Act
    controller.stop().await;

    // Assert
    let snapshot = controller.snapshot(Utc::now());
    assert_eq!(snapshot.status, SessionStatus::Offline);
    assert_eq!(snapshot.total_face_count, 5);
    assert_eq!(snapshot.history.len(), 2);
    assert_eq!(snapshot.uptime, "00:00");
}

#[tokio::test]
async fn restart_keeps_the_total_but_takes_a_fresh_start_instant() {
    // Arrange
    let (tx, mut controller) = controller();
    controller.start().await.expect("start");
    tx.send(alert(4)).expect("send");
    controller.pump_one().await.expect("pump");
    controller.stop().await;

    // Act
    controller.start().await.expect("restart");

    // Assert
    assert_eq!(controller.state().total_face_count, 4);
    assert!(controller.state().started_at.is_some());
    assert_eq!(controller.snapshot(Utc::now()).stats.sessions_started, 2);
}

#[tokio::test]
async fn pump_applies_known_events_and_ignores_unknown_ones() {
    // Arrange
    let (tx, mut controller) = controller();
    controller.start().await.expect("start");
    tx.send(alert(1)).expect("send");
    tx.send(RawFrame {
        event: "telemetry_blob".to_string(),
        data: json!({"face_count": 99}),
    })
    .expect("send");

    // Act
    let first = controller.pump_one().await.expect("pump");
    let second = controller.pump_one().await.expect("pump");

    // Assert
    assert_eq!(first, PumpOutcome::Applied);
    assert_eq!(second, PumpOutcome::Ignored);
    let stats = controller.snapshot(Utc::now()).stats;
    assert_eq!(stats.events_applied, 1);
    assert_eq!(stats.events_ignored, 1);
    assert_eq!(controller.state().total_face_count, 1);
}

#[tokio::test]
async fn override_and_fps_frames_reach_the_reducer() {
    // Arrange
    let (tx, mut controller) = controller();
    controller.start().await.expect("start");
    tx.send(RawFrame {
        event: "face_count_update".to_string(),
        data: json!({"face_count": 7}),
    })
    .expect("send");
    tx.send(RawFrame {
        event: "fps_update".to_string(),
        data: json!({"fps": 24.0}),
    })
    .expect("send");

    // Act
    controller.pump_one().await.expect("pump");
    controller.pump_one().await.expect("pump");

    // Assert
    assert_eq!(controller.state().total_face_count, 7);
    assert_eq!(controller.state().last_fps, Some(24.0));
}

#[tokio::test]
async fn remote_close_reverts_to_offline_but_keeps_the_tally() {
    // Arrange
    let (tx, mut controller) = controller();
    controller.start().await.expect("start");
    tx.send(alert(6)).expect("send");
    controller.pump_one().await.expect("pump");

    // Act
    drop(tx);
    let outcome = controller.pump_one().await.expect("pump");

    // Assert
    assert_eq!(outcome, PumpOutcome::Closed);
    assert_eq!(controller.state().status, SessionStatus::Offline);
    assert!(controller.state().video_url.is_none());
    assert_eq!(controller.state().total_face_count, 6);
}

#[tokio::test]
async fn reset_clears_counters_and_history() {
    // Arrange
    let (tx, mut controller) = controller();
    controller.start().await.expect("start");
    tx.send(alert(5)).expect("send");
    controller.pump_one().await.expect("pump");

    // Act
    controller.reset();

    // Assert
    assert_eq!(controller.state().total_face_count, 0);
    assert!(controller.history().is_empty());
    assert!(controller.state().last_detection_at.is_none());
    assert!(controller.state().snapshot_url.is_none());
}

struct RefusingStream;

#[async_trait]
impl EventStream for RefusingStream {
    async fn connect(&mut self) -> Result<(), StreamError> {
        Err(StreamError::Io("connection refused".to_string()))
    }

    async fn next_frame(&mut self) -> Result<Option<RawFrame>, StreamError> {
        Err(StreamError::NotConnected)
    }

    async fn disconnect(&mut self) -> Result<(), StreamError> {
        Ok(())
    }

    fn is_connected(&self) -> bool {
        false
    }
}

#[tokio::test]
async fn failed_connect_leaves_the_session_offline() {
    // Arrange
    let mut controller = SessionController::new(RefusingStream, SessionConfig::default());

    // Act
    let result = controller.start().await;

    // Assert
    assert!(result.is_err());
    assert_eq!(controller.state().status, SessionStatus::Offline);
    assert!(controller.state().started_at.is_none());
    assert!(controller.state().video_url.is_none());
}
