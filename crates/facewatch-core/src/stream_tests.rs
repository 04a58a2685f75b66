use serde_json::json;

use crate::stream::{decode_frame, DetectionEvent, FpsSample, RawFrame, SessionEvent};

fn frame(event: &str, data: serde_json::Value) -> RawFrame {
    RawFrame {
        event: event.to_string(),
        data,
    }
}

#[test]
fn decodes_a_full_alert() {
    // Arrange
    let raw = frame(
        "new_alert",
        json!({
            "face_count": 3,
            "timestamp": "2026-03-01T12:00:00Z",
            "frame_url": "http://cam/images/shot.jpg"
        }),
    );

    // Act
    let event = decode_frame(&raw).expect("decoded");

    // Assert
    let SessionEvent::Detection(DetectionEvent {
        face_count,
        timestamp,
        frame_url,
    }) = event
    else {
        panic!("expected a detection");
    };
    assert_eq!(face_count, 3);
    assert!(timestamp.is_some());
    assert_eq!(frame_url.as_deref(), Some("http://cam/images/shot.jpg"));
}

#[test]
fn alert_with_missing_fields_defaults_instead_of_failing() {
    // Arrange
    let raw = frame("new_alert", json!({}));

    // Act
    let event = decode_frame(&raw).expect("decoded");

    // Assert
    assert_eq!(
        event,
        SessionEvent::Detection(DetectionEvent {
            face_count: 0,
            timestamp: None,
            frame_url: None,
        })
    );
}

#[test]
fn alert_with_unparseable_timestamp_keeps_the_rest_of_the_event() {
    // Arrange
    let raw = frame(
        "new_alert",
        json!({"face_count": 2, "timestamp": "yesterday-ish"}),
    );

    // Act
    let event = decode_frame(&raw).expect("decoded");

    // Assert
    let SessionEvent::Detection(detection) = event else {
        panic!("expected a detection");
    };
    assert_eq!(detection.face_count, 2);
    assert!(detection.timestamp.is_none());
}

#[test]
fn decodes_fps_updates() {
    let raw = frame("fps_update", json!({"fps": 27.5}));
    assert_eq!(
        decode_frame(&raw),
        Some(SessionEvent::Fps(FpsSample { fps: 27.5 }))
    );

    let missing = frame("fps_update", json!({}));
    assert_eq!(
        decode_frame(&missing),
        Some(SessionEvent::Fps(FpsSample { fps: 0.0 }))
    );
}

#[test]
fn decodes_count_overrides() {
    let raw = frame("face_count_update", json!({"face_count": 42}));
    assert_eq!(
        decode_frame(&raw),
        Some(SessionEvent::CountOverride { face_count: 42 })
    );
}

#[test]
fn unknown_event_names_are_ignored() {
    let raw = frame("camera_went_for_a_walk", json!({"face_count": 99}));
    assert_eq!(decode_frame(&raw), None);
}

#[test]
fn raw_frame_parses_without_a_data_field() {
    // Arrange
    let line = r#"{"event":"new_alert"}"#;

    // Act
    let raw: RawFrame = serde_json::from_str(line).expect("parsed");

    // Assert
    assert_eq!(raw.event, "new_alert");
    assert_eq!(
        decode_frame(&raw),
        Some(SessionEvent::Detection(DetectionEvent {
            face_count: 0,
            timestamp: None,
            frame_url: None,
        }))
    );
}
