//! End-to-end tests of the assembled feeder

mod common;

use common::{start_blind, start_with_ball, wait_for_frame, wait_until};
use pingpong_core::Error;
use pingpong_eye::DetectionParameters;
use pingpong_motor::control_plane::{ENABLED, SPEED_PERCENT};
use pingpong_motor::VariableValue;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

#[tokio::test]
async fn test_detections_unavailable_before_first_frame() {
    let rig = start_blind();
    tokio::time::sleep(Duration::from_millis(30)).await;

    match rig.system.latest_detections().await {
        Err(Error::Unavailable(msg)) => assert_eq!(msg, "No frame available"),
        other => panic!("Expected Unavailable, got {:?}", other.map(|r| r.detections)),
    }
    assert!(rig.system.status().frames_missed > 0);
    rig.system.shutdown().await;
}

#[tokio::test]
async fn test_orange_ball_detected_end_to_end() {
    let rig = start_with_ball();
    wait_for_frame(&rig).await;

    let report = assert_ok!(rig.system.latest_detections().await);
    assert_eq!(report.detections.len(), 1, "{:?}", report.detections);
    let ball = &report.detections[0];
    assert_eq!(ball.color, "orange");
    assert!((ball.x as i32 - 80).abs() <= 2);
    assert!((ball.y as i32 - 60).abs() <= 2);
    assert!((ball.radius as i32 - 20).abs() <= 2, "r = {}", ball.radius);
    assert!(!report.frame_jpeg_base64.is_empty());
    assert!(report.frame_sequence >= 1);

    rig.system.shutdown().await;
}

#[tokio::test]
async fn test_parameter_updates_apply_to_next_detection() {
    let rig = start_with_ball();
    wait_for_frame(&rig).await;

    let inverted = DetectionParameters {
        min_radius: 30,
        max_radius: 15,
        ..rig.system.detection_parameters()
    };
    assert_ok!(rig.system.update_detection_parameters(inverted.clone()));
    assert_eq!(rig.system.detection_parameters(), inverted);
    let report = assert_ok!(rig.system.latest_detections().await);
    assert!(report.detections.is_empty());

    let malformed = DetectionParameters {
        dp: 0.0,
        ..DetectionParameters::default()
    };
    let err = assert_err!(rig.system.update_detection_parameters(malformed));
    assert!(matches!(err, Error::InvalidInput(_)));
    // Rejected sets leave the current one in place
    assert_eq!(rig.system.detection_parameters(), inverted);

    rig.system.shutdown().await;
}

#[tokio::test]
async fn test_direct_positioning_bounds() {
    let rig = start_blind();

    let duty = assert_ok!(rig.system.set_actuator_angle(45));
    assert!((duty - 11.25).abs() < 1e-9);
    assert_eq!(rig.servo.last_duty(), Some(duty));

    let sent = rig.servo.commands_sent();
    let err = assert_err!(rig.system.set_actuator_angle(46));
    assert!(matches!(err, Error::InvalidInput(_)));
    assert_eq!(rig.servo.commands_sent(), sent);

    rig.system.shutdown().await;
}

#[tokio::test]
async fn test_control_variables_drive_the_sweep() {
    let rig = start_blind();

    assert_ok!(rig
        .system
        .write_control_variable(SPEED_PERCENT, VariableValue::Integer(99)));
    assert_ok!(rig.system.write_control_variable(ENABLED, VariableValue::Bool(true)));

    let servo = rig.servo.clone();
    wait_until(move || servo.commands_sent() >= 20).await;
    assert!(rig.system.status().sweep_running);
    assert!(rig.system.status().actuator.enabled);

    assert_ok!(rig.system.write_control_variable(ENABLED, VariableValue::Bool(false)));
    let system = rig.system.clone();
    wait_until(move || !system.status().sweep_running).await;
    assert_eq!(rig.servo.last_duty(), Some(0.0));

    // -45..45 degrees maps to 3.8..11.2 % in tenths
    for duty in rig.servo.history().into_iter().filter(|d| *d != 0.0) {
        assert!(duty >= 3.8 - 1e-9 && duty <= 11.2 + 1e-9, "duty {} out of range", duty);
    }

    rig.system.shutdown().await;
}

#[tokio::test]
async fn test_unknown_or_mistyped_variables_rejected() {
    let rig = start_blind();

    let err = assert_err!(rig
        .system
        .write_control_variable("turbo", VariableValue::Bool(true)));
    assert!(matches!(err, Error::InvalidInput(_)));

    let err = assert_err!(rig
        .system
        .write_control_variable(ENABLED, VariableValue::Integer(1)));
    assert!(matches!(err, Error::InvalidInput(_)));

    let names: Vec<String> = rig
        .system
        .control_variables()
        .into_iter()
        .map(|(name, _)| name)
        .collect();
    assert_eq!(names, vec!["enabled", "maxAngle", "minAngle", "speedPercent"]);

    rig.system.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_stops_everything_once() {
    let rig = start_with_ball();
    wait_for_frame(&rig).await;
    assert_ok!(rig.system.write_control_variable(ENABLED, VariableValue::Bool(true)));
    let servo = rig.servo.clone();
    wait_until(move || servo.commands_sent() >= 3).await;

    rig.system.shutdown().await;
    let status = rig.system.status();
    assert!(status.shut_down);
    assert!(!status.sweep_running);
    assert!(rig.servo.is_released());
    assert_eq!(rig.servo.last_duty(), Some(0.0));

    let published = status.frames_published;
    let recorded = rig.servo.history().len();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(rig.system.status().frames_published, published);
    assert_eq!(rig.servo.history().len(), recorded);

    // Second call is a no-op
    rig.system.shutdown().await;
    assert_eq!(rig.servo.history().len(), recorded);
}

#[tokio::test]
async fn test_positioning_after_shutdown_is_unavailable() {
    let rig = start_blind();
    rig.system.shutdown().await;
    assert!(rig.servo.is_released());

    let recorded = rig.servo.history().len();
    let err = assert_err!(rig.system.set_actuator_angle(10));
    assert!(matches!(err, Error::Unavailable(_)));
    assert_eq!(rig.servo.history().len(), recorded);
    assert_eq!(rig.servo.last_duty(), Some(0.0));
}
