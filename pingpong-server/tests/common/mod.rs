//! Shared rig for the server integration tests

#![allow(dead_code)]

use image::{Rgb, RgbImage};
use pingpong_eye::imgproc::draw::fill_disc;
use pingpong_eye::{Camera, StillImageCamera, VisionError};
use pingpong_motor::{InMemoryVariableStore, SimulatedServo};
use pingpong_server::{AppConfig, FeederSystem, Hardware};
use std::sync::Arc;
use std::time::Duration;

pub const ORANGE: Rgb<u8> = Rgb([255, 128, 0]);

/// Camera that never delivers a frame
pub struct BlindCamera;

impl Camera for BlindCamera {
    fn capture_frame(&mut self) -> Result<RgbImage, VisionError> {
        Err(VisionError::Camera("lens cap on".to_string()))
    }

    fn name(&self) -> &str {
        "blind"
    }
}

pub struct Rig {
    pub system: Arc<FeederSystem>,
    pub servo: Arc<SimulatedServo>,
    pub variables: Arc<InMemoryVariableStore>,
    pub config: AppConfig,
}

pub fn config() -> AppConfig {
    let mut config = AppConfig::default();
    config.vision.frame_rate = 100;
    config.motor.poll_interval_ms = 5;
    config.server.stream_interval_ms = 5;
    config
}

/// Black 160x120 frame with one orange ball of radius 20 at (80, 60)
pub fn orange_ball_scene() -> RgbImage {
    let mut image = RgbImage::from_pixel(160, 120, Rgb([0, 0, 0]));
    fill_disc(&mut image, 80, 60, 20, ORANGE);
    image
}

pub fn start(camera: Box<dyn Camera>) -> Rig {
    let config = config();
    let servo = Arc::new(SimulatedServo::unbounded());
    let variables = Arc::new(InMemoryVariableStore::with_actuator_state(
        &config.motor.initial_state,
    ));
    let hardware = Hardware::new(camera, servo.clone(), variables.clone());
    let system = Arc::new(FeederSystem::start(&config, hardware));
    Rig {
        system,
        servo,
        variables,
        config,
    }
}

pub fn start_with_ball() -> Rig {
    start(Box::new(StillImageCamera::from_image(orange_ball_scene())))
}

pub fn start_blind() -> Rig {
    start(Box::new(BlindCamera))
}

pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(10), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

pub async fn wait_for_frame(rig: &Rig) {
    let system = rig.system.clone();
    wait_until(move || system.status().frames_published > 0).await;
}
