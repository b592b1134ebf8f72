//! Tests for the frame acquisition loop

use image::{Rgb, RgbImage};
use mockall::mock;
use pingpong_eye::{Camera, FrameAcquisition, FrameStore, StillImageCamera, VisionError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_test::assert_ok;

mock! {
    pub TestCamera {}

    impl Camera for TestCamera {
        fn capture_frame(&mut self) -> Result<RgbImage, VisionError>;
        fn release(&mut self);
        fn name(&self) -> &str;
    }
}

async fn wait_for_frame(store: &FrameStore) {
    let waited = tokio::time::timeout(Duration::from_secs(5), async {
        while !store.has_frame() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert_ok!(waited, "no frame published within 5s");
}

#[tokio::test]
async fn test_publishes_frames_from_camera() {
    let store = Arc::new(FrameStore::new());
    let image = RgbImage::from_pixel(8, 8, Rgb([1, 2, 3]));
    let camera = StillImageCamera::from_image(image.clone());

    let mut acquisition =
        FrameAcquisition::start(Box::new(camera), store.clone(), Duration::from_millis(5));
    wait_for_frame(&store).await;
    assert!(acquisition.is_running());

    acquisition.stop().await;
    assert!(!acquisition.is_running());
    assert_eq!(store.snapshot().unwrap().image(), &image);
    assert!(acquisition.stats().captured() >= 1);
}

#[tokio::test]
async fn test_failed_captures_are_skipped() {
    let store = Arc::new(FrameStore::new());
    let calls = Arc::new(AtomicUsize::new(0));

    let mut camera = MockTestCamera::new();
    let counter = calls.clone();
    camera.expect_capture_frame().returning(move || {
        if counter.fetch_add(1, Ordering::SeqCst) < 3 {
            Err(VisionError::Camera("device busy".to_string()))
        } else {
            Ok(RgbImage::from_pixel(4, 4, Rgb([9, 9, 9])))
        }
    });
    camera.expect_name().return_const("mock".to_string());
    camera.expect_release().times(1).return_const(());

    let mut acquisition =
        FrameAcquisition::start(Box::new(camera), store.clone(), Duration::from_millis(2));
    wait_for_frame(&store).await;
    acquisition.stop().await;

    assert!(calls.load(Ordering::SeqCst) >= 4);
    assert_eq!(acquisition.stats().missed(), 3);
    assert_eq!(store.snapshot().unwrap().image().get_pixel(0, 0), &Rgb([9, 9, 9]));
}

#[tokio::test]
async fn test_stop_releases_camera_that_never_delivers() {
    let store = Arc::new(FrameStore::new());

    let mut camera = MockTestCamera::new();
    camera
        .expect_capture_frame()
        .returning(|| Err(VisionError::Camera("unplugged".to_string())));
    camera.expect_name().return_const("mock".to_string());
    camera.expect_release().times(1).return_const(());

    let mut acquisition =
        FrameAcquisition::start(Box::new(camera), store.clone(), Duration::from_millis(2));
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(acquisition.is_running());
    acquisition.stop().await;

    assert!(!store.has_frame());
    assert!(store.snapshot().is_none());
    assert_eq!(acquisition.stats().captured(), 0);
}
