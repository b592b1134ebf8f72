//! Background frame acquisition loop

use crate::camera::Camera;
use crate::error::VisionError;
use crate::frame::Frame;
use crate::frame_store::FrameStore;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Counters shared between the loop and its handle
#[derive(Debug, Default)]
pub struct AcquisitionStats {
    captured: AtomicU64,
    missed: AtomicU64,
}

impl AcquisitionStats {
    pub fn captured(&self) -> u64 {
        self.captured.load(Ordering::Relaxed)
    }

    pub fn missed(&self) -> u64 {
        self.missed.load(Ordering::Relaxed)
    }
}

/// Handle to the running acquisition loop.
///
/// Each tick asks the camera for one frame and publishes it. A failed capture
/// skips the tick; the loop never backs off and never gives up on its own.
pub struct FrameAcquisition {
    is_running: Arc<AtomicBool>,
    stats: Arc<AcquisitionStats>,
    task: Option<JoinHandle<()>>,
}

impl FrameAcquisition {
    /// Spawn the loop on the current tokio runtime.
    pub fn start(camera: Box<dyn Camera>, store: Arc<FrameStore>, interval: Duration) -> Self {
        let is_running = Arc::new(AtomicBool::new(true));
        let stats = Arc::new(AcquisitionStats::default());

        info!(
            "Starting frame acquisition from '{}' every {:?}",
            camera.name(),
            interval
        );

        let task = tokio::spawn(run_loop(
            camera,
            store,
            interval,
            is_running.clone(),
            stats.clone(),
        ));

        Self {
            is_running,
            stats,
            task: Some(task),
        }
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
            && self.task.as_ref().map(|t| !t.is_finished()).unwrap_or(false)
    }

    /// Counters stay readable after the loop has stopped
    pub fn stats(&self) -> Arc<AcquisitionStats> {
        self.stats.clone()
    }

    /// Signal the loop and wait for it to exit. The camera is released by
    /// the loop before this returns.
    pub async fn stop(&mut self) {
        self.is_running.store(false, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Frame acquisition task ended abnormally: {}", e);
            }
            info!(
                "Frame acquisition stopped ({} captured, {} missed)",
                self.stats.captured(),
                self.stats.missed()
            );
        }
    }
}

impl Drop for FrameAcquisition {
    fn drop(&mut self) {
        self.is_running.store(false, Ordering::SeqCst);
    }
}

async fn run_loop(
    mut camera: Box<dyn Camera>,
    store: Arc<FrameStore>,
    interval: Duration,
    is_running: Arc<AtomicBool>,
    stats: Arc<AcquisitionStats>,
) {
    let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut healthy = true;

    while is_running.load(Ordering::SeqCst) {
        ticker.tick().await;
        if !is_running.load(Ordering::SeqCst) {
            break;
        }

        // Capture blocks on the device, keep it off the async workers.
        let (returned, result) = match tokio::task::spawn_blocking(move || {
            let result = camera.capture_frame();
            (camera, result)
        })
        .await
        {
            Ok(pair) => pair,
            Err(e) => {
                // The camera went down with the panicking capture.
                warn!("Camera capture panicked, stopping acquisition: {}", e);
                is_running.store(false, Ordering::SeqCst);
                return;
            }
        };
        camera = returned;

        match result {
            Ok(image) => {
                let sequence = store.publish(Frame::new(image));
                stats.captured.fetch_add(1, Ordering::Relaxed);
                if !healthy {
                    info!("Camera recovered at frame {}", sequence);
                    healthy = true;
                }
                debug!("Published frame {}", sequence);
            }
            Err(e) => {
                stats.missed.fetch_add(1, Ordering::Relaxed);
                log_miss(&mut healthy, &e);
            }
        }
    }

    camera.release();
    debug!("Camera '{}' released", camera.name());
}

fn log_miss(healthy: &mut bool, error: &VisionError) {
    if *healthy {
        warn!("Frame capture failed, skipping tick: {}", error);
        *healthy = false;
    } else {
        debug!("Frame capture still failing: {}", error);
    }
}
