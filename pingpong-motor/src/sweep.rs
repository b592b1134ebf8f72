//! Continuous servo sweep loop

use crate::calibration::{tenths_to_duty, ServoCalibration};
use crate::driver::ServoDriver;
use crate::error::MotorError;
use crate::state::SharedActuatorState;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Everything a sweep loop needs, cloned into each spawned loop
#[derive(Clone)]
pub struct SweepContext {
    pub driver: Arc<dyn ServoDriver>,
    pub state: SharedActuatorState,
    pub calibration: ServoCalibration,
    /// Wait applied when the configured range holds no step
    pub idle_interval: Duration,
    /// Number of sweep loops currently alive
    pub active_loops: Arc<AtomicUsize>,
}

/// Handle to one running sweep loop
pub struct SweepHandle {
    stop: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl SweepHandle {
    pub fn spawn(context: SweepContext) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let task = tokio::spawn(run_sweep(context, stop.clone()));
        Self { stop, task }
    }

    /// True once the loop has exited, by stop or by fault
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Signal the loop and wait until it has exited and neutralized the servo.
    pub async fn stop(self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Err(e) = self.task.await {
            warn!("Sweep task ended abnormally: {}", e);
        }
    }
}

/// Commands neutral on every exit path of the loop, including a fault or
/// the task being dropped.
struct NeutralOnExit {
    driver: Arc<dyn ServoDriver>,
    active_loops: Arc<AtomicUsize>,
}

impl NeutralOnExit {
    fn arm(driver: Arc<dyn ServoDriver>, active_loops: Arc<AtomicUsize>) -> Self {
        active_loops.fetch_add(1, Ordering::SeqCst);
        Self {
            driver,
            active_loops,
        }
    }
}

impl Drop for NeutralOnExit {
    fn drop(&mut self) {
        if let Err(e) = self.driver.set_duty_cycle(0.0) {
            error!("Failed to neutralize servo after sweep: {}", e);
        }
        self.active_loops.fetch_sub(1, Ordering::SeqCst);
        debug!("Sweep loop exited, servo neutral");
    }
}

enum StepOutcome {
    Continue,
    Stopped,
}

async fn run_sweep(context: SweepContext, stop: Arc<AtomicBool>) {
    let _neutral = NeutralOnExit::arm(context.driver.clone(), context.active_loops.clone());
    info!("Sweep started on '{}'", context.driver.name());

    match sweep_until_stopped(&context, &stop).await {
        Ok(()) => info!("Sweep stopped"),
        Err(e) => error!("Sweep aborted by actuator fault: {}", e),
    }
}

async fn sweep_until_stopped(context: &SweepContext, stop: &AtomicBool) -> Result<(), MotorError> {
    while !stop.load(Ordering::SeqCst) {
        let state = *context.state.read();
        let delay = state.step_delay();

        let Some((low, high)) = context.calibration.ramp_tenths(state.min_angle, state.max_angle) else {
            debug!(
                min_angle = state.min_angle,
                max_angle = state.max_angle,
                "Empty sweep range, idling"
            );
            tokio::time::sleep(context.idle_interval).await;
            continue;
        };

        for tenths in low..=high {
            if let StepOutcome::Stopped = step(context, stop, tenths, delay).await? {
                return Ok(());
            }
        }
        for tenths in (low..=high).rev() {
            if let StepOutcome::Stopped = step(context, stop, tenths, delay).await? {
                return Ok(());
            }
        }
    }
    Ok(())
}

async fn step(
    context: &SweepContext,
    stop: &AtomicBool,
    tenths: u32,
    delay: Duration,
) -> Result<StepOutcome, MotorError> {
    if stop.load(Ordering::SeqCst) {
        return Ok(StepOutcome::Stopped);
    }
    context.driver.set_duty_cycle(tenths_to_duty(tenths))?;
    if delay.is_zero() {
        tokio::task::yield_now().await;
    } else {
        tokio::time::sleep(delay).await;
    }
    Ok(StepOutcome::Continue)
}
