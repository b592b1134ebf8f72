//! Control-plane bridge: polls the control variables and drives the sweep

use crate::control_plane::{read_actuator_state, VariableStore};
use crate::error::MotorError;
use crate::state::SharedActuatorState;
use crate::sweep::{SweepContext, SweepHandle};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Owns at most one sweep loop.
pub struct SweepController {
    context: SweepContext,
    sweep: Option<SweepHandle>,
}

impl SweepController {
    pub fn new(context: SweepContext) -> Self {
        Self {
            context,
            sweep: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.sweep.is_some()
    }

    /// Sweep loops alive right now, as counted by the loops themselves
    pub fn active_loops(&self) -> usize {
        self.context.active_loops.load(Ordering::SeqCst)
    }

    /// Start a sweep unless one is already running. Returns whether a new
    /// loop was started.
    pub async fn ensure_running(&mut self) -> bool {
        self.reap_finished().await;
        if self.sweep.is_some() {
            return false;
        }
        self.sweep = Some(SweepHandle::spawn(self.context.clone()));
        true
    }

    /// Stop the running sweep and wait for it to exit. Returns whether a
    /// loop was stopped.
    pub async fn ensure_stopped(&mut self) -> bool {
        match self.sweep.take() {
            Some(sweep) => {
                sweep.stop().await;
                true
            }
            None => false,
        }
    }

    /// Forget a loop that exited on its own (actuator fault).
    pub async fn reap_finished(&mut self) -> bool {
        let finished = self.sweep.as_ref().map(|s| s.is_finished()).unwrap_or(false);
        if finished {
            if let Some(sweep) = self.sweep.take() {
                sweep.stop().await;
                warn!("Sweep loop exited on its own, reaped");
            }
        }
        finished
    }
}

/// What a poll did to the sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Started,
    Stopped,
    Unchanged,
}

/// Counters exposed for status reporting
#[derive(Debug, Default)]
pub struct BridgeStats {
    polls: AtomicU64,
    failed_polls: AtomicU64,
    starts: AtomicU64,
    stops: AtomicU64,
    sweep_running: AtomicBool,
}

impl BridgeStats {
    pub fn polls(&self) -> u64 {
        self.polls.load(Ordering::Relaxed)
    }

    pub fn failed_polls(&self) -> u64 {
        self.failed_polls.load(Ordering::Relaxed)
    }

    pub fn starts(&self) -> u64 {
        self.starts.load(Ordering::Relaxed)
    }

    pub fn stops(&self) -> u64 {
        self.stops.load(Ordering::Relaxed)
    }

    pub fn sweep_running(&self) -> bool {
        self.sweep_running.load(Ordering::SeqCst)
    }
}

/// Copies the control variables into the actuator state and starts or
/// stops the sweep on the enabled flag.
pub struct ControlBridge {
    store: Arc<dyn VariableStore>,
    state: SharedActuatorState,
    controller: SweepController,
    stats: Arc<BridgeStats>,
}

impl ControlBridge {
    pub fn new(store: Arc<dyn VariableStore>, controller: SweepController) -> Self {
        let state = controller.context.state.clone();
        Self {
            store,
            state,
            controller,
            stats: Arc::new(BridgeStats::default()),
        }
    }

    pub fn controller(&self) -> &SweepController {
        &self.controller
    }

    pub fn stats(&self) -> Arc<BridgeStats> {
        self.stats.clone()
    }

    /// One poll of the control plane.
    ///
    /// Disabling waits for the sweep loop to exit before returning, so a
    /// following enable can never start a second loop.
    pub async fn poll_once(&mut self) -> Result<Transition, MotorError> {
        self.stats.polls.fetch_add(1, Ordering::Relaxed);
        let desired = match read_actuator_state(self.store.as_ref()) {
            Ok(state) => state,
            Err(e) => {
                self.stats.failed_polls.fetch_add(1, Ordering::Relaxed);
                return Err(e);
            }
        };
        *self.state.write() = desired;

        let reaped = self.controller.reap_finished().await;

        let transition = if desired.enabled {
            if self.controller.ensure_running().await {
                Transition::Started
            } else {
                Transition::Unchanged
            }
        } else if self.controller.ensure_stopped().await {
            Transition::Stopped
        } else {
            Transition::Unchanged
        };

        match transition {
            Transition::Started => {
                self.stats.starts.fetch_add(1, Ordering::Relaxed);
                if reaped {
                    info!("Sweep restarted after fault");
                } else {
                    info!(
                        speed_percent = desired.speed_percent,
                        min_angle = desired.min_angle,
                        max_angle = desired.max_angle,
                        "Sweep enabled"
                    );
                }
            }
            Transition::Stopped => {
                self.stats.stops.fetch_add(1, Ordering::Relaxed);
                info!("Sweep disabled");
            }
            Transition::Unchanged => {}
        }
        self.stats
            .sweep_running
            .store(self.controller.is_running(), Ordering::SeqCst);

        Ok(transition)
    }

    /// Poll on a fixed interval until the returned handle is shut down.
    pub fn spawn(mut self, poll_interval: Duration) -> BridgeHandle {
        let shutdown = Arc::new(AtomicBool::new(false));
        let stats = self.stats.clone();
        let flag = shutdown.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!("Control-plane bridge polling every {:?}", poll_interval);

            while !flag.load(Ordering::SeqCst) {
                ticker.tick().await;
                if flag.load(Ordering::SeqCst) {
                    break;
                }
                match self.poll_once().await {
                    Ok(transition) => debug!(?transition, "Control-plane poll"),
                    Err(e) => warn!("Control-plane poll failed, skipping: {}", e),
                }
            }

            if self.controller.ensure_stopped().await {
                self.stats.stops.fetch_add(1, Ordering::Relaxed);
            }
            self.stats.sweep_running.store(false, Ordering::SeqCst);
            info!("Control-plane bridge stopped");
        });

        BridgeHandle {
            shutdown,
            stats,
            task: Some(task),
        }
    }
}

/// Handle to a spawned bridge
pub struct BridgeHandle {
    shutdown: Arc<AtomicBool>,
    stats: Arc<BridgeStats>,
    task: Option<JoinHandle<()>>,
}

impl BridgeHandle {
    pub fn stats(&self) -> &BridgeStats {
        &self.stats
    }

    /// Stop polling, then stop and join the sweep.
    pub async fn shutdown(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Bridge task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for BridgeHandle {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}
