//! Periodic backend liveness monitor.
//!
//! The monitor probes once immediately on [`HealthMonitor::start`] and then on
//! a fixed period until [`HealthMonitor::stop`] or drop. Each tick replaces
//! the published [`HealthState`]; no history or backoff is kept.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::domain::ports::HealthProbe;

/// Default period between probes.
pub const DEFAULT_HEALTH_INTERVAL: Duration = Duration::from_secs(15);

/// Shortest accepted probe period.
pub const MIN_HEALTH_INTERVAL: Duration = Duration::from_secs(1);

/// Backend liveness as seen by the last probe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthState {
    is_healthy: bool,
}

impl HealthState {
    /// State for a probe outcome.
    pub fn new(is_healthy: bool) -> Self {
        Self { is_healthy }
    }

    /// Whether the last probe returned a 2xx status.
    pub fn is_healthy(self) -> bool {
        self.is_healthy
    }
}

/// Repeating liveness probe tied to the lifetime of its owner.
///
/// Dropping the monitor cancels the background task.
pub struct HealthMonitor {
    probe: Arc<dyn HealthProbe>,
    interval: Duration,
    state: Arc<watch::Sender<HealthState>>,
    task: Option<JoinHandle<()>>,
}

impl HealthMonitor {
    /// Monitor probing every [`DEFAULT_HEALTH_INTERVAL`].
    pub fn new(probe: Arc<dyn HealthProbe>) -> Self {
        Self::with_interval(probe, DEFAULT_HEALTH_INTERVAL)
    }

    /// Monitor with a custom period, clamped to [`MIN_HEALTH_INTERVAL`].
    pub fn with_interval(probe: Arc<dyn HealthProbe>, interval: Duration) -> Self {
        let (state, _) = watch::channel(HealthState::default());
        Self {
            probe,
            interval: interval.max(MIN_HEALTH_INTERVAL),
            state: Arc::new(state),
            task: None,
        }
    }

    /// Effective probe period.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Latest published state.
    pub fn state(&self) -> HealthState {
        *self.state.borrow()
    }

    /// Observe state changes.
    pub fn subscribe(&self) -> watch::Receiver<HealthState> {
        self.state.subscribe()
    }

    /// Whether the periodic task is active.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Begin probing. Calling `start` on a running monitor does nothing.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }
        let probe = Arc::clone(&self.probe);
        let state = Arc::clone(&self.state);
        let period = self.interval;
        self.task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                probe_and_publish(probe.as_ref(), &state).await;
            }
        }));
        info!(interval_secs = period.as_secs(), "health monitor started");
    }

    /// Cancel the periodic probe. Idempotent.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            info!("health monitor stopped");
        }
    }

    /// Run a single probe outside the schedule and publish its outcome.
    pub async fn probe_once(&self) -> HealthState {
        probe_and_publish(self.probe.as_ref(), &self.state).await
    }
}

impl Drop for HealthMonitor {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn probe_and_publish(
    probe: &dyn HealthProbe,
    state: &watch::Sender<HealthState>,
) -> HealthState {
    let next = match probe.probe().await {
        Ok(status) => {
            debug!(status = status.code(), "health probe completed");
            HealthState::new(status.is_success())
        }
        Err(error) => {
            warn!(error = %error, error_kind = error.kind(), "health probe failed");
            HealthState::new(false)
        }
    };

    let previous = state.send_replace(next);
    if previous.is_healthy() != next.is_healthy() {
        info!(healthy = next.is_healthy(), "backend health changed");
    }
    next
}
