//! Top-level composition of the client.
//!
//! [`Shell`] owns the session controller and the health monitor, decides
//! which screen the presentation layer shows, and hands out dashboards bound
//! to the live session.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::info;

use crate::domain::ports::{HealthProbe, ResourceClient};
use crate::domain::{
    DashboardSync, HealthMonitor, HealthState, Session, SessionController, SessionStatus,
};

/// Screen the presentation layer should render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    /// Startup restore has not finished.
    Loading,
    /// Login and signup forms.
    Landing,
    /// Role-specific dashboard.
    Dashboard,
}

impl Screen {
    /// Screen for a session snapshot.
    pub fn for_session(session: &Session) -> Self {
        if session.is_loading() {
            Self::Loading
        } else if session.status() == SessionStatus::Authenticated {
            Self::Dashboard
        } else {
            Self::Landing
        }
    }
}

/// Session, health, and dashboard wiring for one client instance.
pub struct Shell {
    client: Arc<dyn ResourceClient>,
    session: SessionController,
    health: HealthMonitor,
}

impl Shell {
    /// Compose a shell over the given adapters.
    pub fn new(
        client: Arc<dyn ResourceClient>,
        probe: Arc<dyn HealthProbe>,
        health_interval: Duration,
    ) -> Self {
        Self {
            session: SessionController::new(Arc::clone(&client)),
            health: HealthMonitor::with_interval(probe, health_interval),
            client,
        }
    }

    /// Start health monitoring and restore any existing session.
    pub async fn mount(&mut self) {
        self.health.start();
        self.session.restore().await;
        info!(screen = ?self.screen(), "shell mounted");
    }

    /// Stop background work. Must be called before the shell is discarded
    /// when the runtime outlives it.
    pub fn unmount(&mut self) {
        self.health.stop();
        info!("shell unmounted");
    }

    /// Screen for the current session.
    pub fn screen(&self) -> Screen {
        Screen::for_session(&self.session.session())
    }

    /// Authentication operations.
    pub fn session(&self) -> &SessionController {
        &self.session
    }

    /// Latest backend health.
    pub fn health(&self) -> HealthState {
        self.health.state()
    }

    /// Health monitor, for subscriptions.
    pub fn health_monitor(&self) -> &HealthMonitor {
        &self.health
    }

    /// Dashboard bound to the live session, when a user is signed in.
    pub fn dashboard(&self) -> Option<DashboardSync> {
        (self.screen() == Screen::Dashboard)
            .then(|| DashboardSync::new(Arc::clone(&self.client), self.session.subscribe()))
    }
}
