//! Headless runner for the colony food-log client.
//!
//! Mounts the shell (session restore plus health monitoring), logs in with
//! configured credentials when no session was restored, loads the dashboard
//! once, and keeps monitoring backend health until Ctrl-C.

use std::env;
use std::sync::Arc;

use color_eyre::eyre::{Report, Result, eyre};
use ortho_config::OrthoConfig;
use tracing::{info, warn};

use marsfood_client::ClientSettings;
use marsfood_client::domain::DashboardSync;
use marsfood_client::outbound::health::HttpHealthProbe;
use marsfood_client::outbound::manifest::ManifestHttpClient;
use marsfood_client::shell::{Screen, Shell};
use marsfood_client::telemetry::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let settings = ClientSettings::load_from_iter(env::args_os())
        .map_err(|err| eyre!("failed to load settings: {err}"))?;
    let timeout = settings.request_timeout();
    let client = ManifestHttpClient::new(settings.backend_url()?, timeout)
        .map_err(|err| Report::new(err).wrap_err("failed to build resource client"))?;
    let probe = HttpHealthProbe::new(settings.health_url()?, timeout)
        .map_err(|err| Report::new(err).wrap_err("failed to build health probe"))?;

    let mut shell = Shell::new(
        Arc::new(client),
        Arc::new(probe),
        settings.health_interval(),
    );
    shell.mount().await;

    if shell.screen() == Screen::Landing
        && let Some(credentials) = settings.credentials()?
        && let Err(err) = shell
            .session()
            .login(credentials.email(), credentials.password())
            .await
    {
        warn!(error = %err, "login failed");
    }

    match shell.dashboard() {
        Some(dashboard) => summarise(&dashboard).await,
        None => info!("no active session; dashboard not loaded"),
    }

    tokio::signal::ctrl_c().await?;
    info!(healthy = shell.health().is_healthy(), "shutting down");
    shell.unmount();
    if shell.session().session().is_authenticated() {
        shell.session().logout().await;
    }
    Ok(())
}

async fn summarise(dashboard: &DashboardSync) {
    dashboard.load().await;
    let catalog = dashboard.catalog();
    for meal in &catalog.meals {
        info!(
            meal = %meal.name,
            calories = meal.calories,
            category = %meal.category,
            creator = meal.creator_name(),
            "meal available"
        );
    }
    for log in dashboard.recent_logs() {
        info!(
            meal = log.meal_name().unwrap_or("unknown meal"),
            logged_at = %log.created_at,
            "recently logged"
        );
    }
    info!(
        meals = catalog.meals.len(),
        logs = dashboard.logs().len(),
        "dashboard loaded"
    );
}
