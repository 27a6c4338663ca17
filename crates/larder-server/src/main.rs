mod api;
mod middleware;
mod scheduler;
mod state;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use larder_catalog::SystemClock;
use larder_source::ConfiguredSource;

use crate::api::build_app;
use crate::state::{load_region, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(larder_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let regions = larder_core::load_regions(&config.regions_path)?;
    let configured: Vec<(String, String)> = regions
        .regions
        .iter()
        .map(|r| (r.slug(), r.name.clone()))
        .collect();

    let source = ConfiguredSource::from_regions(
        &regions,
        config.source_request_timeout_secs,
        &config.source_user_agent,
    )?;
    let state = AppState::new(source, configured, Arc::new(SystemClock));

    // Load every configured region up front. A failed region stays
    // unloaded (health reports degraded) and can be retried through the
    // reload endpoint without restarting the process.
    for (slug, name) in state.configured.iter() {
        if let Err(e) = load_region(&state, slug, name).await {
            tracing::error!(region = %slug, error = %e, "initial region load failed");
        }
    }

    let _scheduler = scheduler::build_scheduler(state.clone()).await?;

    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "larder-server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
