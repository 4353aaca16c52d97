use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::http::{header, Method};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use sso_api::{router, AppState};
use sso_core::{IdentityCore, Stores};
use sso_infrastructure::{create_pool, postgres_stores, run_migrations, LogNotifier, MemoryStore};
use sso_shared::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("loading configuration")?;

    sso_shared::telemetry::init_telemetry(&config.log.filter);
    info!(env = %config.app.env, "SSO Server starting...");

    let stores = build_stores(&config).await?;
    let core = IdentityCore::new(&config, stores, Arc::new(LogNotifier))
        .context("wiring identity core")?;

    spawn_token_sweeper(core.clone(), Duration::from_secs(config.session.cleanup_interval_secs));

    let host: std::net::IpAddr = config.app.host.parse().context("parsing app.host")?;
    let addr = SocketAddr::from((host, config.app.port));

    let app = router(AppState::new(core, config)).layer(
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
    );

    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("SSO Server stopped");
    Ok(())
}

async fn build_stores(config: &AppConfig) -> anyhow::Result<Stores> {
    if config.uses_memory_store() {
        info!("Using in-memory store; data is lost on restart");
        return Ok(MemoryStore::new().stores());
    }

    info!("Connecting to database...");
    let pool = create_pool(&config.database.url, config.database.max_connections)
        .await
        .context("connecting to database")?;
    run_migrations(&pool).await.context("running migrations")?;
    info!("Database connection established.");
    Ok(postgres_stores(pool))
}

/// Purges expired refresh tokens and spent reset tokens on a fixed cadence.
fn spawn_token_sweeper(core: IdentityCore, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(e) = core.sessions.cleanup_expired().await {
                error!(error = %e, "refresh token sweep failed");
            }
            if let Err(e) = core.password_resets.cleanup_expired().await {
                error!(error = %e, "reset token sweep failed");
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
    }
    info!("Shutdown signal received");
}
