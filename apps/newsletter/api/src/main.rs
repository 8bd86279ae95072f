use axum_helpers::server::{create_production_app, health_router, ready_router};
use axum_helpers::{JwtAuth, ShutdownCoordinator};
use core_config::tracing::{init_tracing, install_color_eyre};
use database::RetryConfig;
use domain_newsletter::{NewsletterState, Repositories, transport};
use std::time::Duration;
use tracing::{info, warn};

mod api;
mod config;
mod openapi;
mod state;

use config::Config;
use state::AppState;

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Before any fallible operation so startup errors get colored reports
    install_color_eyre();

    let config = Config::from_env()?;
    init_tracing(&config.environment);

    let (db, repos) = match config.database.clone() {
        Some(pg) => {
            let db = database::postgres::connect_with_retry(pg, RetryConfig::default())
                .await
                .map_err(|e| eyre::eyre!("PostgreSQL connection failed: {}", e))?;
            database::postgres::run_migrations::<migration::Migrator>(&db, config.app.name).await?;
            (Some(db.clone()), Repositories::postgres(db))
        }
        None => {
            warn!("DATABASE_URL not set, data is kept in memory and lost on restart");
            (None, Repositories::in_memory())
        }
    };

    let mailer = transport::from_config(&config.mailerlite);
    if let Err(e) = mailer.health_check().await {
        warn!(transport = mailer.name(), error = %e, "Email transport health check failed");
    }

    let auth = JwtAuth::new(&config.jwt);
    let newsletter = NewsletterState::new(repos, mailer, &config.newsletter, auth)?;

    let seeded = newsletter.templates.seed_defaults().await?;
    if seeded > 0 {
        info!(count = seeded, "Seeded default templates");
    }

    let state = AppState {
        config,
        db,
        newsletter,
    };

    let router = axum_helpers::create_router::<openapi::ApiDoc>(api::routes(&state))?;

    // - /health: liveness with app name/version
    // - /ready: database round trip
    let app = router
        .merge(health_router(state.config.app))
        .merge(ready_router(api::readiness_checks(&state)));

    info!("Starting newsletter API ({:?} graceful shutdown timeout)", SHUTDOWN_TIMEOUT);

    let sends = state.newsletter.sender.control().clone();
    let server_config = state.config.server.clone();

    create_production_app(
        app,
        &server_config,
        ShutdownCoordinator::new(),
        SHUTDOWN_TIMEOUT,
        async move {
            let signalled = sends.cancel_all();
            if signalled > 0 {
                info!(count = signalled, "Stopping in-flight campaign sends at their next checkpoint");
            }
            // Runs persist their cursor on the way out and need the pool until then
            while sends.running() > 0 {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }

            if let Some(db) = state.db {
                match db.close().await {
                    Ok(_) => info!("PostgreSQL connection closed successfully"),
                    Err(e) => tracing::error!("Error closing PostgreSQL: {}", e),
                }
            }
        },
    )
    .await
    .map_err(|e| eyre::eyre!("Server error: {}", e))?;

    info!("Newsletter API shutdown complete");
    Ok(())
}
