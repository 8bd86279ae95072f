use axum::Router;
use axum_helpers::{HealthCheckFuture, ReadinessCheck};
use std::sync::Arc;

use crate::state::AppState;

/// API routes without the `/api` prefix; `create_router` adds it.
pub fn routes(state: &AppState) -> Router {
    Router::new().nest("/newsletter", domain_newsletter::handlers::router(state.newsletter.clone()))
}

/// Probes behind `/ready`. Only the database is checked; the email
/// provider being down degrades sends but does not make the API unready.
pub fn readiness_checks(state: &AppState) -> Vec<(&'static str, ReadinessCheck)> {
    let mut checks: Vec<(&'static str, ReadinessCheck)> = Vec::new();

    if let Some(db) = state.db.clone() {
        let probe: ReadinessCheck = Arc::new(move || -> HealthCheckFuture {
            let db = db.clone();
            Box::pin(async move { database::postgres::ping(&db).await.map_err(|e| e.to_string()) })
        });
        checks.push(("postgres", probe));
    }

    checks
}
