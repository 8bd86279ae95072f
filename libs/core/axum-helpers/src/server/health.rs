use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use core_config::AppInfo;
use futures::future::join_all;
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub name: &'static str,
    pub version: &'static str,
}

/// A boxed readiness probe; `Err` carries a short reason.
pub type HealthCheckFuture = Pin<Box<dyn Future<Output = Result<(), String>> + Send>>;

/// Factory producing a fresh probe per `/ready` request.
pub type ReadinessCheck = Arc<dyn Fn() -> HealthCheckFuture + Send + Sync>;

async fn health_handler(State(app): State<AppInfo>) -> Response {
    let body = HealthResponse {
        status: "healthy",
        name: app.name,
        version: app.version,
    };
    (StatusCode::OK, Json(body)).into_response()
}

/// `GET /health`: liveness, always 200 while the process serves requests.
pub fn health_router(app: AppInfo) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .with_state(app)
}

async fn ready_handler(State(checks): State<Arc<Vec<(&'static str, ReadinessCheck)>>>) -> Response {
    let results = join_all(checks.iter().map(|(_, check)| check())).await;

    let mut services = Map::new();
    let mut all_ready = true;

    for ((name, _), result) in checks.iter().zip(results) {
        match result {
            Ok(()) => {
                services.insert(name.to_string(), json!("connected"));
            }
            Err(reason) => {
                tracing::error!(check = %name, error = %reason, "Readiness check failed");
                services.insert(name.to_string(), json!("disconnected"));
                all_ready = false;
            }
        }
    }

    let body = json!({
        "status": if all_ready { "ready" } else { "not ready" },
        "services": Value::Object(services),
    });

    let status = if all_ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body)).into_response()
}

/// `GET /ready`: runs every probe concurrently; 503 if any fails.
pub fn ready_router(checks: Vec<(&'static str, ReadinessCheck)>) -> Router {
    Router::new()
        .route("/ready", get(ready_handler))
        .with_state(Arc::new(checks))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn probe(ok: bool) -> ReadinessCheck {
        Arc::new(move || {
            Box::pin(async move {
                if ok {
                    Ok(())
                } else {
                    Err("down".to_string())
                }
            })
        })
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health_reports_app_info() {
        let app = health_router(AppInfo {
            name: "newsletter-api",
            version: "1.2.3",
        });
        let (status, body) = get_json(app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "newsletter-api");
        assert_eq!(body["version"], "1.2.3");
    }

    #[tokio::test]
    async fn test_ready_fails_when_any_probe_fails() {
        let app = ready_router(vec![("database", probe(false)), ("transport", probe(true))]);
        let (status, body) = get_json(app, "/ready").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["services"]["database"], "disconnected");
        assert_eq!(body["services"]["transport"], "connected");
    }

    #[tokio::test]
    async fn test_ready_ok() {
        let (status, body) = get_json(ready_router(vec![("database", probe(true))]), "/ready").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ready");
    }
}
