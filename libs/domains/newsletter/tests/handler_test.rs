//! Handler tests for the newsletter routes
//!
//! The router runs on in-memory repositories and the simulated transport,
//! mounted at `/api/newsletter` the way the API binary mounts it. These
//! tests cover status codes, JSON shapes, the admin gate and the public
//! unsubscribe flow.

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum_helpers::{JwtAuth, JwtConfig};
use domain_newsletter::*;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt; // For oneshot()

const JWT_SECRET: &str = "handler-test-jwt-secret-0123456789abcdef";

struct TestApp {
    router: Router,
    state: NewsletterState,
    transport: SimulatedTransport,
    auth: JwtAuth,
}

async fn app() -> TestApp {
    let auth = JwtAuth::new(&JwtConfig::new(JWT_SECRET).unwrap());
    let transport = SimulatedTransport::new();
    let state = NewsletterState::new(
        Repositories::in_memory(),
        Arc::new(transport.clone()),
        &NewsletterConfig::default(),
        auth.clone(),
    )
    .unwrap();
    state.templates.seed_defaults().await.unwrap();

    let router = Router::new().nest("/api/newsletter", handlers::router(state.clone()));
    TestApp {
        router,
        state,
        transport,
        auth,
    }
}

impl TestApp {
    fn admin_token(&self) -> String {
        self.auth
            .issue_token("admin-1", "admin@pedal.example", &["admin".into()])
            .unwrap()
    }

    fn customer_token(&self) -> String {
        self.auth
            .issue_token("user-7", "rider@example.com", &["customer".into()])
            .unwrap()
    }

    async fn call(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, bytes.to_vec())
    }

    async fn json(&self, request: Request<Body>) -> (StatusCode, Value) {
        let (status, bytes) = self.call(request).await;
        (status, serde_json::from_slice(&bytes).unwrap())
    }
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

#[tokio::test]
async fn test_subscribe_is_idempotent() {
    let app = app().await;

    let (status, body) = app
        .json(request(
            "POST",
            "/api/newsletter",
            None,
            Some(json!({ "email": " Rider@Example.com ", "firstName": "Ada" })),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["subscriber"]["email"], "rider@example.com");
    assert_eq!(body["subscriber"]["source"], "website");
    assert_eq!(body["alreadySubscribed"], false);
    let id = body["subscriber"]["id"].clone();

    let (status, body) = app
        .json(request("POST", "/api/newsletter", None, Some(json!({ "email": "rider@example.com" }))))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["alreadySubscribed"], true);
    assert_eq!(body["subscriber"]["id"], id);

    // Contact registration happened once, for the new subscriber
    assert_eq!(app.transport.contacts().await.len(), 1);
}

#[tokio::test]
async fn test_resubscribe_reactivates_same_record() {
    let app = app().await;

    let (_, created) = app
        .json(request("POST", "/api/newsletter", None, Some(json!({ "email": "loop@example.com" }))))
        .await;

    let (status, body) = app
        .json(request("DELETE", "/api/newsletter?email=loop%40example.com&reason=too%20many", None, None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, body) = app
        .json(request("POST", "/api/newsletter", None, Some(json!({ "email": "loop@example.com" }))))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reactivated"], true);
    assert_eq!(body["subscriber"]["isActive"], true);
    assert_eq!(body["subscriber"]["id"], created["subscriber"]["id"]);
}

#[tokio::test]
async fn test_subscribe_rejects_invalid_email() {
    let app = app().await;
    let (status, _) = app
        .call(request("POST", "/api/newsletter", None, Some(json!({ "email": "nope" }))))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_routes_require_admin_token() {
    let app = app().await;

    let (status, body) = app.json(request("GET", "/api/newsletter", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Admin access required");

    let customer = app.customer_token();
    let (status, _) = app
        .call(request("GET", "/api/newsletter/campaigns", Some(&customer), None))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .call(request(
            "POST",
            "/api/newsletter/send",
            Some("not-a-jwt"),
            Some(json!({ "campaignId": uuid::Uuid::now_v7() })),
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let admin = app.admin_token();
    let (status, body) = app.json(request("GET", "/api/newsletter", Some(&admin), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_array());
}

#[tokio::test]
async fn test_admin_token_accepted_from_cookie() {
    let app = app().await;
    let token = app.admin_token();

    let request = Request::builder()
        .uri("/api/newsletter/campaigns")
        .header(header::COOKIE, format!("access_token={}", token))
        .body(Body::empty())
        .unwrap();
    let (status, _) = app.call(request).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_subscriber_list_filters_active() {
    let app = app().await;
    for email in ["a@example.com", "b@example.com"] {
        app.call(request("POST", "/api/newsletter", None, Some(json!({ "email": email }))))
            .await;
    }
    app.call(request("DELETE", "/api/newsletter?email=b%40example.com", None, None))
        .await;

    let admin = app.admin_token();
    let (_, active) = app
        .json(request("GET", "/api/newsletter?active=true", Some(&admin), None))
        .await;
    let (_, all) = app.json(request("GET", "/api/newsletter", Some(&admin), None)).await;

    assert_eq!(active.as_array().unwrap().len(), 1);
    assert_eq!(active[0]["email"], "a@example.com");
    assert_eq!(all.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_campaign_lifecycle_and_guards() {
    let app = app().await;
    let admin = app.admin_token();

    let (status, _) = app
        .call(request(
            "POST",
            "/api/newsletter/campaigns",
            Some(&admin),
            Some(json!({ "name": "Spring", "subject": "" , "content": "Hi" })),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, campaign) = app
        .json(request(
            "POST",
            "/api/newsletter/campaigns",
            Some(&admin),
            Some(json!({ "name": "Spring", "subject": "Hello", "content": "<p>Hi</p>", "tags": ["spring"] })),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(campaign["status"], "draft");
    assert_eq!(campaign["createdBy"], "admin-1");
    let id = campaign["id"].as_str().unwrap().to_string();

    let (status, fetched) = app
        .json(request("GET", &format!("/api/newsletter/campaigns?id={}", id), Some(&admin), None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["name"], "Spring");

    let (status, updated) = app
        .json(request(
            "PUT",
            "/api/newsletter/campaigns",
            Some(&admin),
            Some(json!({ "id": id, "subject": "Hello again" })),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["subject"], "Hello again");

    let (status, cancelled) = app
        .json(request("DELETE", &format!("/api/newsletter/campaigns?id={}", id), Some(&admin), None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "cancelled");

    let (status, body) = app
        .json(request("DELETE", &format!("/api/newsletter/campaigns?id={}", id), Some(&admin), None))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "STATE_CONFLICT");
}

#[tokio::test]
async fn test_unknown_campaign_is_404() {
    let app = app().await;
    let admin = app.admin_token();
    let (status, body) = app
        .json(request(
            "GET",
            &format!("/api/newsletter/campaigns?id={}", uuid::Uuid::now_v7()),
            Some(&admin),
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Campaign not found");
}

#[tokio::test]
async fn test_templates_are_public_and_defaults_protected() {
    let app = app().await;

    let (status, templates) = app.json(request("GET", "/api/newsletter/templates", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    let templates = templates.as_array().unwrap().clone();
    assert_eq!(templates.len(), 2);
    let default_id = templates[0]["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .call(request(
            "POST",
            "/api/newsletter/templates",
            None,
            Some(json!({ "name": "Promo", "htmlContent": "{{content}}", "category": "marketing" })),
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let admin = app.admin_token();
    let (status, body) = app
        .json(request(
            "PUT",
            "/api/newsletter/templates",
            Some(&admin),
            Some(json!({ "id": default_id, "name": "Mine now" })),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Cannot modify default templates");

    let (status, body) = app
        .json(request(
            "DELETE",
            &format!("/api/newsletter/templates?id={}", default_id),
            Some(&admin),
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Cannot delete default templates");

    let (status, body) = app
        .json(request(
            "PUT",
            "/api/newsletter/templates",
            Some(&admin),
            Some(json!({ "id": default_id, "description": "Tweaked", "allowDefaultEdit": true })),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["description"], "Tweaked");
}

#[tokio::test]
async fn test_deleted_templates_need_include_flag() {
    let app = app().await;
    let admin = app.admin_token();

    let (status, created) = app
        .json(request(
            "POST",
            "/api/newsletter/templates",
            Some(&admin),
            Some(json!({ "name": "Promo", "htmlContent": "{{content}}", "category": "marketing" })),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_str().unwrap().to_string();

    let (status, deleted) = app
        .json(request("DELETE", &format!("/api/newsletter/templates?id={}", id), Some(&admin), None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["name"], "[DELETED] Promo");

    let (_, visible) = app.json(request("GET", "/api/newsletter/templates", None, None)).await;
    assert_eq!(visible.as_array().unwrap().len(), 2);

    let (_, everything) = app
        .json(request("GET", "/api/newsletter/templates?includeDeleted=true", None, None))
        .await;
    assert_eq!(everything.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_send_flow_over_http() {
    let app = app().await;
    let admin = app.admin_token();

    let (_, campaign) = app
        .json(request(
            "POST",
            "/api/newsletter/campaigns",
            Some(&admin),
            Some(json!({ "name": "Launch", "subject": "New fuzz", "content": "<p>Out now</p>" })),
        ))
        .await;
    let id = campaign["id"].as_str().unwrap().to_string();

    // Nobody subscribed yet
    let (status, body) = app
        .json(request("POST", "/api/newsletter/send", Some(&admin), Some(json!({ "campaignId": id }))))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No active subscribers found");

    for email in ["a@example.com", "b@example.com", "c@example.com"] {
        app.call(request("POST", "/api/newsletter", None, Some(json!({ "email": email }))))
            .await;
    }

    let (status, body) = app
        .json(request(
            "POST",
            "/api/newsletter/send",
            Some(&admin),
            Some(json!({ "campaignId": id, "sendTest": "true", "testEmail": "qa@example.com" })),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["recipient"], "qa@example.com");
    assert_eq!(app.transport.sent_count().await, 1);

    let (status, body) = app
        .json(request("POST", "/api/newsletter/send", Some(&admin), Some(json!({ "campaignId": id }))))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["recipientCount"], 3);
    assert_eq!(body["sendResults"]["successful"], 3);
    assert_eq!(body["sendResults"]["failed"], 0);
    assert_eq!(body["completed"], true);

    let (status, stats) = app
        .json(request("GET", &format!("/api/newsletter/send?campaignId={}", id), Some(&admin), None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["status"], "sent");
    assert_eq!(stats["deliveredCount"], 3);

    let (status, body) = app
        .json(request("POST", "/api/newsletter/send", Some(&admin), Some(json!({ "campaignId": id }))))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Campaign has already been sent");
    assert_eq!(app.transport.sent_count().await, 4);

    let (status, body) = app
        .json(request("PUT", "/api/newsletter/campaigns", Some(&admin), Some(json!({ "id": id, "name": "Edit" }))))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Cannot edit sent campaigns");
}

#[tokio::test]
async fn test_send_requires_campaign_id() {
    let app = app().await;
    let admin = app.admin_token();
    let (status, body) = app
        .json(request("POST", "/api/newsletter/send", Some(&admin), Some(json!({}))))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Campaign ID is required");
}

#[tokio::test]
async fn test_cancel_without_running_send() {
    let app = app().await;
    let admin = app.admin_token();
    let (status, body) = app
        .json(request(
            "POST",
            "/api/newsletter/send/cancel",
            Some(&admin),
            Some(json!({ "campaignId": uuid::Uuid::now_v7() })),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cancelled"], false);
}

#[tokio::test]
async fn test_unsubscribe_link_flow() {
    let app = app().await;
    app.call(request("POST", "/api/newsletter", None, Some(json!({ "email": "rider@example.com" }))))
        .await;

    let url = app.state.tokens.build_unsubscribe_url("rider@example.com", None);
    let path = url.trim_start_matches("http://localhost:3000");

    let (status, bytes) = app.call(request("GET", path, None, None)).await;
    let page = String::from_utf8(bytes).unwrap();
    assert_eq!(status, StatusCode::OK);
    assert!(page.contains("rider@example.com"));
    assert!(page.contains("will no longer receive"));

    let subscriber = app.state.subscribers.get_by_email("rider@example.com").await.unwrap();
    assert!(!subscriber.is_active);

    // Second click is harmless
    let (status, bytes) = app.call(request("GET", path, None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8(bytes).unwrap().contains("already unsubscribed"));
}

#[tokio::test]
async fn test_unsubscribe_rejects_forged_token() {
    let app = app().await;
    app.call(request("POST", "/api/newsletter", None, Some(json!({ "email": "victim@example.com" }))))
        .await;

    let (status, bytes) = app
        .call(request(
            "GET",
            "/api/newsletter/unsubscribe?email=victim%40example.com&token=deadbeef",
            None,
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(String::from_utf8(bytes).unwrap().contains("Invalid unsubscribe token"));

    let (status, body) = app
        .json(request(
            "POST",
            "/api/newsletter/unsubscribe",
            None,
            Some(json!({ "email": "victim@example.com", "token": "deadbeef" })),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid unsubscribe token");

    assert!(app.state.subscribers.get_by_email("victim@example.com").await.unwrap().is_active);
}

#[tokio::test]
async fn test_unsubscribe_post_and_unknown_email() {
    let app = app().await;
    app.call(request("POST", "/api/newsletter", None, Some(json!({ "email": "rider@example.com" }))))
        .await;

    let token = app.state.tokens.encode("rider@example.com");
    let (status, body) = app
        .json(request(
            "POST",
            "/api/newsletter/unsubscribe",
            None,
            Some(json!({ "email": "rider@example.com", "token": token, "reason": "moving" })),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, body) = app
        .json(request(
            "POST",
            "/api/newsletter/unsubscribe",
            None,
            Some(json!({ "email": "ghost@example.com" })),
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Subscriber not found");
}

#[tokio::test]
async fn test_unsubscribe_page_escapes_error_text() {
    let app = app().await;
    let (status, bytes) = app
        .call(request(
            "GET",
            "/api/newsletter/unsubscribe?email=%3Cscript%3E%40x.com&token=%3Cb%3E",
            None,
            None,
        ))
        .await;
    let page = String::from_utf8(bytes).unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!page.contains("<script>"));
}

#[tokio::test]
async fn test_malformed_body_gets_standard_error_shape() {
    let app = app().await;
    let admin = app.admin_token();

    let truncated = Request::builder()
        .method("POST")
        .uri("/api/newsletter/campaigns")
        .header(header::AUTHORIZATION, format!("Bearer {}", admin))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"name":"Spring","subject":"Hel"#))
        .unwrap();
    let (status, body) = app.json(truncated).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_JSON");
    assert_eq!(body["status"], 400);
    assert!(body["error"].is_string());

    let (status, body) = app
        .json(request(
            "POST",
            "/api/newsletter/send",
            Some(&admin),
            Some(json!({ "campaignId": "not-a-uuid" })),
        ))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "INVALID_JSON");
}
