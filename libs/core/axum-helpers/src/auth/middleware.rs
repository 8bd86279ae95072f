use super::{jwt::JwtAuth, user::AuthUser};
use crate::errors::AppError;
use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};

const ACCESS_TOKEN_COOKIE: &str = "access_token";

/// Bearer header first, then the `access_token` cookie.
fn extract_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string());

    bearer.or_else(|| {
        headers
            .get(header::COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|cookies| {
                cookies.split(';').find_map(|pair| {
                    let (name, value) = pair.trim().split_once('=')?;
                    (name == ACCESS_TOKEN_COOKIE).then(|| value.to_string())
                })
            })
    })
}

/// Rejects requests without a valid token; inserts [`AuthUser`] otherwise.
pub async fn jwt_auth_middleware(
    State(auth): State<JwtAuth>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_token(request.headers())
        .ok_or_else(|| AppError::Unauthorized("No token provided".to_string()))?;

    let claims = auth.verify_token(&token).map_err(|e| {
        tracing::debug!("JWT verification failed: {}", e);
        AppError::Unauthorized("Invalid token".to_string())
    })?;

    request.extensions_mut().insert(AuthUser::from(claims));
    Ok(next.run(request).await)
}

/// Like [`jwt_auth_middleware`] but lets anonymous requests through.
///
/// Routes that need a caller ask for `AuthUser`/`AdminUser` and get a 401
/// from the extractor when nothing was inserted.
pub async fn optional_jwt_auth_middleware(
    State(auth): State<JwtAuth>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = extract_token(request.headers()) {
        match auth.verify_token(&token) {
            Ok(claims) => {
                request.extensions_mut().insert(AuthUser::from(claims));
            }
            Err(e) => tracing::debug!("Ignoring invalid token: {}", e),
        }
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AdminUser, JwtConfig};
    use axum::{Router, body::Body, http::StatusCode, middleware, routing::get};
    use tower::ServiceExt;

    const SECRET: &str = "middleware-test-secret-0123456789abcdef";

    fn auth() -> JwtAuth {
        JwtAuth::new(&JwtConfig::new(SECRET).unwrap())
    }

    async fn admin_only(AdminUser(user): AdminUser) -> String {
        user.email
    }

    fn app() -> Router {
        Router::new()
            .route("/admin", get(admin_only))
            .layer(middleware::from_fn_with_state(auth(), optional_jwt_auth_middleware))
    }

    async fn call(header: Option<(&str, String)>) -> StatusCode {
        let mut builder = Request::builder().uri("/admin");
        if let Some((name, value)) = header {
            builder = builder.header(name, value);
        }
        app()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[test]
    fn test_extract_token_prefers_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer abc".parse().unwrap());
        headers.insert(header::COOKIE, "access_token=xyz".parse().unwrap());
        assert_eq!(extract_token(&headers).as_deref(), Some("abc"));
    }

    #[test]
    fn test_extract_token_from_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, "theme=dark; access_token=xyz".parse().unwrap());
        assert_eq!(extract_token(&headers).as_deref(), Some("xyz"));
    }

    #[tokio::test]
    async fn test_admin_route_without_token_is_401() {
        assert_eq!(call(None).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_admin_route_with_customer_token_is_401() {
        let token = auth().issue_token("7", "c@d.com", &["customer".into()]).unwrap();
        let status = call(Some(("authorization", format!("Bearer {}", token)))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_admin_route_with_admin_cookie_passes() {
        let token = auth().issue_token("1", "a@b.com", &["admin".into()]).unwrap();
        let status = call(Some(("cookie", format!("access_token={}", token)))).await;
        assert_eq!(status, StatusCode::OK);
    }
}
