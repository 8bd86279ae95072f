//! Authentication and authorization.
//!
//! Bearer tokens are HS256 JWTs verified statelessly. The middleware turns a
//! valid token into an [`AuthUser`] request extension; handlers then ask for
//! [`AuthUser`] or [`AdminUser`] as an extractor instead of parsing headers.
//!
//! ```ignore
//! let auth = JwtAuth::new(&JwtConfig::from_env()?);
//! let router = Router::new()
//!     .route("/send", post(send))
//!     .layer(axum::middleware::from_fn_with_state(auth, optional_jwt_auth_middleware));
//!
//! async fn send(AdminUser(admin): AdminUser) { /* ... */ }
//! ```

pub mod config;
pub mod jwt;
pub mod middleware;
pub mod user;

pub use config::JwtConfig;
pub use jwt::{ACCESS_TOKEN_TTL, JwtAuth, JwtClaims};
pub use middleware::{jwt_auth_middleware, optional_jwt_auth_middleware};
pub use user::{ADMIN_ROLE, AdminUser, AuthUser};
