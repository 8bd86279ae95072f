//! Server infrastructure: router assembly, health/readiness, graceful shutdown.

pub mod app;
pub mod health;
pub mod shutdown;

pub use app::{create_production_app, create_router};
pub use health::{
    HealthCheckFuture, HealthResponse, ReadinessCheck, health_router, ready_router,
};
pub use shutdown::{ShutdownCoordinator, shutdown_signal};
