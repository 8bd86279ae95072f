//! PostgreSQL connectivity for the newsletter service.
//!
//! ```ignore
//! use database::postgres::{self, PostgresConfig};
//! use core_config::FromEnv;
//!
//! let db = postgres::connect_with_retry(PostgresConfig::from_env()?, RetryConfig::default()).await?;
//! postgres::run_migrations::<migration::Migrator>(&db, "newsletter").await?;
//! ```

pub mod common;
pub mod postgres;

pub use common::{DatabaseError, DatabaseResult, RetryConfig, retry_with_backoff};
