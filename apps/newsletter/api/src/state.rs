//! Shared application state.

use domain_newsletter::NewsletterState;
use sea_orm::DatabaseConnection;

use crate::config::Config;

/// Cloned into every router; all members are cheap `Arc` clones.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Absent when running on in-memory storage
    pub db: Option<DatabaseConnection>,
    pub newsletter: NewsletterState,
}
