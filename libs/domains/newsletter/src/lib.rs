//! Newsletter Domain
//!
//! Subscribers, templates, campaigns and the machinery that sends them.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  ← /api/newsletter routes, admin gate, audit log
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐     ┌────────────┐     ┌───────────┐
//! │  Services   │ ──► │  Content   │     │ Transport │  ← MailerLite or simulated
//! └──────┬──────┘     │  + Tokens  │     └───────────┘
//!        │            └────────────┘
//! ┌──────▼──────┐
//! │ Repository  │  ← in-memory and Postgres implementations
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │   Models    │  ← records, DTOs, enums
//! └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use domain_newsletter::{
//!     NewsletterConfig, NewsletterState, Repositories, handlers, transport::SimulatedTransport,
//! };
//! use axum_helpers::{JwtAuth, JwtConfig};
//! use std::sync::Arc;
//!
//! # fn build() -> Result<axum::Router, Box<dyn std::error::Error>> {
//! let auth = JwtAuth::new(&JwtConfig::new("a-secret-that-is-at-least-32-characters")?);
//! let state = NewsletterState::new(
//!     Repositories::in_memory(),
//!     Arc::new(SimulatedTransport::new()),
//!     &NewsletterConfig::default(),
//!     auth,
//! )?;
//! let router = handlers::router(state);
//! # Ok(router)
//! # }
//! ```

pub mod config;
pub mod content;
pub mod entity;
pub mod error;
pub mod handlers;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod service;
pub mod token;
pub mod transport;

pub use config::{MailerLiteConfig, NewsletterConfig};
pub use error::{NewsletterError, NewsletterResult};
pub use handlers::{ApiDoc, NewsletterState};
pub use models::{
    AnalyticsEvent, BulkSendResponse, Campaign, CampaignStats, CampaignStatus, CreateCampaign,
    CreateTemplate, DeliveryDetail, DeliveryStatus, EventType, SendOutcome, SendRequest,
    SendResults, SubscribeRequest, Subscriber, Template, TestSendResult, UpdateCampaign,
    UpdateSubscriber, UpdateTemplate,
};
pub use postgres::{
    PgAnalyticsRepository, PgCampaignRepository, PgSubscriberRepository, PgTemplateRepository,
};
pub use repository::{
    AnalyticsRepository, CampaignRepository, InMemoryAnalyticsRepository,
    InMemoryCampaignRepository, InMemorySubscriberRepository, InMemoryTemplateRepository,
    Repositories, SubscriberRepository, TemplateRepository,
};
pub use service::{CampaignSender, CampaignService, SendControl, SendSettings, SubscriberService, TemplateService};
pub use token::UnsubscribeTokens;
pub use transport::{EmailTransport, SimulatedTransport};
