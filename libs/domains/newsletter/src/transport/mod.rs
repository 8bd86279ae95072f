//! Outbound email delivery and contact registration.

pub mod mailerlite;
pub mod simulated;

pub use mailerlite::MailerLiteTransport;
pub use simulated::SimulatedTransport;

use async_trait::async_trait;
use eyre::Result;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::MailerLiteConfig;

/// A single personalized message.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundEmail {
    pub to: String,
    pub to_name: Option<String>,
    pub subject: String,
    pub html: String,
    pub campaign_id: Option<Uuid>,
}

/// Contact pushed to the provider's audience on subscribe.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactRegistration {
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub source: String,
}

#[derive(Debug, Clone)]
pub struct DeliveryReceipt {
    pub message_id: String,
}

#[async_trait]
pub trait EmailTransport: Send + Sync {
    async fn send(&self, email: &OutboundEmail) -> Result<DeliveryReceipt>;

    async fn register_contact(&self, contact: &ContactRegistration) -> Result<()>;

    async fn health_check(&self) -> Result<()>;

    fn name(&self) -> &'static str;
}

/// MailerLite when an API key is configured, the simulated transport
/// otherwise.
pub fn from_config(config: &MailerLiteConfig) -> Arc<dyn EmailTransport> {
    match MailerLiteTransport::from_config(config) {
        Some(transport) => {
            tracing::info!("Using MailerLite email transport");
            Arc::new(transport)
        }
        None => {
            tracing::warn!("MAILERLITE_API_KEY not set, emails will be simulated");
            Arc::new(SimulatedTransport::new())
        }
    }
}
