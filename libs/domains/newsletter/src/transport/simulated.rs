//! In-process transport used when no provider is configured, and in tests.

use async_trait::async_trait;
use eyre::{Result, eyre};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use super::{ContactRegistration, DeliveryReceipt, EmailTransport, OutboundEmail};

/// Records every message instead of delivering it.
#[derive(Clone, Default)]
pub struct SimulatedTransport {
    sent: Arc<Mutex<Vec<OutboundEmail>>>,
    contacts: Arc<Mutex<Vec<ContactRegistration>>>,
    failure: Option<String>,
    failing_recipients: HashSet<String>,
    delay: Option<Duration>,
}

impl SimulatedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every send and registration fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    /// Sends to these recipients fail, everything else succeeds.
    pub fn failing_for<I, S>(mut self, recipients: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.failing_recipients = recipients.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub async fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    pub async fn contacts(&self) -> Vec<ContactRegistration> {
        self.contacts.lock().await.clone()
    }

    pub async fn was_sent_to(&self, email: &str) -> bool {
        self.sent.lock().await.iter().any(|e| e.to == email)
    }
}

#[async_trait]
impl EmailTransport for SimulatedTransport {
    async fn send(&self, email: &OutboundEmail) -> Result<DeliveryReceipt> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = &self.failure {
            return Err(eyre!("{}", message));
        }
        if self.failing_recipients.contains(&email.to) {
            return Err(eyre!("Simulated rejection for {}", email.to));
        }

        tracing::info!(to = %email.to, subject = %email.subject, "Simulated email send");
        self.sent.lock().await.push(email.clone());

        Ok(DeliveryReceipt {
            message_id: format!("sim-{}", uuid::Uuid::now_v7()),
        })
    }

    async fn register_contact(&self, contact: &ContactRegistration) -> Result<()> {
        if let Some(message) = &self.failure {
            return Err(eyre!("{}", message));
        }
        self.contacts.lock().await.push(contact.clone());
        Ok(())
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "simulated"
    }
}
