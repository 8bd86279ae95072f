//! MailerLite contact registration and MailerSend delivery over HTTP.

use async_trait::async_trait;
use eyre::{Result, eyre};
use reqwest::Client;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, error};

use super::{ContactRegistration, DeliveryReceipt, EmailTransport, OutboundEmail};
use crate::config::MailerLiteConfig;

pub struct MailerLiteTransport {
    api_key: String,
    group_id: Option<String>,
    api_base: String,
    send_url: String,
    from_email: String,
    from_name: String,
    client: Client,
}

impl MailerLiteTransport {
    /// `None` when no API key is configured.
    pub fn from_config(config: &MailerLiteConfig) -> Option<Self> {
        let api_key = config.api_key.clone()?;
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_else(|_| Client::new());

        Some(Self {
            api_key,
            group_id: config.group_id.clone(),
            api_base: config.api_base.clone(),
            send_url: config.send_url.clone(),
            from_email: config.from_email.clone(),
            from_name: config.from_name.clone(),
            client,
        })
    }
}

#[derive(Debug, Serialize)]
struct SubscriberPayload<'a> {
    email: &'a str,
    fields: BTreeMap<&'static str, &'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    groups: Vec<&'a str>,
}

#[derive(Debug, Serialize)]
struct Address<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct SendPayload<'a> {
    from: Address<'a>,
    to: Vec<Address<'a>>,
    subject: &'a str,
    html: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tags: Vec<String>,
}

#[async_trait]
impl EmailTransport for MailerLiteTransport {
    async fn send(&self, email: &OutboundEmail) -> Result<DeliveryReceipt> {
        let payload = SendPayload {
            from: Address {
                email: &self.from_email,
                name: Some(&self.from_name),
            },
            to: vec![Address {
                email: &email.to,
                name: email.to_name.as_deref(),
            }],
            subject: &email.subject,
            html: &email.html,
            tags: email
                .campaign_id
                .map(|id| vec![format!("campaign-{}", id)])
                .unwrap_or_default(),
        };

        debug!(to = %email.to, subject = %email.subject, "Sending email via MailerSend");

        let response = self
            .client
            .post(&self.send_url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| eyre!("MailerSend request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(eyre!("MailerSend API error ({}): {}", status, body));
        }

        let message_id = response
            .headers()
            .get("X-Message-Id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| format!("ml-{}", uuid::Uuid::now_v7()));

        Ok(DeliveryReceipt { message_id })
    }

    async fn register_contact(&self, contact: &ContactRegistration) -> Result<()> {
        let mut fields = BTreeMap::new();
        if let Some(first_name) = contact.first_name.as_deref() {
            fields.insert("name", first_name);
        }
        if let Some(last_name) = contact.last_name.as_deref() {
            fields.insert("last_name", last_name);
        }
        fields.insert("source", contact.source.as_str());

        let payload = SubscriberPayload {
            email: &contact.email,
            fields,
            groups: self.group_id.as_deref().into_iter().collect(),
        };

        let response = self
            .client
            .post(format!("{}/subscribers", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| eyre!("MailerLite request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, error = %body, "MailerLite API error");
            return Err(eyre!("MailerLite API error ({}): {}", status, body));
        }

        debug!(email = %contact.email, "Registered contact with MailerLite");
        Ok(())
    }

    async fn health_check(&self) -> Result<()> {
        let response = self
            .client
            .get(format!("{}/groups?limit=1", self.api_base))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| eyre!("MailerLite health check failed: {}", e))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(eyre!("MailerLite health check returned {}", response.status()))
        }
    }

    fn name(&self) -> &'static str {
        "mailerlite"
    }
}
