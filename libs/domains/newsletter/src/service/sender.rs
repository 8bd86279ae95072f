//! Campaign dispatch.
//!
//! A bulk send claims the campaign with a conditional `draft|scheduled ->
//! sending` write before the first message goes out, so a second caller
//! racing on the same campaign gets `StateConflict` instead of a duplicate
//! send. Recipients are processed in batches; after each batch the cursor
//! and counters are persisted, which is what lets an interrupted run be
//! resumed without re-sending to anyone already attempted.

use axum_helpers::AuthUser;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use uuid::Uuid;

use crate::config::NewsletterConfig;
use crate::content::{self, ContentDefaults, MergedDocument};
use crate::error::{NewsletterError, NewsletterResult};
use crate::models::{
    AnalyticsEvent, BulkSendResponse, Campaign, CampaignStats, CampaignStatus, DeliveryDetail,
    DeliveryStatus, EventType, SendOutcome, SendRequest, SendResults, Subscriber, TestSendResult,
    looks_like_email, normalize_email,
};
use crate::repository::Repositories;
use crate::token::UnsubscribeTokens;
use crate::transport::{EmailTransport, OutboundEmail};

const PREVIEW_CHARS: usize = 200;

#[derive(Debug, Clone, Copy)]
pub struct SendSettings {
    pub batch_size: usize,
    /// In-flight deliveries within a batch
    pub concurrency: usize,
}

impl Default for SendSettings {
    fn default() -> Self {
        Self {
            batch_size: 50,
            concurrency: 4,
        }
    }
}

impl From<&NewsletterConfig> for SendSettings {
    fn from(config: &NewsletterConfig) -> Self {
        Self {
            batch_size: config.batch_size,
            concurrency: config.concurrency,
        }
    }
}

/// Registry of runs in this process, used to cancel them and to keep two
/// runs of the same campaign from overlapping.
#[derive(Clone, Default)]
pub struct SendControl {
    runs: Arc<Mutex<HashMap<Uuid, watch::Sender<bool>>>>,
}

impl SendControl {
    pub fn new() -> Self {
        Self::default()
    }

    fn runs(&self) -> MutexGuard<'_, HashMap<Uuid, watch::Sender<bool>>> {
        self.runs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn try_register(&self, campaign_id: Uuid) -> Option<RunGuard> {
        let mut runs = self.runs();
        if runs.contains_key(&campaign_id) {
            return None;
        }
        let (tx, rx) = watch::channel(false);
        runs.insert(campaign_id, tx);
        Some(RunGuard {
            campaign_id,
            control: self.clone(),
            cancelled: rx,
        })
    }

    pub fn is_running(&self, campaign_id: Uuid) -> bool {
        self.runs().contains_key(&campaign_id)
    }

    /// Ask a run to stop at its next batch boundary.
    pub fn cancel(&self, campaign_id: Uuid) -> bool {
        match self.runs().get(&campaign_id) {
            Some(tx) => tx.send(true).is_ok(),
            None => false,
        }
    }

    pub fn running(&self) -> usize {
        self.runs().len()
    }

    pub fn cancel_all(&self) -> usize {
        let runs = self.runs();
        for tx in runs.values() {
            let _ = tx.send(true);
        }
        runs.len()
    }
}

struct RunGuard {
    campaign_id: Uuid,
    control: SendControl,
    cancelled: watch::Receiver<bool>,
}

impl RunGuard {
    fn is_cancelled(&self) -> bool {
        *self.cancelled.borrow()
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.control.runs().remove(&self.campaign_id);
    }
}

#[derive(Clone)]
pub struct CampaignSender {
    repos: Repositories,
    transport: Arc<dyn EmailTransport>,
    tokens: UnsubscribeTokens,
    defaults: ContentDefaults,
    settings: SendSettings,
    control: SendControl,
}

impl CampaignSender {
    pub fn new(
        repos: Repositories,
        transport: Arc<dyn EmailTransport>,
        tokens: UnsubscribeTokens,
        defaults: ContentDefaults,
        settings: SendSettings,
    ) -> Self {
        Self {
            repos,
            transport,
            tokens,
            defaults,
            settings,
            control: SendControl::new(),
        }
    }

    pub fn control(&self) -> &SendControl {
        &self.control
    }

    fn ensure_admin(actor: &AuthUser) -> NewsletterResult<()> {
        if actor.is_admin() {
            Ok(())
        } else {
            Err(NewsletterError::admin_required())
        }
    }

    async fn load_campaign(&self, campaign_id: Option<Uuid>) -> NewsletterResult<Campaign> {
        let campaign_id =
            campaign_id.ok_or_else(|| NewsletterError::Validation("Campaign ID is required".into()))?;
        self.repos
            .campaigns
            .get_by_id(campaign_id)
            .await?
            .ok_or_else(|| NewsletterError::not_found("Campaign", campaign_id))
    }

    async fn merge(&self, campaign: &Campaign) -> NewsletterResult<MergedDocument> {
        let template = match campaign.template_id {
            Some(template_id) => Some(
                self.repos
                    .templates
                    .get_by_id(template_id)
                    .await?
                    .ok_or_else(|| NewsletterError::not_found("Template", template_id))?,
            ),
            None => None,
        };
        Ok(content::merge(campaign, template.as_ref(), &self.defaults))
    }

    /// Test or bulk send, depending on `request.send_test`.
    pub async fn send(&self, actor: &AuthUser, request: SendRequest) -> NewsletterResult<SendOutcome> {
        Self::ensure_admin(actor)?;
        let campaign = self.load_campaign(request.campaign_id).await?;

        if campaign.status == CampaignStatus::Sent {
            return Err(NewsletterError::StateConflict(
                "Campaign has already been sent".into(),
            ));
        }

        if request.is_test() {
            let email = request
                .test_email
                .as_deref()
                .map(normalize_email)
                .filter(|e| !e.is_empty())
                .ok_or_else(|| NewsletterError::Validation("Test email is required".into()))?;
            if !looks_like_email(&email) {
                return Err(NewsletterError::Validation("Valid test email is required".into()));
            }
            return self.send_test(&campaign, &email).await.map(SendOutcome::Test);
        }

        self.send_bulk(campaign).await.map(SendOutcome::Bulk)
    }

    /// One message to one address. Campaign and subscriber state are left
    /// alone.
    async fn send_test(&self, campaign: &Campaign, email: &str) -> NewsletterResult<TestSendResult> {
        let merged = self.merge(campaign).await?;
        let unsubscribe_url = self.tokens.build_unsubscribe_url(email, Some(campaign.id));
        let html = merged.personalize(&unsubscribe_url);

        let outbound = OutboundEmail {
            to: email.to_string(),
            to_name: None,
            subject: campaign.subject.clone(),
            html,
            campaign_id: Some(campaign.id),
        };

        let receipt = self
            .transport
            .send(&outbound)
            .await
            .map_err(|e| NewsletterError::Transport(e.to_string()))?;

        let event = AnalyticsEvent::new(EventType::TestSent, Some(campaign.id), None, email)
            .with_metadata(json!({ "messageId": receipt.message_id }));
        if let Err(e) = self.repos.analytics.record(event).await {
            tracing::warn!(campaign_id = %campaign.id, error = %e, "Failed to record test send event");
        }

        tracing::info!(campaign_id = %campaign.id, recipient = %email, "Sent test email");

        Ok(TestSendResult {
            message: format!("Test email sent to {}", email),
            recipient: email.to_string(),
            subject: outbound.subject,
            preview: preview(&outbound.html),
            message_id: receipt.message_id,
            timestamp: Utc::now(),
        })
    }

    async fn send_bulk(&self, campaign: Campaign) -> NewsletterResult<BulkSendResponse> {
        let recipients = self.repos.subscribers.list_active_after(None, None).await?;
        let Some(send_bound) = recipients.last().map(|s| s.id) else {
            return Err(NewsletterError::NoRecipients);
        };
        let recipient_count = i32::try_from(recipients.len())
            .map_err(|_| NewsletterError::Internal("Recipient count out of range".into()))?;

        let merged = self.merge(&campaign).await?;

        let run = self.control.try_register(campaign.id).ok_or_else(|| {
            NewsletterError::StateConflict("A send is already running for this campaign".into())
        })?;
        let campaign = self
            .repos
            .campaigns
            .begin_sending(campaign.id, recipient_count, send_bound)
            .await?;

        tracing::info!(
            campaign_id = %campaign.id,
            recipients = recipient_count,
            batch_size = self.settings.batch_size,
            "Starting campaign send"
        );

        self.run(&campaign, &merged, recipients, Progress::default(), &run)
            .await
    }

    /// Continue a campaign left in `sending` from its persisted cursor.
    pub async fn resume(&self, actor: &AuthUser, campaign_id: Option<Uuid>) -> NewsletterResult<BulkSendResponse> {
        Self::ensure_admin(actor)?;
        let campaign = self.load_campaign(campaign_id).await?;

        if campaign.status != CampaignStatus::Sending {
            return Err(NewsletterError::StateConflict(format!(
                "Only campaigns that are sending can be resumed (status: {})",
                campaign.status
            )));
        }

        let run = self.control.try_register(campaign.id).ok_or_else(|| {
            NewsletterError::StateConflict("A send is already running for this campaign".into())
        })?;

        let merged = self.merge(&campaign).await?;
        // Subscribers who joined after the send began are not part of it
        let recipients = self
            .repos
            .subscribers
            .list_active_after(campaign.send_cursor, campaign.send_bound)
            .await?;
        let progress = Progress {
            delivered: campaign.delivered_count,
            failed: campaign.failed_count,
        };

        tracing::info!(
            campaign_id = %campaign.id,
            cursor = ?campaign.send_cursor,
            remaining = recipients.len(),
            "Resuming campaign send"
        );

        self.run(&campaign, &merged, recipients, progress, &run).await
    }

    async fn run(
        &self,
        campaign: &Campaign,
        merged: &MergedDocument,
        recipients: Vec<Subscriber>,
        mut progress: Progress,
        run: &RunGuard,
    ) -> NewsletterResult<BulkSendResponse> {
        let mut results = SendResults::default();
        let mut interrupted = false;

        for batch in recipients.chunks(self.settings.batch_size.max(1)) {
            if run.is_cancelled() {
                interrupted = true;
                break;
            }

            let pending: Vec<_> = batch
                .iter()
                .map(|subscriber| self.deliver(campaign, merged, subscriber))
                .collect();
            let deliveries: Vec<DeliveryDetail> = stream::iter(pending)
                .buffer_unordered(self.settings.concurrency.max(1))
                .collect()
                .await;

            for detail in deliveries {
                match detail.status {
                    DeliveryStatus::Sent => {
                        results.successful += 1;
                        progress.delivered += 1;
                    }
                    DeliveryStatus::Failed => {
                        results.failed += 1;
                        progress.failed += 1;
                    }
                }
                results.details.push(detail);
            }

            if let Some(last) = batch.last() {
                self.repos
                    .campaigns
                    .record_progress(campaign.id, last.id, progress.delivered, progress.failed)
                    .await?;
                tracing::info!(
                    campaign_id = %campaign.id,
                    cursor = %last.id,
                    delivered = progress.delivered,
                    failed = progress.failed,
                    "Send checkpoint"
                );
            }
        }

        if interrupted {
            tracing::warn!(
                campaign_id = %campaign.id,
                delivered = progress.delivered,
                failed = progress.failed,
                "Campaign send interrupted"
            );
            return Ok(BulkSendResponse {
                message: format!(
                    "Send interrupted after {} of {} recipients; resume to continue",
                    progress.delivered + progress.failed,
                    campaign.recipient_count
                ),
                campaign_id: campaign.id,
                recipient_count: campaign.recipient_count,
                send_results: results,
                completed: false,
            });
        }

        let sent = self.repos.campaigns.mark_sent(campaign.id).await?;
        tracing::info!(
            campaign_id = %sent.id,
            delivered = progress.delivered,
            failed = progress.failed,
            "Campaign sent"
        );

        Ok(BulkSendResponse {
            message: format!(
                "Campaign sent: {} delivered, {} failed",
                progress.delivered, progress.failed
            ),
            campaign_id: sent.id,
            recipient_count: sent.recipient_count,
            send_results: results,
            completed: true,
        })
    }

    async fn deliver(&self, campaign: &Campaign, merged: &MergedDocument, subscriber: &Subscriber) -> DeliveryDetail {
        let unsubscribe_url = self
            .tokens
            .build_unsubscribe_url(&subscriber.email, Some(campaign.id));

        let email = OutboundEmail {
            to: subscriber.email.clone(),
            to_name: subscriber.display_name(),
            subject: campaign.subject.clone(),
            html: merged.personalize(&unsubscribe_url),
            campaign_id: Some(campaign.id),
        };

        match self.transport.send(&email).await {
            Ok(receipt) => {
                let event = AnalyticsEvent::new(
                    EventType::Sent,
                    Some(campaign.id),
                    Some(subscriber.id),
                    &subscriber.email,
                )
                .with_metadata(json!({ "messageId": receipt.message_id }));

                if let Err(e) = self.repos.analytics.record(event).await {
                    tracing::warn!(campaign_id = %campaign.id, error = %e, "Failed to record sent event");
                }

                DeliveryDetail {
                    email: subscriber.email.clone(),
                    status: DeliveryStatus::Sent,
                    message_id: Some(receipt.message_id),
                    error: None,
                }
            }
            Err(e) => {
                tracing::warn!(
                    campaign_id = %campaign.id,
                    recipient = %subscriber.email,
                    transport = self.transport.name(),
                    error = %e,
                    "Delivery failed"
                );
                DeliveryDetail {
                    email: subscriber.email.clone(),
                    status: DeliveryStatus::Failed,
                    message_id: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    pub async fn stats(&self, actor: &AuthUser, campaign_id: Option<Uuid>) -> NewsletterResult<CampaignStats> {
        Self::ensure_admin(actor)?;
        let campaign = self.load_campaign(campaign_id).await?;
        Ok(CampaignStats::from(&campaign))
    }

    pub fn cancel(&self, actor: &AuthUser, campaign_id: Option<Uuid>) -> NewsletterResult<bool> {
        Self::ensure_admin(actor)?;
        let campaign_id =
            campaign_id.ok_or_else(|| NewsletterError::Validation("Campaign ID is required".into()))?;
        let cancelled = self.control.cancel(campaign_id);
        if cancelled {
            tracing::info!(campaign_id = %campaign_id, "Cancellation requested");
        }
        Ok(cancelled)
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Progress {
    delivered: i32,
    failed: i32,
}

fn preview(html: &str) -> String {
    let mut preview: String = html.chars().take(PREVIEW_CHARS).collect();
    if html.chars().nth(PREVIEW_CHARS).is_some() {
        preview.push_str("...");
    }
    preview
}
