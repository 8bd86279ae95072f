use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{NewsletterError, NewsletterResult};
use crate::models::{AnalyticsEvent, Campaign, CampaignStatus, EventType, Subscriber, SubscriberFilter, Template};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubscriberRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> NewsletterResult<Option<Subscriber>>;

    async fn get_by_id(&self, id: Uuid) -> NewsletterResult<Option<Subscriber>>;

    /// Newest first
    async fn list(&self, filter: SubscriberFilter) -> NewsletterResult<Vec<Subscriber>>;

    /// Active subscribers with `after < id <= through`, ascending by id.
    async fn list_active_after(
        &self,
        after: Option<Uuid>,
        through: Option<Uuid>,
    ) -> NewsletterResult<Vec<Subscriber>>;

    /// Fails with `StateConflict` when the email is taken.
    async fn insert(&self, subscriber: Subscriber) -> NewsletterResult<Subscriber>;

    async fn update(&self, subscriber: Subscriber) -> NewsletterResult<Subscriber>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TemplateRepository: Send + Sync {
    async fn list(&self, include_deleted: bool) -> NewsletterResult<Vec<Template>>;

    async fn get_by_id(&self, id: Uuid) -> NewsletterResult<Option<Template>>;

    async fn find_by_name(&self, name: &str) -> NewsletterResult<Option<Template>>;

    async fn insert(&self, template: Template) -> NewsletterResult<Template>;

    async fn update(&self, template: Template) -> NewsletterResult<Template>;
}

/// Campaign persistence. Status transitions are conditional writes so two
/// callers racing on the same campaign cannot both win.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CampaignRepository: Send + Sync {
    /// Newest first
    async fn list(&self) -> NewsletterResult<Vec<Campaign>>;

    async fn get_by_id(&self, id: Uuid) -> NewsletterResult<Option<Campaign>>;

    async fn insert(&self, campaign: Campaign) -> NewsletterResult<Campaign>;

    /// Writes the editable fields, but only while the stored status is still
    /// `expected`. Rejected once the campaign is sent.
    async fn update(&self, campaign: Campaign, expected: CampaignStatus) -> NewsletterResult<Campaign>;

    /// draft -> cancelled
    async fn cancel_draft(&self, id: Uuid) -> NewsletterResult<Campaign>;

    /// draft | scheduled -> sending, resetting delivery counters. `send_bound`
    /// is the highest subscriber id of the recipient snapshot.
    async fn begin_sending(
        &self,
        id: Uuid,
        recipient_count: i32,
        send_bound: Uuid,
    ) -> NewsletterResult<Campaign>;

    /// Checkpoint after a batch: absolute counters and the last subscriber id.
    async fn record_progress(
        &self,
        id: Uuid,
        cursor: Uuid,
        delivered: i32,
        failed: i32,
    ) -> NewsletterResult<()>;

    /// sending -> sent
    async fn mark_sent(&self, id: Uuid) -> NewsletterResult<Campaign>;

    async fn increment_unsubscribes(&self, id: Uuid) -> NewsletterResult<()>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AnalyticsRepository: Send + Sync {
    async fn record(&self, event: AnalyticsEvent) -> NewsletterResult<()>;

    async fn count_for_campaign(&self, campaign_id: Uuid, event_type: EventType) -> NewsletterResult<u64>;
}

/// Every store the newsletter services share.
#[derive(Clone)]
pub struct Repositories {
    pub subscribers: Arc<dyn SubscriberRepository>,
    pub templates: Arc<dyn TemplateRepository>,
    pub campaigns: Arc<dyn CampaignRepository>,
    pub analytics: Arc<dyn AnalyticsRepository>,
}

impl Repositories {
    pub fn in_memory() -> Self {
        Self {
            subscribers: Arc::new(InMemorySubscriberRepository::new()),
            templates: Arc::new(InMemoryTemplateRepository::new()),
            campaigns: Arc::new(InMemoryCampaignRepository::new()),
            analytics: Arc::new(InMemoryAnalyticsRepository::new()),
        }
    }
}

pub(crate) fn edit_conflict(current: CampaignStatus) -> NewsletterError {
    match current {
        CampaignStatus::Sent => NewsletterError::StateConflict("Cannot edit sent campaigns".into()),
        status => NewsletterError::StateConflict(format!(
            "Campaign changed to {} while it was being edited",
            status
        )),
    }
}

fn conflict_for(campaign: &Campaign, action: &str) -> NewsletterError {
    NewsletterError::StateConflict(format!(
        "Cannot {} a campaign that is {}",
        action, campaign.status
    ))
}

// ---------------------------------------------------------------------------
// In-memory implementations (development and tests)
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone)]
pub struct InMemorySubscriberRepository {
    // Keyed by id so ordered walks match the Postgres implementation
    subscribers: Arc<RwLock<BTreeMap<Uuid, Subscriber>>>,
}

impl InMemorySubscriberRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SubscriberRepository for InMemorySubscriberRepository {
    async fn find_by_email(&self, email: &str) -> NewsletterResult<Option<Subscriber>> {
        let subscribers = self.subscribers.read().await;
        Ok(subscribers.values().find(|s| s.email == email).cloned())
    }

    async fn get_by_id(&self, id: Uuid) -> NewsletterResult<Option<Subscriber>> {
        Ok(self.subscribers.read().await.get(&id).cloned())
    }

    async fn list(&self, filter: SubscriberFilter) -> NewsletterResult<Vec<Subscriber>> {
        let subscribers = self.subscribers.read().await;
        let mut result: Vec<Subscriber> = subscribers
            .values()
            .filter(|s| filter.active.is_none_or(|active| s.is_active == active))
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(result)
    }

    async fn list_active_after(
        &self,
        after: Option<Uuid>,
        through: Option<Uuid>,
    ) -> NewsletterResult<Vec<Subscriber>> {
        let subscribers = self.subscribers.read().await;
        Ok(subscribers
            .values()
            .filter(|s| {
                s.is_active
                    && after.is_none_or(|cursor| s.id > cursor)
                    && through.is_none_or(|bound| s.id <= bound)
            })
            .cloned()
            .collect())
    }

    async fn insert(&self, subscriber: Subscriber) -> NewsletterResult<Subscriber> {
        let mut subscribers = self.subscribers.write().await;
        if subscribers.values().any(|s| s.email == subscriber.email) {
            return Err(NewsletterError::StateConflict(format!(
                "Email {} is already registered",
                subscriber.email
            )));
        }
        subscribers.insert(subscriber.id, subscriber.clone());
        Ok(subscriber)
    }

    async fn update(&self, subscriber: Subscriber) -> NewsletterResult<Subscriber> {
        let mut subscribers = self.subscribers.write().await;
        if subscribers
            .values()
            .any(|s| s.email == subscriber.email && s.id != subscriber.id)
        {
            return Err(NewsletterError::StateConflict(format!(
                "Email {} is already registered",
                subscriber.email
            )));
        }
        match subscribers.get_mut(&subscriber.id) {
            Some(existing) => {
                *existing = subscriber.clone();
                Ok(subscriber)
            }
            None => Err(NewsletterError::not_found("Subscriber", subscriber.id)),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryTemplateRepository {
    templates: Arc<RwLock<HashMap<Uuid, Template>>>,
}

impl InMemoryTemplateRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TemplateRepository for InMemoryTemplateRepository {
    async fn list(&self, include_deleted: bool) -> NewsletterResult<Vec<Template>> {
        let templates = self.templates.read().await;
        let mut result: Vec<Template> = templates
            .values()
            .filter(|t| include_deleted || !t.is_deleted())
            .cloned()
            .collect();
        result.sort_by(|a, b| b.is_default.cmp(&a.is_default).then(a.name.cmp(&b.name)));
        Ok(result)
    }

    async fn get_by_id(&self, id: Uuid) -> NewsletterResult<Option<Template>> {
        Ok(self.templates.read().await.get(&id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> NewsletterResult<Option<Template>> {
        let templates = self.templates.read().await;
        Ok(templates.values().find(|t| t.name == name).cloned())
    }

    async fn insert(&self, template: Template) -> NewsletterResult<Template> {
        self.templates
            .write()
            .await
            .insert(template.id, template.clone());
        Ok(template)
    }

    async fn update(&self, template: Template) -> NewsletterResult<Template> {
        let mut templates = self.templates.write().await;
        match templates.get_mut(&template.id) {
            Some(existing) => {
                *existing = template.clone();
                Ok(template)
            }
            None => Err(NewsletterError::not_found("Template", template.id)),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryCampaignRepository {
    campaigns: Arc<RwLock<HashMap<Uuid, Campaign>>>,
}

impl InMemoryCampaignRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CampaignRepository for InMemoryCampaignRepository {
    async fn list(&self) -> NewsletterResult<Vec<Campaign>> {
        let campaigns = self.campaigns.read().await;
        let mut result: Vec<Campaign> = campaigns.values().cloned().collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(result)
    }

    async fn get_by_id(&self, id: Uuid) -> NewsletterResult<Option<Campaign>> {
        Ok(self.campaigns.read().await.get(&id).cloned())
    }

    async fn insert(&self, campaign: Campaign) -> NewsletterResult<Campaign> {
        self.campaigns
            .write()
            .await
            .insert(campaign.id, campaign.clone());
        Ok(campaign)
    }

    async fn update(&self, campaign: Campaign, expected: CampaignStatus) -> NewsletterResult<Campaign> {
        let mut campaigns = self.campaigns.write().await;
        let existing = campaigns
            .get_mut(&campaign.id)
            .ok_or_else(|| NewsletterError::not_found("Campaign", campaign.id))?;

        if existing.status == CampaignStatus::Sent || existing.status != expected {
            return Err(edit_conflict(existing.status));
        }

        existing.name = campaign.name;
        existing.subject = campaign.subject;
        existing.preview_text = campaign.preview_text;
        existing.content = campaign.content;
        existing.template_id = campaign.template_id;
        existing.scheduled_at = campaign.scheduled_at;
        existing.status = campaign.status;
        existing.tags = campaign.tags;
        existing.updated_at = campaign.updated_at;
        Ok(existing.clone())
    }

    async fn cancel_draft(&self, id: Uuid) -> NewsletterResult<Campaign> {
        let mut campaigns = self.campaigns.write().await;
        let existing = campaigns
            .get_mut(&id)
            .ok_or_else(|| NewsletterError::not_found("Campaign", id))?;

        if existing.status != CampaignStatus::Draft {
            return Err(NewsletterError::StateConflict(
                "Can only delete draft campaigns".into(),
            ));
        }

        existing.status = CampaignStatus::Cancelled;
        existing.updated_at = Utc::now();
        Ok(existing.clone())
    }

    async fn begin_sending(
        &self,
        id: Uuid,
        recipient_count: i32,
        send_bound: Uuid,
    ) -> NewsletterResult<Campaign> {
        let mut campaigns = self.campaigns.write().await;
        let existing = campaigns
            .get_mut(&id)
            .ok_or_else(|| NewsletterError::not_found("Campaign", id))?;

        if !existing.status.is_sendable() {
            return Err(conflict_for(existing, "send"));
        }

        existing.status = CampaignStatus::Sending;
        existing.recipient_count = recipient_count;
        existing.delivered_count = 0;
        existing.failed_count = 0;
        existing.send_cursor = None;
        existing.send_bound = Some(send_bound);
        existing.updated_at = Utc::now();
        Ok(existing.clone())
    }

    async fn record_progress(
        &self,
        id: Uuid,
        cursor: Uuid,
        delivered: i32,
        failed: i32,
    ) -> NewsletterResult<()> {
        let mut campaigns = self.campaigns.write().await;
        let existing = campaigns
            .get_mut(&id)
            .ok_or_else(|| NewsletterError::not_found("Campaign", id))?;

        if existing.status != CampaignStatus::Sending {
            return Err(conflict_for(existing, "checkpoint"));
        }

        existing.send_cursor = Some(cursor);
        existing.delivered_count = delivered;
        existing.failed_count = failed;
        existing.updated_at = Utc::now();
        Ok(())
    }

    async fn mark_sent(&self, id: Uuid) -> NewsletterResult<Campaign> {
        let mut campaigns = self.campaigns.write().await;
        let existing = campaigns
            .get_mut(&id)
            .ok_or_else(|| NewsletterError::not_found("Campaign", id))?;

        if existing.status != CampaignStatus::Sending {
            return Err(conflict_for(existing, "complete"));
        }

        let now = Utc::now();
        existing.status = CampaignStatus::Sent;
        existing.sent_at = Some(now);
        existing.updated_at = now;
        Ok(existing.clone())
    }

    async fn increment_unsubscribes(&self, id: Uuid) -> NewsletterResult<()> {
        let mut campaigns = self.campaigns.write().await;
        let existing = campaigns
            .get_mut(&id)
            .ok_or_else(|| NewsletterError::not_found("Campaign", id))?;
        existing.unsubscribe_count += 1;
        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryAnalyticsRepository {
    events: Arc<RwLock<Vec<AnalyticsEvent>>>,
}

impl InMemoryAnalyticsRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<AnalyticsEvent> {
        self.events.read().await.clone()
    }
}

#[async_trait]
impl AnalyticsRepository for InMemoryAnalyticsRepository {
    async fn record(&self, event: AnalyticsEvent) -> NewsletterResult<()> {
        self.events.write().await.push(event);
        Ok(())
    }

    async fn count_for_campaign(&self, campaign_id: Uuid, event_type: EventType) -> NewsletterResult<u64> {
        let events = self.events.read().await;
        Ok(events
            .iter()
            .filter(|e| e.campaign_id == Some(campaign_id) && e.event_type == event_type)
            .count() as u64)
    }
}
