use chrono::{DateTime, Utc};
use sea_orm::sea_query::StringLen;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::{Display, EnumString};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

pub const DEFAULT_SOURCE: &str = "website";

/// Canonical form used for storage and lookups.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Cheap shape check for addresses that never went through `validator`.
pub fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.ends_with('.'),
        None => false,
    }
}

/// Accepts `true`/`false`, `1`/`0` and their string forms. Admin forms post
/// checkbox values as strings.
pub mod flexible_bool {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Value>::deserialize(deserializer)? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(b)),
            Some(Value::Number(n)) => match n.as_i64() {
                Some(1) => Ok(Some(true)),
                Some(0) => Ok(Some(false)),
                _ => Err(D::Error::custom(format!("invalid boolean: {}", n))),
            },
            Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(Some(true)),
                "false" | "0" => Ok(Some(false)),
                _ => Err(D::Error::custom(format!("invalid boolean: {}", s))),
            },
            Some(other) => Err(D::Error::custom(format!("invalid boolean: {}", other))),
        }
    }
}

/// Strips surrounding whitespace before validation sees the value.
pub mod trimmed {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(String::deserialize(deserializer)?.trim().to_string())
    }

    pub fn option<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<String>::deserialize(deserializer)?.map(|s| s.trim().to_string()))
    }
}

// ---------------------------------------------------------------------------
// Subscribers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Subscriber {
    pub id: Uuid,
    /// Lowercased and trimmed, unique across all subscribers
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub user_id: Option<Uuid>,
    pub is_active: bool,
    pub source: String,
    pub subscription_date: DateTime<Utc>,
    pub unsubscribed_at: Option<DateTime<Utc>>,
    pub unsubscribe_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subscriber {
    pub fn new(input: &SubscribeRequest) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            email: normalize_email(&input.email),
            first_name: input.first_name.clone(),
            last_name: input.last_name.clone(),
            user_id: input.user_id,
            is_active: true,
            source: input
                .source
                .clone()
                .unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
            subscription_date: now,
            unsubscribed_at: None,
            unsubscribe_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn display_name(&self) -> Option<String> {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => Some(format!("{} {}", first, last)),
            (Some(first), None) => Some(first.clone()),
            (None, Some(last)) => Some(last.clone()),
            (None, None) => None,
        }
    }

    /// Bring an unsubscribed record back. Names from the new request win
    /// when present.
    pub fn reactivate(&mut self, input: &SubscribeRequest) {
        let now = Utc::now();
        self.is_active = true;
        self.unsubscribed_at = None;
        self.unsubscribe_reason = None;
        self.subscription_date = now;
        if input.first_name.is_some() {
            self.first_name = input.first_name.clone();
        }
        if input.last_name.is_some() {
            self.last_name = input.last_name.clone();
        }
        if let Some(source) = &input.source {
            self.source = source.clone();
        }
        self.updated_at = now;
    }

    pub fn deactivate(&mut self, reason: Option<String>) {
        let now = Utc::now();
        self.is_active = false;
        self.unsubscribed_at = Some(now);
        self.unsubscribe_reason = reason;
        self.updated_at = now;
    }

    pub fn apply_update(&mut self, update: UpdateSubscriber) {
        if let Some(email) = update.email {
            self.email = normalize_email(&email);
        }
        if let Some(first_name) = update.first_name {
            self.first_name = Some(first_name);
        }
        if let Some(last_name) = update.last_name {
            self.last_name = Some(last_name);
        }
        if let Some(source) = update.source {
            self.source = source;
        }
        if let Some(user_id) = update.user_id {
            self.user_id = Some(user_id);
        }
        match update.is_active {
            Some(true) if !self.is_active => {
                self.is_active = true;
                self.unsubscribed_at = None;
                self.unsubscribe_reason = None;
            }
            Some(false) if self.is_active => {
                self.is_active = false;
                self.unsubscribed_at = Some(Utc::now());
            }
            _ => {}
        }
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeRequest {
    #[serde(deserialize_with = "trimmed::deserialize")]
    #[validate(email(message = "Valid email is required"))]
    pub email: String,
    #[validate(length(max = 100))]
    pub first_name: Option<String>,
    #[validate(length(max = 100))]
    pub last_name: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub source: Option<String>,
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSubscriber {
    pub id: Uuid,
    #[serde(default, deserialize_with = "trimmed::option")]
    #[validate(email(message = "Valid email is required"))]
    pub email: Option<String>,
    #[validate(length(max = 100))]
    pub first_name: Option<String>,
    #[validate(length(max = 100))]
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "flexible_bool::deserialize")]
    #[schema(value_type = Option<bool>)]
    pub is_active: Option<bool>,
    pub source: Option<String>,
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct SubscriberFilter {
    /// Only active (`true`) or only unsubscribed (`false`) subscribers
    #[serde(default, deserialize_with = "flexible_bool::deserialize")]
    #[param(value_type = Option<bool>)]
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Validate, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct UnsubscribeQuery {
    pub email: Option<String>,
    #[validate(length(max = 256))]
    pub token: Option<String>,
    /// Campaign the unsubscribe link was delivered with
    pub campaign: Option<Uuid>,
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeOutcome {
    pub subscriber: Subscriber,
    pub already_subscribed: bool,
    pub reactivated: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UnsubscribeOutcome {
    pub subscriber: Subscriber,
    pub already_unsubscribed: bool,
}

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub html_content: String,
    pub category: String,
    /// Per-template overrides for `headerText`, `websiteUrl` and `companyAddress`
    pub variables: BTreeMap<String, String>,
    pub is_default: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Template {
    pub fn new(input: CreateTemplate) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            name: input.name.trim().to_string(),
            description: input.description,
            html_content: input.html_content,
            category: input.category.trim().to_string(),
            variables: input.variables.unwrap_or_default(),
            is_default: false,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn apply_update(&mut self, update: UpdateTemplate) {
        if let Some(name) = update.name {
            self.name = name.trim().to_string();
        }
        if let Some(description) = update.description {
            self.description = Some(description);
        }
        if let Some(html_content) = update.html_content {
            self.html_content = html_content;
        }
        if let Some(category) = update.category {
            self.category = category.trim().to_string();
        }
        if let Some(variables) = update.variables {
            self.variables = variables;
        }
        self.updated_at = Utc::now();
    }

    pub fn mark_deleted(&mut self) {
        let now = Utc::now();
        self.name = format!("[DELETED] {}", self.name);
        self.deleted_at = Some(now);
        self.updated_at = now;
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTemplate {
    #[serde(default)]
    #[validate(length(max = 200))]
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub html_content: String,
    #[serde(default)]
    #[validate(length(max = 50))]
    pub category: String,
    pub variables: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTemplate {
    pub id: Uuid,
    #[validate(length(max = 200))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub html_content: Option<String>,
    #[validate(length(max = 50))]
    pub category: Option<String>,
    pub variables: Option<BTreeMap<String, String>>,
    /// Must be set to edit a built-in template
    #[serde(default)]
    pub allow_default_edit: bool,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct TemplateQuery {
    pub id: Option<Uuid>,
    #[serde(default, deserialize_with = "flexible_bool::deserialize")]
    #[param(value_type = Option<bool>)]
    pub include_deleted: Option<bool>,
}

// ---------------------------------------------------------------------------
// Campaigns
// ---------------------------------------------------------------------------

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    Default,
    DeriveActiveEnum,
    EnumIter,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CampaignStatus {
    #[default]
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "scheduled")]
    Scheduled,
    /// Bulk dispatch has started and not yet finished
    #[sea_orm(string_value = "sending")]
    Sending,
    #[sea_orm(string_value = "sent")]
    Sent,
    /// Soft-deleted
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl CampaignStatus {
    pub fn is_sendable(&self) -> bool {
        matches!(self, CampaignStatus::Draft | CampaignStatus::Scheduled)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub id: Uuid,
    pub name: String,
    pub subject: String,
    pub preview_text: Option<String>,
    /// Trusted HTML body written by admins
    pub content: String,
    pub template_id: Option<Uuid>,
    pub status: CampaignStatus,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
    pub recipient_count: i32,
    pub delivered_count: i32,
    pub failed_count: i32,
    /// Id of the last subscriber whose delivery was checkpointed
    pub send_cursor: Option<Uuid>,
    /// Highest subscriber id in the snapshot taken when sending began
    pub send_bound: Option<Uuid>,
    pub open_count: i32,
    pub click_count: i32,
    pub unsubscribe_count: i32,
    pub bounce_count: i32,
    pub created_by: Option<String>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Campaign {
    pub fn new(input: CreateCampaign, created_by: Option<String>) -> Self {
        let now = Utc::now();
        let status = if input.scheduled_at.is_some() {
            CampaignStatus::Scheduled
        } else {
            CampaignStatus::Draft
        };

        Self {
            id: Uuid::now_v7(),
            name: input.name.trim().to_string(),
            subject: input.subject.trim().to_string(),
            preview_text: input.preview_text,
            content: input.content,
            template_id: input.template_id,
            status,
            scheduled_at: input.scheduled_at,
            sent_at: None,
            recipient_count: 0,
            delivered_count: 0,
            failed_count: 0,
            send_cursor: None,
            send_bound: None,
            open_count: 0,
            click_count: 0,
            unsubscribe_count: 0,
            bounce_count: 0,
            created_by,
            tags: input.tags.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply_update(&mut self, update: UpdateCampaign) {
        if let Some(name) = update.name {
            self.name = name.trim().to_string();
        }
        if let Some(subject) = update.subject {
            self.subject = subject.trim().to_string();
        }
        if let Some(preview_text) = update.preview_text {
            self.preview_text = Some(preview_text);
        }
        if let Some(content) = update.content {
            self.content = content;
        }
        if let Some(template_id) = update.template_id {
            self.template_id = Some(template_id);
        }
        if let Some(scheduled_at) = update.scheduled_at {
            self.scheduled_at = Some(scheduled_at);
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(tags) = update.tags {
            self.tags = tags;
        }
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCampaign {
    #[serde(default)]
    #[validate(length(max = 200))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 255))]
    pub subject: String,
    pub preview_text: Option<String>,
    #[serde(default)]
    pub content: String,
    pub template_id: Option<Uuid>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCampaign {
    pub id: Uuid,
    #[validate(length(max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 255))]
    pub subject: Option<String>,
    pub preview_text: Option<String>,
    pub content: Option<String>,
    pub template_id: Option<Uuid>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub status: Option<CampaignStatus>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct IdQuery {
    pub id: Option<Uuid>,
}

// ---------------------------------------------------------------------------
// Sending
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendRequest {
    pub campaign_id: Option<Uuid>,
    pub test_email: Option<String>,
    #[serde(default, deserialize_with = "flexible_bool::deserialize")]
    #[schema(value_type = Option<bool>)]
    pub send_test: Option<bool>,
}

impl SendRequest {
    pub fn is_test(&self) -> bool {
        self.send_test.unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct CampaignRef {
    pub campaign_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Sent,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryDetail {
    pub email: String,
    pub status: DeliveryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendResults {
    pub successful: u32,
    pub failed: u32,
    pub details: Vec<DeliveryDetail>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkSendResponse {
    pub message: String,
    pub campaign_id: Uuid,
    pub recipient_count: i32,
    pub send_results: SendResults,
    /// False when the run was cancelled and can be resumed
    pub completed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TestSendResult {
    pub message: String,
    pub recipient: String,
    pub subject: String,
    /// First 200 characters of the merged body
    pub preview: String,
    pub message_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(untagged)]
pub enum SendOutcome {
    Test(TestSendResult),
    Bulk(BulkSendResponse),
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CampaignStats {
    pub campaign_id: Uuid,
    pub status: CampaignStatus,
    pub recipient_count: i32,
    pub delivered_count: i32,
    pub failed_count: i32,
    pub unsubscribe_count: i32,
    pub open_count: i32,
    pub click_count: i32,
    pub bounce_count: i32,
    pub sent_at: Option<DateTime<Utc>>,
}

impl From<&Campaign> for CampaignStats {
    fn from(campaign: &Campaign) -> Self {
        Self {
            campaign_id: campaign.id,
            status: campaign.status,
            recipient_count: campaign.recipient_count,
            delivered_count: campaign.delivered_count,
            failed_count: campaign.failed_count,
            unsubscribe_count: campaign.unsubscribe_count,
            open_count: campaign.open_count,
            click_count: campaign.click_count,
            bounce_count: campaign.bounce_count,
            sent_at: campaign.sent_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Analytics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EventType {
    Sent,
    TestSent,
    Unsubscribed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsEvent {
    pub id: Uuid,
    pub campaign_id: Option<Uuid>,
    pub subscriber_id: Option<Uuid>,
    pub email: String,
    pub event_type: EventType,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl AnalyticsEvent {
    pub fn new(
        event_type: EventType,
        campaign_id: Option<Uuid>,
        subscriber_id: Option<Uuid>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            campaign_id,
            subscriber_id,
            email: email.into(),
            event_type,
            metadata: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}
