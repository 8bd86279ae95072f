use std::sync::Arc;
use uuid::Uuid;

use crate::error::{NewsletterError, NewsletterResult};
use crate::models::{Campaign, CampaignStatus, CreateCampaign, UpdateCampaign};
use crate::repository::{CampaignRepository, TemplateRepository};

/// Campaign records. Knows nothing about sending.
#[derive(Clone)]
pub struct CampaignService {
    campaigns: Arc<dyn CampaignRepository>,
    templates: Arc<dyn TemplateRepository>,
}

impl CampaignService {
    pub fn new(campaigns: Arc<dyn CampaignRepository>, templates: Arc<dyn TemplateRepository>) -> Self {
        Self {
            campaigns,
            templates,
        }
    }

    pub async fn list(&self) -> NewsletterResult<Vec<Campaign>> {
        self.campaigns.list().await
    }

    pub async fn get(&self, id: Uuid) -> NewsletterResult<Campaign> {
        self.campaigns
            .get_by_id(id)
            .await?
            .ok_or_else(|| NewsletterError::not_found("Campaign", id))
    }

    async fn ensure_template_usable(&self, template_id: Uuid) -> NewsletterResult<()> {
        match self.templates.get_by_id(template_id).await? {
            Some(template) if !template.is_deleted() => Ok(()),
            _ => Err(NewsletterError::not_found("Template", template_id)),
        }
    }

    pub async fn create(&self, input: CreateCampaign, created_by: Option<String>) -> NewsletterResult<Campaign> {
        if input.name.trim().is_empty() || input.subject.trim().is_empty() || input.content.trim().is_empty() {
            return Err(NewsletterError::Validation(
                "Name, subject, and content are required".into(),
            ));
        }
        if let Some(template_id) = input.template_id {
            self.ensure_template_usable(template_id).await?;
        }

        let campaign = self.campaigns.insert(Campaign::new(input, created_by)).await?;
        tracing::info!(campaign_id = %campaign.id, "Created campaign");
        Ok(campaign)
    }

    pub async fn update(&self, input: UpdateCampaign) -> NewsletterResult<Campaign> {
        let mut campaign = self.get(input.id).await?;

        match campaign.status {
            CampaignStatus::Sent => {
                return Err(NewsletterError::StateConflict("Cannot edit sent campaigns".into()));
            }
            CampaignStatus::Cancelled => {
                return Err(NewsletterError::StateConflict("Cannot edit deleted campaigns".into()));
            }
            _ => {}
        }
        if let Some(status) = input.status {
            if !status.is_sendable() {
                return Err(NewsletterError::Validation(
                    "Status can only be set to draft or scheduled".into(),
                ));
            }
            if campaign.status == CampaignStatus::Sending && status != campaign.status {
                return Err(NewsletterError::StateConflict(
                    "Cannot change the status of a campaign that is sending".into(),
                ));
            }
        }
        if [&input.name, &input.subject, &input.content]
            .iter()
            .any(|field| field.as_deref().is_some_and(|v| v.trim().is_empty()))
        {
            return Err(NewsletterError::Validation(
                "Name, subject, and content cannot be empty".into(),
            ));
        }
        if let Some(template_id) = input.template_id {
            if campaign.template_id != Some(template_id) {
                self.ensure_template_usable(template_id).await?;
            }
        }

        let expected = campaign.status;
        campaign.apply_update(input);
        let campaign = self.campaigns.update(campaign, expected).await?;
        tracing::info!(campaign_id = %campaign.id, "Updated campaign");
        Ok(campaign)
    }

    /// Soft delete: draft -> cancelled.
    pub async fn delete(&self, id: Uuid) -> NewsletterResult<Campaign> {
        self.campaigns.cancel_draft(id).await
    }
}
