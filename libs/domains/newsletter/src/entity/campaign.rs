use crate::models::CampaignStatus;
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "newsletter_campaigns")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub subject: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub preview_text: Option<String>,
    #[sea_orm(column_type = "Text")]
    pub content: String,
    pub template_id: Option<Uuid>,
    pub status: CampaignStatus,
    pub scheduled_at: Option<DateTimeWithTimeZone>,
    pub sent_at: Option<DateTimeWithTimeZone>,
    pub recipient_count: i32,
    pub delivered_count: i32,
    pub failed_count: i32,
    pub send_cursor: Option<Uuid>,
    pub send_bound: Option<Uuid>,
    pub open_count: i32,
    pub click_count: i32,
    pub unsubscribe_count: i32,
    pub bounce_count: i32,
    pub created_by: Option<String>,
    pub tags: Json,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for crate::models::Campaign {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            subject: model.subject,
            preview_text: model.preview_text,
            content: model.content,
            template_id: model.template_id,
            status: model.status,
            scheduled_at: model.scheduled_at.map(Into::into),
            sent_at: model.sent_at.map(Into::into),
            recipient_count: model.recipient_count,
            delivered_count: model.delivered_count,
            failed_count: model.failed_count,
            send_cursor: model.send_cursor,
            send_bound: model.send_bound,
            open_count: model.open_count,
            click_count: model.click_count,
            unsubscribe_count: model.unsubscribe_count,
            bounce_count: model.bounce_count,
            created_by: model.created_by,
            tags: serde_json::from_value(model.tags).unwrap_or_default(),
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

impl From<crate::models::Campaign> for ActiveModel {
    fn from(campaign: crate::models::Campaign) -> Self {
        let tags = serde_json::Value::Array(
            campaign
                .tags
                .into_iter()
                .map(serde_json::Value::String)
                .collect(),
        );

        Self {
            id: Set(campaign.id),
            name: Set(campaign.name),
            subject: Set(campaign.subject),
            preview_text: Set(campaign.preview_text),
            content: Set(campaign.content),
            template_id: Set(campaign.template_id),
            status: Set(campaign.status),
            scheduled_at: Set(campaign.scheduled_at.map(Into::into)),
            sent_at: Set(campaign.sent_at.map(Into::into)),
            recipient_count: Set(campaign.recipient_count),
            delivered_count: Set(campaign.delivered_count),
            failed_count: Set(campaign.failed_count),
            send_cursor: Set(campaign.send_cursor),
            send_bound: Set(campaign.send_bound),
            open_count: Set(campaign.open_count),
            click_count: Set(campaign.click_count),
            unsubscribe_count: Set(campaign.unsubscribe_count),
            bounce_count: Set(campaign.bounce_count),
            created_by: Set(campaign.created_by),
            tags: Set(tags),
            created_at: Set(campaign.created_at.into()),
            updated_at: Set(campaign.updated_at.into()),
        }
    }
}
