use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "newsletter_events")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub campaign_id: Option<Uuid>,
    pub subscriber_id: Option<Uuid>,
    pub email: String,
    pub event_type: String,
    pub metadata: Option<Json>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<crate::models::AnalyticsEvent> for ActiveModel {
    fn from(event: crate::models::AnalyticsEvent) -> Self {
        Self {
            id: Set(event.id),
            campaign_id: Set(event.campaign_id),
            subscriber_id: Set(event.subscriber_id),
            email: Set(event.email),
            event_type: Set(event.event_type.to_string()),
            metadata: Set(event.metadata),
            created_at: Set(event.created_at.into()),
        }
    }
}
