use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "newsletter_subscribers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub user_id: Option<Uuid>,
    pub is_active: bool,
    pub source: String,
    pub subscription_date: DateTimeWithTimeZone,
    pub unsubscribed_at: Option<DateTimeWithTimeZone>,
    #[sea_orm(column_type = "Text", nullable)]
    pub unsubscribe_reason: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for crate::models::Subscriber {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            first_name: model.first_name,
            last_name: model.last_name,
            user_id: model.user_id,
            is_active: model.is_active,
            source: model.source,
            subscription_date: model.subscription_date.into(),
            unsubscribed_at: model.unsubscribed_at.map(Into::into),
            unsubscribe_reason: model.unsubscribe_reason,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

impl From<crate::models::Subscriber> for ActiveModel {
    fn from(subscriber: crate::models::Subscriber) -> Self {
        Self {
            id: Set(subscriber.id),
            email: Set(subscriber.email),
            first_name: Set(subscriber.first_name),
            last_name: Set(subscriber.last_name),
            user_id: Set(subscriber.user_id),
            is_active: Set(subscriber.is_active),
            source: Set(subscriber.source),
            subscription_date: Set(subscriber.subscription_date.into()),
            unsubscribed_at: Set(subscriber.unsubscribed_at.map(Into::into)),
            unsubscribe_reason: Set(subscriber.unsubscribe_reason),
            created_at: Set(subscriber.created_at.into()),
            updated_at: Set(subscriber.updated_at.into()),
        }
    }
}
